mod helpers;

use chrono::{Datelike, Duration, NaiveDate, TimeZone, Utc};
use haccp_plan::domain::models::calendar::{CalendarCursor, Granularity};
use haccp_plan::services::{RecordTab, TaskListQuery};
use haccp_plan::{CleaningRecordRepository, CleaningTask, DomainError, Frequency, RecordQuery};
use helpers::database::setup_context;

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

#[tokio::test]
async fn test_march_daily_plan_tabs_calendar_and_stats() {
    let now = Utc.with_ymd_and_hms(2024, 3, 15, 0, 0, 0).unwrap();
    let photos = tempfile::tempdir().unwrap();
    let (ctx, _clock) = setup_context(now, "UTC", photos.path()).await;

    let task = ctx
        .catalog()
        .create_task(
            CleaningTask::new("Nettoyage des sols", Frequency::Daily, "Laver et désinfecter").with_zone("CUISINE"),
        )
        .await
        .unwrap();
    let report = ctx.generator().generate_plan(task.id, d(2024, 3, 1), 30).await.unwrap();
    assert_eq!(report.created.len(), 31);
    assert_eq!(report.skipped, 0);

    let evaluator = ctx.evaluator();
    for record in report.created.iter().filter(|r| r.scheduled_date.day() <= 10) {
        let at = record.scheduled_date + Duration::hours(2);
        let compliant = record.scheduled_date.day() != 3;
        evaluator.complete(record.id, compliant, Some(at)).await.unwrap();
    }

    let (_, snapshot) = ctx.load_board(RecordQuery::default()).await.unwrap();

    let overdue = snapshot.task_list(TaskListQuery::tab(RecordTab::Overdue), now, ctx.tz);
    assert_eq!(overdue.counts.all, 31);
    assert_eq!(overdue.counts.completed, 10);
    assert_eq!(overdue.counts.todo, 21);
    assert_eq!(overdue.counts.overdue, 4);
    assert_eq!(overdue.counts.today, 1);
    assert_eq!(overdue.records.len(), 4);
    assert_eq!(overdue.records[0].scheduled_date.date_naive(), d(2024, 3, 14));
    assert_eq!(overdue.records[3].scheduled_date.date_naive(), d(2024, 3, 11));

    let calendar = snapshot.calendar(CalendarCursor::new(d(2024, 3, 15), Granularity::Month), now, ctx.tz);
    assert_eq!(calendar.cells.len(), 35 + 7);
    assert_eq!(calendar.totals.total, 31);
    assert_eq!(calendar.totals.overdue, 4);
    assert_eq!(calendar.totals.compliant, 9);
    let today = calendar.bucket(d(2024, 3, 15)).unwrap();
    assert!(today.is_today);
    assert_eq!(today.stats.total, 1);
    assert!(calendar.bucket(d(2024, 3, 2)).unwrap().stats.all_completed());

    let stats = snapshot.stats(now, ctx.tz);
    assert_eq!(stats.total, 31);
    assert_eq!(stats.pending, 21);
    assert_eq!(stats.completed_today, 0);
    assert_eq!(stats.compliance_rate, 90);
}

#[tokio::test]
async fn test_three_day_month_buckets_then_empty_next_month() {
    let now = Utc.with_ymd_and_hms(2024, 3, 15, 0, 0, 0).unwrap();
    let photos = tempfile::tempdir().unwrap();
    let (ctx, _clock) = setup_context(now, "UTC", photos.path()).await;

    let task = ctx
        .catalog()
        .create_task(CleaningTask::new("Nettoyage des sols", Frequency::Daily, "Laver"))
        .await
        .unwrap();
    let report = ctx.generator().generate_plan(task.id, d(2024, 3, 1), 2).await.unwrap();
    assert_eq!(report.created.len(), 3);

    let evaluator = ctx.evaluator();
    for record in &report.created {
        let at = record.scheduled_date + Duration::hours(1);
        match record.scheduled_date.day() {
            2 => evaluator.complete(record.id, true, Some(at)).await.unwrap(),
            3 => evaluator.complete(record.id, false, Some(at)).await.unwrap(),
            _ => continue,
        };
    }

    let (_, snapshot) = ctx.load_board(RecordQuery::default()).await.unwrap();
    let cursor = CalendarCursor::new(d(2024, 3, 1), Granularity::Month);
    let march = snapshot.calendar(cursor, now, ctx.tz);

    let day1 = march.bucket(d(2024, 3, 1)).unwrap().stats;
    assert_eq!((day1.total, day1.completed, day1.compliant, day1.overdue), (1, 0, 0, 1));
    let day2 = march.bucket(d(2024, 3, 2)).unwrap().stats;
    assert_eq!((day2.total, day2.completed, day2.compliant, day2.overdue), (1, 1, 1, 0));
    let day3 = march.bucket(d(2024, 3, 3)).unwrap().stats;
    assert_eq!((day3.total, day3.completed, day3.compliant, day3.overdue), (1, 1, 0, 0));
    assert!(march.bucket(d(2024, 3, 4)).unwrap().stats.is_empty());

    let next = cursor.next();
    assert_eq!(next.reference, d(2024, 4, 1));
    let april = snapshot.calendar(next, now, ctx.tz);
    // April 2024 starts on a Monday: one leading and four trailing cells.
    assert_eq!(april.cells.len(), 35);
    assert!(april.cells[0].bucket().is_none());
    assert_eq!(april.cells[1].bucket().map(|b| b.date), Some(d(2024, 4, 1)));
    assert_eq!(april.days().count(), 30);
    assert!(april.days().all(|b| b.stats.is_empty() && b.records.is_empty()));
    assert!(april.totals.is_empty());
}

#[tokio::test]
async fn test_generating_twice_skips_existing_slots() {
    let now = Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap();
    let photos = tempfile::tempdir().unwrap();
    let (ctx, _clock) = setup_context(now, "Europe/Paris", photos.path()).await;

    let task = ctx
        .catalog()
        .create_task(CleaningTask::new("Désinfection des chambres froides", Frequency::Weekly, "Désinfecter"))
        .await
        .unwrap();

    let generator = ctx.generator();
    let first = generator.generate_plan(task.id, d(2024, 3, 1), 27).await.unwrap();
    assert_eq!(first.created.len(), 4);

    let second = generator.generate_plan(task.id, d(2024, 3, 1), 34).await.unwrap();
    assert_eq!(second.requested, 5);
    assert_eq!(second.skipped, 4);
    assert_eq!(second.created.len(), 1);
    assert_eq!(ctx.records.count_for_task(task.id).await.unwrap(), 5);
}

#[tokio::test]
async fn test_zone_plan_reuses_catalog_on_rerun() {
    let now = Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap();
    let photos = tempfile::tempdir().unwrap();
    let (ctx, _clock) = setup_context(now, "Europe/Paris", photos.path()).await;
    let catalog = ctx.catalog();
    let generator = ctx.generator();

    let plan = catalog.create_zone_plan(&generator, "economat", d(2024, 3, 1), 6).await.unwrap();
    assert_eq!(plan.zone, "ECONOMAT");
    assert_eq!(plan.tasks.len(), 4);
    assert_eq!(plan.reused, 0);
    assert_eq!(plan.occurrence_count(), 3);

    let rerun = catalog.create_zone_plan(&generator, "ECONOMAT", d(2024, 3, 1), 6).await.unwrap();
    assert_eq!(rerun.reused, 4);
    assert_eq!(rerun.occurrence_count(), 0);
    assert_eq!(catalog.list_tasks(true, Some("ECONOMAT".into())).await.unwrap().len(), 4);

    let unknown = catalog.create_zone_plan(&generator, "TERRASSE", d(2024, 3, 1), 6).await;
    assert!(matches!(unknown, Err(DomainError::ValidationFailed(_))));
}

#[tokio::test]
async fn test_edit_flow_with_photo_and_history() {
    let now = Utc.with_ymd_and_hms(2024, 3, 15, 10, 0, 0).unwrap();
    let photos = tempfile::tempdir().unwrap();
    let (ctx, _clock) = setup_context(now, "Europe/Paris", photos.path()).await;

    let task = ctx
        .catalog()
        .create_task(CleaningTask::new("Nettoyage du passe-plat", Frequency::Daily, "Nettoyer"))
        .await
        .unwrap();
    let record = ctx
        .generator()
        .schedule_once(task.id, now - Duration::hours(2), None)
        .await
        .unwrap();

    let (board, _) = ctx.load_board(RecordQuery::for_task(task.id)).await.unwrap();
    let editor = ctx.editor(board.clone());

    let mut session = editor.open(record.id).await.unwrap();
    assert!(!session.is_dirty());
    session.draft.set_completed(true, now);
    session.draft.is_compliant = Some(true);
    session.draft.comments = Some("RAS".into());
    assert!(session.is_dirty());

    let upload = haccp_plan::services::PhotoUpload {
        file_name: "passe-plat.jpg".into(),
        bytes: vec![0xFF, 0xD8, 0xFF, 0xE0],
    };
    let outcome = editor.submit(&mut session, Some(upload)).await.unwrap();
    assert!(outcome.changed);
    assert!(outcome.photo_error.is_none());
    assert!(outcome.record.is_completed_compliant());
    let url = outcome.record.photo_url.clone().unwrap();
    assert!(url.starts_with("file://"));

    let snapshot = board.snapshot().await;
    assert!(snapshot.record(record.id).unwrap().is_completed());

    let removed = editor.remove_photo(&mut session).await.unwrap();
    assert!(removed.record.photo_url.is_none());
    assert!(removed.record.is_completed());

    let reopened = ctx.evaluator().reopen(record.id).await.unwrap();
    assert!(reopened.changed);

    let history = ctx.evaluator().history(record.id).await.unwrap();
    let transitions: Vec<(&str, &str)> = history
        .iter()
        .map(|e| (e.from_state.as_str(), e.to_state.as_str()))
        .collect();
    assert_eq!(transitions, vec![("pending", "compliant"), ("compliant", "pending")]);
}

#[tokio::test]
async fn test_stale_edit_session_is_refused() {
    let now = Utc.with_ymd_and_hms(2024, 3, 15, 10, 0, 0).unwrap();
    let photos = tempfile::tempdir().unwrap();
    let (ctx, _clock) = setup_context(now, "UTC", photos.path()).await;

    let task = ctx
        .catalog()
        .create_task(CleaningTask::new("Nettoyage des échelles", Frequency::Weekly, "Nettoyer"))
        .await
        .unwrap();
    let record = ctx.generator().schedule_once(task.id, now, None).await.unwrap();

    let (board, _) = ctx.load_board(RecordQuery::default()).await.unwrap();
    let editor = ctx.editor(board);
    let mut first = editor.open(record.id).await.unwrap();
    let mut second = editor.open(record.id).await.unwrap();

    first.draft.comments = Some("premier".into());
    editor.submit(&mut first, None).await.unwrap();

    second.draft.comments = Some("second".into());
    let err = editor.submit(&mut second, None).await.unwrap_err();
    assert!(matches!(err, DomainError::ConcurrencyConflict { .. }));

    let stored = ctx.records.get(record.id).await.unwrap().unwrap();
    assert_eq!(stored.comments.as_deref(), Some("premier"));
}

#[tokio::test]
async fn test_task_with_records_must_be_deactivated() {
    let now = Utc.with_ymd_and_hms(2024, 3, 15, 10, 0, 0).unwrap();
    let photos = tempfile::tempdir().unwrap();
    let (ctx, _clock) = setup_context(now, "UTC", photos.path()).await;
    let catalog = ctx.catalog();

    let task = catalog
        .create_task(CleaningTask::new("Nettoyage des murs et portes", Frequency::Monthly, "Lessiver"))
        .await
        .unwrap();
    ctx.generator().schedule_once(task.id, now, None).await.unwrap();

    assert!(matches!(catalog.delete_task(task.id).await, Err(DomainError::ValidationFailed(_))));

    let deactivated = catalog.deactivate_task(task.id).await.unwrap();
    assert!(!deactivated.is_active);
    assert!(catalog.list_tasks(true, None).await.unwrap().is_empty());
    assert!(matches!(
        ctx.generator().schedule_once(task.id, now, None).await,
        Err(DomainError::ValidationFailed(_))
    ));
}
