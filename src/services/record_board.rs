//! Latest known state of the catalog and records.
//!
//! The board owns an immutable snapshot behind an `Arc`. Loads are numbered
//! with a ticket; a load that finishes after a newer one has been installed
//! is discarded, so a slow stale fetch can never replace fresher data. Every
//! mutation made elsewhere is patched into the snapshot so derived views
//! (calendar, task list, stats) never lag behind a write.
//!
//! A load may have read its rows before a patch landed. Patches are kept
//! with the last ticket issued when they were applied and replayed over any
//! load holding that ticket or an older one.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::calendar::{CalendarCursor, CalendarView, OrgTimezone};
use crate::domain::models::cleaning_record::CleaningRecord;
use crate::domain::models::cleaning_task::CleaningTask;
use crate::domain::ports::{CleaningRecordRepository, CleaningTaskRepository, RecordQuery, TaskQuery};
use crate::services::calendar_aggregator;
use crate::services::cleaning_stats::{self, CleaningStats};
use crate::services::task_list::{self, TaskListQuery, TaskListView};

/// One consistent view of tasks and records.
#[derive(Debug, Clone, Default)]
pub struct BoardSnapshot {
    pub tasks: Vec<CleaningTask>,
    pub records: Vec<CleaningRecord>,
    /// Ticket of the load that produced this snapshot; 0 when never loaded.
    pub ticket: u64,
    pub loaded_at: Option<DateTime<Utc>>,
}

impl BoardSnapshot {
    pub fn task(&self, id: Uuid) -> Option<&CleaningTask> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn record(&self, id: Uuid) -> Option<&CleaningRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    pub fn task_name(&self, id: Uuid) -> &str {
        self.task(id).map_or("(tâche supprimée)", |t| t.name.as_str())
    }

    pub fn calendar(&self, cursor: CalendarCursor, now: DateTime<Utc>, tz: OrgTimezone) -> CalendarView<'_> {
        calendar_aggregator::aggregate(&self.records, cursor, now, tz)
    }

    pub fn task_list(&self, query: TaskListQuery, now: DateTime<Utc>, tz: OrgTimezone) -> TaskListView<'_> {
        task_list::filter_records(&self.records, query, now, tz)
    }

    pub fn stats(&self, now: DateTime<Utc>, tz: OrgTimezone) -> CleaningStats {
        cleaning_stats::compute(&self.records, now, tz)
    }

    fn with_record(&self, record: CleaningRecord) -> Self {
        let mut next = self.clone();
        match next.records.iter_mut().find(|r| r.id == record.id) {
            Some(existing) if existing.version > record.version => {}
            Some(existing) => *existing = record,
            None => next.records.push(record),
        }
        next
    }
}

/// What happened to a load.
#[derive(Debug, Clone)]
pub enum LoadOutcome {
    Installed(Arc<BoardSnapshot>),
    /// A newer load was already installed; this one was dropped.
    Discarded { ticket: u64, current: u64 },
}

#[derive(Default)]
struct BoardState {
    snapshot: Arc<BoardSnapshot>,
    /// Patched records with the last ticket issued at patch time.
    patches: Vec<(u64, CleaningRecord)>,
}

impl BoardState {
    fn patch(&mut self, issued: u64, records: Vec<CleaningRecord>) {
        let mut next = (*self.snapshot).clone();
        for record in records {
            next = next.with_record(record.clone());
            self.patches.push((issued, record));
        }
        self.snapshot = Arc::new(next);
    }
}

pub struct RecordBoard<T: CleaningTaskRepository, R: CleaningRecordRepository> {
    tasks: Arc<T>,
    records: Arc<R>,
    state: RwLock<BoardState>,
    next_ticket: AtomicU64,
}

impl<T: CleaningTaskRepository, R: CleaningRecordRepository> RecordBoard<T, R> {
    pub fn new(tasks: Arc<T>, records: Arc<R>) -> Self {
        Self {
            tasks,
            records,
            state: RwLock::new(BoardState::default()),
            next_ticket: AtomicU64::new(0),
        }
    }

    /// Current snapshot.
    pub async fn snapshot(&self) -> Arc<BoardSnapshot> {
        self.state.read().await.snapshot.clone()
    }

    /// Fetch tasks and records concurrently and install them unless a newer
    /// load won the race. On failure the previous snapshot stays in place.
    #[instrument(skip(self, task_query, record_query))]
    pub async fn refresh(&self, task_query: TaskQuery, record_query: RecordQuery) -> DomainResult<LoadOutcome> {
        let ticket = self.take_ticket();

        let (tasks, records) = futures::try_join!(
            async {
                self.tasks
                    .list(task_query)
                    .await
                    .map_err(|e| DomainError::fetch_failed("cleaning tasks", &e))
            },
            async {
                self.records
                    .list(record_query)
                    .await
                    .map_err(|e| DomainError::fetch_failed("cleaning records", &e))
            },
        )
        .map_err(|e| {
            warn!(ticket, error = %e, "board load failed, keeping previous snapshot");
            e
        })?;

        Ok(self
            .install(BoardSnapshot {
                tasks,
                records,
                ticket,
                loaded_at: Some(Utc::now()),
            })
            .await)
    }

    /// Patch one record (after an update) into the snapshot.
    pub async fn apply_update(&self, record: CleaningRecord) {
        let mut state = self.state.write().await;
        debug!(record_id = %record.id, version = record.version, "patching board");
        state.patch(self.last_ticket(), vec![record]);
    }

    /// Add freshly created records.
    pub async fn insert_records(&self, records: Vec<CleaningRecord>) {
        let mut state = self.state.write().await;
        state.patch(self.last_ticket(), records);
    }

    /// Patch or add one task.
    pub async fn apply_task(&self, task: CleaningTask) {
        let mut state = self.state.write().await;
        let mut next = (*state.snapshot).clone();
        match next.tasks.iter_mut().find(|t| t.id == task.id) {
            Some(existing) => *existing = task,
            None => next.tasks.push(task),
        }
        state.snapshot = Arc::new(next);
    }

    pub async fn remove_task(&self, task_id: Uuid) {
        let mut state = self.state.write().await;
        let mut next = (*state.snapshot).clone();
        next.tasks.retain(|t| t.id != task_id);
        state.snapshot = Arc::new(next);
    }

    fn take_ticket(&self) -> u64 {
        self.next_ticket.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn last_ticket(&self) -> u64 {
        self.next_ticket.load(Ordering::SeqCst)
    }

    async fn install(&self, mut snapshot: BoardSnapshot) -> LoadOutcome {
        let mut state = self.state.write().await;
        let current = state.snapshot.ticket;
        if current > snapshot.ticket {
            debug!(ticket = snapshot.ticket, current, "discarding stale board load");
            return LoadOutcome::Discarded {
                ticket: snapshot.ticket,
                current,
            };
        }

        // Patches issued before this load's ticket are already in its rows.
        state.patches.retain(|(issued, _)| *issued >= snapshot.ticket);
        for (_, record) in &state.patches {
            snapshot = snapshot.with_record(record.clone());
        }
        if !state.patches.is_empty() {
            debug!(ticket = snapshot.ticket, replayed = state.patches.len(), "replayed patches over board load");
        }

        let installed = Arc::new(snapshot);
        state.snapshot = installed.clone();
        LoadOutcome::Installed(installed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::{
        create_migrated_test_pool, SqliteCleaningRecordRepository, SqliteCleaningTaskRepository,
    };
    use crate::domain::models::cleaning_record::{CompletionState, RecordEvent};
    use crate::domain::models::cleaning_task::Frequency;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use tokio::sync::Notify;

    type Board = RecordBoard<SqliteCleaningTaskRepository, SqliteCleaningRecordRepository>;

    fn at(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, d, 0, 0, 0).unwrap()
    }

    async fn setup_board() -> (Board, Arc<SqliteCleaningRecordRepository>, CleaningTask) {
        let pool = create_migrated_test_pool().await.unwrap();
        let tasks = Arc::new(SqliteCleaningTaskRepository::new(pool.clone()));
        let records = Arc::new(SqliteCleaningRecordRepository::new(pool));
        let task = CleaningTask::new("Plan de travail", Frequency::Daily, "Désinfecter");
        tasks.create(&task).await.unwrap();
        (RecordBoard::new(tasks, records.clone()), records, task)
    }

    #[tokio::test]
    async fn test_refresh_installs_snapshot() {
        let (board, records, task) = setup_board().await;
        records.insert(&CleaningRecord::new(task.id, at(1))).await.unwrap();

        let outcome = board.refresh(TaskQuery::default(), RecordQuery::default()).await.unwrap();
        assert!(matches!(outcome, LoadOutcome::Installed(_)));

        let snapshot = board.snapshot().await;
        assert_eq!(snapshot.tasks.len(), 1);
        assert_eq!(snapshot.records.len(), 1);
        assert_eq!(snapshot.task_name(task.id), "Plan de travail");
    }

    #[tokio::test]
    async fn test_stale_load_is_discarded() {
        let (board, _records, _task) = setup_board().await;
        let older = board.take_ticket();
        let newer = board.take_ticket();

        let fresh = BoardSnapshot {
            ticket: newer,
            ..BoardSnapshot::default()
        };
        assert!(matches!(board.install(fresh).await, LoadOutcome::Installed(_)));

        let stale = BoardSnapshot {
            records: vec![CleaningRecord::new(Uuid::new_v4(), at(1))],
            ticket: older,
            ..BoardSnapshot::default()
        };
        let outcome = board.install(stale).await;
        assert!(matches!(outcome, LoadOutcome::Discarded { ticket, current } if ticket == older && current == newer));
        assert!(board.snapshot().await.records.is_empty());
    }

    #[tokio::test]
    async fn test_apply_update_refreshes_derived_views() {
        let (board, records, task) = setup_board().await;
        let record = CleaningRecord::new(task.id, at(10));
        records.insert(&record).await.unwrap();
        board.refresh(TaskQuery::default(), RecordQuery::default()).await.unwrap();

        let now = at(15);
        let tz = OrgTimezone::utc();
        let before = board.snapshot().await;
        assert_eq!(before.task_list(TaskListQuery::tab(task_list::RecordTab::Overdue), now, tz).records.len(), 1);

        let mut done = record.clone();
        done.state = CompletionState::Completed { compliant: true, completed_at: at(14) };
        done.version = 2;
        board.apply_update(done).await;

        let after = board.snapshot().await;
        assert!(after.task_list(TaskListQuery::tab(task_list::RecordTab::Overdue), now, tz).records.is_empty());
        assert_eq!(after.task_list(TaskListQuery::tab(task_list::RecordTab::Completed), now, tz).records.len(), 1);
    }

    #[tokio::test]
    async fn test_older_version_does_not_overwrite_patch() {
        let (board, _records, task) = setup_board().await;
        let mut record = CleaningRecord::new(task.id, at(10));
        record.version = 3;
        board.insert_records(vec![record.clone()]).await;

        let mut older = record.clone();
        older.version = 2;
        older.comments = Some("old".into());
        board.apply_update(older).await;

        assert_eq!(board.snapshot().await.record(record.id).unwrap().version, 3);
    }

    /// Record store whose `list` holds the rows it read until released.
    struct GatedRecords {
        inner: Arc<SqliteCleaningRecordRepository>,
        listed: Notify,
        release: Notify,
    }

    #[async_trait]
    impl CleaningRecordRepository for GatedRecords {
        async fn insert(&self, record: &CleaningRecord) -> DomainResult<()> {
            self.inner.insert(record).await
        }

        async fn insert_batch(&self, records: &[CleaningRecord]) -> DomainResult<usize> {
            self.inner.insert_batch(records).await
        }

        async fn get(&self, id: Uuid) -> DomainResult<Option<CleaningRecord>> {
            self.inner.get(id).await
        }

        async fn list(&self, query: RecordQuery) -> DomainResult<Vec<CleaningRecord>> {
            let rows = self.inner.list(query).await?;
            self.listed.notify_one();
            self.release.notified().await;
            Ok(rows)
        }

        async fn update(
            &self,
            record: &CleaningRecord,
            expected_version: u64,
            event: Option<&RecordEvent>,
        ) -> DomainResult<()> {
            self.inner.update(record, expected_version, event).await
        }

        async fn delete(&self, id: Uuid) -> DomainResult<()> {
            self.inner.delete(id).await
        }

        async fn count_for_task(&self, task_id: Uuid) -> DomainResult<u64> {
            self.inner.count_for_task(task_id).await
        }

        async fn list_events(&self, record_id: Uuid) -> DomainResult<Vec<RecordEvent>> {
            self.inner.list_events(record_id).await
        }
    }

    #[tokio::test]
    async fn test_patch_survives_load_that_read_before_it() {
        let pool = create_migrated_test_pool().await.unwrap();
        let tasks = Arc::new(SqliteCleaningTaskRepository::new(pool.clone()));
        let inner = Arc::new(SqliteCleaningRecordRepository::new(pool));
        let task = CleaningTask::new("Plan de travail", Frequency::Daily, "Désinfecter");
        tasks.create(&task).await.unwrap();
        let record = CleaningRecord::new(task.id, at(10));
        inner.insert(&record).await.unwrap();

        let gated = Arc::new(GatedRecords {
            inner: inner.clone(),
            listed: Notify::new(),
            release: Notify::new(),
        });
        let board = RecordBoard::new(tasks, gated.clone());

        let load = board.refresh(TaskQuery::default(), RecordQuery::default());
        let mutate = async {
            gated.listed.notified().await;
            let mut done = record.clone();
            done.state = CompletionState::Completed { compliant: true, completed_at: at(14) };
            done.version = 2;
            inner.update(&done, 1, None).await.unwrap();
            board.apply_update(done).await;
            gated.release.notify_one();
        };
        let (outcome, ()) = tokio::join!(load, mutate);
        assert!(matches!(outcome.unwrap(), LoadOutcome::Installed(_)));

        let snapshot = board.snapshot().await;
        let shown = snapshot.record(record.id).unwrap();
        assert_eq!(shown.version, 2);
        assert!(shown.is_completed());

        // A load issued after the patch reads the row itself.
        gated.release.notify_one();
        board.refresh(TaskQuery::default(), RecordQuery::default()).await.unwrap();
        assert_eq!(board.snapshot().await.record(record.id).unwrap().version, 2);
    }
}
