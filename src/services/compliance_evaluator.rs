//! Completion and compliance recording for one cleaning record.
//!
//! Every change goes through [`ComplianceEvaluator::set_completion`]: the
//! request is validated before anything is read or written, folded into the
//! record's [`CompletionState`], and persisted with a compare-and-swap on the
//! record version. State transitions are written to the audit trail in the
//! same transaction.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::cleaning_record::{
    stored_precision, CleaningRecord, CompletionState, CompletionUpdate, PhotoChange, RecordEvent,
};
use crate::domain::ports::{CleaningRecordRepository, Clock};

/// Result of a completion update.
#[derive(Debug, Clone)]
pub struct CompletionOutcome {
    /// The record as now stored.
    pub record: CleaningRecord,
    /// False when the update matched the stored record and nothing was written.
    pub changed: bool,
    /// Audit entry written for a state transition, if any.
    pub event: Option<RecordEvent>,
}

pub struct ComplianceEvaluator<R: CleaningRecordRepository> {
    records: Arc<R>,
    clock: Arc<dyn Clock>,
    future_tolerance: Duration,
}

impl<R: CleaningRecordRepository> ComplianceEvaluator<R> {
    pub fn new(records: Arc<R>, clock: Arc<dyn Clock>) -> Self {
        Self {
            records,
            clock,
            future_tolerance: Duration::minutes(5),
        }
    }

    /// How far ahead of the clock a completion date may lie.
    pub fn with_future_tolerance(mut self, tolerance: Duration) -> Self {
        self.future_tolerance = tolerance;
        self
    }

    /// Check an update for internal consistency.
    pub fn validate(&self, update: &CompletionUpdate) -> DomainResult<()> {
        validate_update(update, self.clock.now(), self.future_tolerance)
    }

    /// Validate, apply and persist a completion update.
    ///
    /// `expected_version` is the version the caller last saw; when given and
    /// stale the update is refused with `ConcurrencyConflict` instead of
    /// overwriting a concurrent change.
    #[instrument(skip(self, update), fields(record_id = %record_id, completed = update.is_completed))]
    pub async fn set_completion(
        &self,
        record_id: Uuid,
        update: CompletionUpdate,
        expected_version: Option<u64>,
    ) -> DomainResult<CompletionOutcome> {
        let now = self.clock.now();
        validate_update(&update, now, self.future_tolerance)?;

        let current = self
            .records
            .get(record_id)
            .await
            .map_err(|e| {
                warn!(%record_id, error = %e, "failed to read record before update");
                update_failed(record_id, &e)
            })?
            .ok_or(DomainError::RecordNotFound(record_id))?;

        if let Some(expected) = expected_version {
            if expected != current.version {
                return Err(conflict(record_id));
            }
        }

        let mut next = apply_update(&current, &update);
        if next == current {
            debug!(%record_id, "completion update is a no-op");
            return Ok(CompletionOutcome {
                record: current,
                changed: false,
                event: None,
            });
        }

        let now = stored_precision(now);
        next.version = current.version + 1;
        next.updated_at = now;

        let event = (current.state.as_str() != next.state.as_str())
            .then(|| RecordEvent::transition(record_id, &current.state, &next.state, now));

        self.records
            .update(&next, current.version, event.as_ref())
            .await
            .map_err(|e| match e {
                DomainError::ConcurrencyConflict { .. } | DomainError::RecordNotFound(_) => e,
                other => {
                    warn!(%record_id, error = %other, "failed to persist completion update");
                    update_failed(record_id, &other)
                }
            })?;

        info!(
            %record_id,
            from = current.state.as_str(),
            to = next.state.as_str(),
            version = next.version,
            "record updated"
        );

        Ok(CompletionOutcome {
            record: next,
            changed: true,
            event,
        })
    }

    /// Mark a record completed; `at` defaults to the current time.
    pub async fn complete(
        &self,
        record_id: Uuid,
        compliant: bool,
        at: Option<DateTime<Utc>>,
    ) -> DomainResult<CompletionOutcome> {
        let at = at.unwrap_or_else(|| self.clock.now());
        self.set_completion(record_id, CompletionUpdate::completed(compliant, at), None)
            .await
    }

    /// Put a completed record back to pending, clearing compliance and date.
    pub async fn reopen(&self, record_id: Uuid) -> DomainResult<CompletionOutcome> {
        self.set_completion(record_id, CompletionUpdate::pending(), None).await
    }

    /// Change comments and/or photo without touching the completion state.
    pub async fn update_notes(
        &self,
        record_id: Uuid,
        comments: Option<Option<String>>,
        photo: Option<PhotoChange>,
    ) -> DomainResult<CompletionOutcome> {
        let current = self
            .records
            .get(record_id)
            .await
            .map_err(|e| update_failed(record_id, &e))?
            .ok_or(DomainError::RecordNotFound(record_id))?;

        let mut update = update_preserving_state(&current.state);
        update.comments = comments;
        update.photo_url = photo;

        self.set_completion(record_id, update, Some(current.version)).await
    }

    /// Completion audit trail of a record, oldest first.
    pub async fn history(&self, record_id: Uuid) -> DomainResult<Vec<RecordEvent>> {
        self.records
            .list_events(record_id)
            .await
            .map_err(|e| DomainError::fetch_failed("record history", &e))
    }
}

/// Update that reproduces `state` unchanged.
pub fn update_preserving_state(state: &CompletionState) -> CompletionUpdate {
    match state {
        CompletionState::Pending => CompletionUpdate::pending(),
        CompletionState::Completed { compliant, completed_at } => {
            CompletionUpdate::completed(*compliant, *completed_at)
        }
    }
}

/// Consistency rules of a completion update, checked before any I/O.
pub fn validate_update(
    update: &CompletionUpdate,
    now: DateTime<Utc>,
    future_tolerance: Duration,
) -> DomainResult<()> {
    if !update.is_completed {
        if update.is_compliant.is_some() {
            return Err(DomainError::ValidationFailed(
                "a pending record cannot carry a compliance judgment".to_string(),
            ));
        }
        if update.completion_date.is_some() {
            return Err(DomainError::ValidationFailed(
                "a pending record cannot carry a completion date".to_string(),
            ));
        }
        return Ok(());
    }

    let Some(completed_at) = update.completion_date else {
        return Err(DomainError::ValidationFailed(
            "a completed record needs a completion date".to_string(),
        ));
    };
    if update.is_compliant.is_none() {
        return Err(DomainError::ValidationFailed(
            "a completed record needs a compliance judgment".to_string(),
        ));
    }
    if completed_at > now + future_tolerance {
        return Err(DomainError::ValidationFailed(format!(
            "completion date {} is in the future",
            completed_at.to_rfc3339()
        )));
    }
    if let Some(PhotoChange::Set(url)) = &update.photo_url {
        if url.trim().is_empty() {
            return Err(DomainError::ValidationFailed("photo URL is empty".to_string()));
        }
    }
    Ok(())
}

/// Fold a validated update into a copy of `record`.
fn apply_update(record: &CleaningRecord, update: &CompletionUpdate) -> CleaningRecord {
    let mut next = record.clone();

    next.state = match (update.is_completed, update.is_compliant, update.completion_date) {
        (true, Some(compliant), Some(completed_at)) => CompletionState::Completed {
            compliant,
            completed_at: stored_precision(completed_at),
        },
        _ => CompletionState::Pending,
    };

    match &update.photo_url {
        Some(PhotoChange::Set(url)) => next.photo_url = Some(url.clone()),
        Some(PhotoChange::Clear) => next.photo_url = None,
        None => {}
    }

    if let Some(comments) = &update.comments {
        next.comments = comments
            .as_ref()
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());
    }

    next
}

fn update_failed(record_id: Uuid, err: &DomainError) -> DomainError {
    DomainError::UpdateFailed {
        record_id,
        reason: err.to_string(),
    }
}

fn conflict(record_id: Uuid) -> DomainError {
    DomainError::ConcurrencyConflict {
        entity: "cleaning_record".to_string(),
        id: record_id.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::{
        create_migrated_test_pool, SqliteCleaningRecordRepository, SqliteCleaningTaskRepository,
    };
    use crate::domain::models::cleaning_task::{CleaningTask, Frequency};
    use crate::domain::ports::{CleaningTaskRepository, FixedClock};
    use chrono::TimeZone;

    fn march(d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, d, h, 0, 0).unwrap()
    }

    async fn setup_evaluator() -> (
        ComplianceEvaluator<SqliteCleaningRecordRepository>,
        Arc<SqliteCleaningRecordRepository>,
        CleaningRecord,
    ) {
        let pool = create_migrated_test_pool().await.unwrap();
        let tasks = SqliteCleaningTaskRepository::new(pool.clone());
        let task = CleaningTask::new("Nettoyage des sols", Frequency::Daily, "Laver");
        tasks.create(&task).await.unwrap();

        let records = Arc::new(SqliteCleaningRecordRepository::new(pool));
        let record = CleaningRecord::new(task.id, march(10, 0));
        records.insert(&record).await.unwrap();

        let clock = Arc::new(FixedClock::new(march(15, 12)));
        let evaluator = ComplianceEvaluator::new(records.clone(), clock);
        (evaluator, records, record)
    }

    #[test]
    fn test_validation_rules() {
        let now = march(15, 12);
        let tol = Duration::minutes(5);

        let pending_with_compliance = CompletionUpdate {
            is_compliant: Some(true),
            ..CompletionUpdate::pending()
        };
        assert!(validate_update(&pending_with_compliance, now, tol).is_err());

        let pending_with_date = CompletionUpdate {
            completion_date: Some(now),
            ..CompletionUpdate::pending()
        };
        assert!(validate_update(&pending_with_date, now, tol).is_err());

        let completed_without_date = CompletionUpdate {
            is_completed: true,
            is_compliant: Some(true),
            ..CompletionUpdate::default()
        };
        assert!(validate_update(&completed_without_date, now, tol).is_err());

        let completed_without_compliance = CompletionUpdate {
            is_completed: true,
            completion_date: Some(now),
            ..CompletionUpdate::default()
        };
        assert!(validate_update(&completed_without_compliance, now, tol).is_err());

        let future = CompletionUpdate::completed(true, now + Duration::hours(1));
        assert!(validate_update(&future, now, tol).is_err());

        let slightly_ahead = CompletionUpdate::completed(true, now + Duration::minutes(2));
        assert!(validate_update(&slightly_ahead, now, tol).is_ok());
        assert!(validate_update(&CompletionUpdate::pending(), now, tol).is_ok());
    }

    #[tokio::test]
    async fn test_complete_record() {
        let (evaluator, records, record) = setup_evaluator().await;

        let outcome = evaluator.complete(record.id, true, Some(march(15, 9))).await.unwrap();
        assert!(outcome.changed);
        assert_eq!(outcome.record.version, 2);
        assert_eq!(outcome.event.as_ref().map(|e| e.to_state.as_str()), Some("compliant"));

        let stored = records.get(record.id).await.unwrap().unwrap();
        assert!(stored.is_completed_compliant());
        assert_eq!(stored.completion_date(), Some(march(15, 9)));
    }

    #[tokio::test]
    async fn test_invalid_update_writes_nothing() {
        let (evaluator, records, record) = setup_evaluator().await;
        let bad = CompletionUpdate {
            is_completed: true,
            completion_date: Some(march(15, 9)),
            ..CompletionUpdate::default()
        };

        let result = evaluator.set_completion(record.id, bad, None).await;
        assert!(matches!(result, Err(DomainError::ValidationFailed(_))));

        let stored = records.get(record.id).await.unwrap().unwrap();
        assert_eq!(stored.state, CompletionState::Pending);
        assert_eq!(stored.version, record.version);
    }

    #[tokio::test]
    async fn test_same_update_twice_is_idempotent() {
        let (evaluator, records, record) = setup_evaluator().await;
        let update = CompletionUpdate::completed(false, march(15, 9));

        let first = evaluator.set_completion(record.id, update.clone(), None).await.unwrap();
        let second = evaluator.set_completion(record.id, update, None).await.unwrap();
        assert!(first.changed);
        assert!(!second.changed);
        assert_eq!(second.record, first.record);
        assert_eq!(records.list_events(record.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_completion_at_sub_microsecond_clock_is_idempotent() {
        let (_evaluator, records, record) = setup_evaluator().await;
        let now = march(15, 12) + Duration::nanoseconds(123_456_789);
        let evaluator = ComplianceEvaluator::new(records.clone(), Arc::new(FixedClock::new(now)));

        let first = evaluator.complete(record.id, true, None).await.unwrap();
        let second = evaluator.complete(record.id, true, None).await.unwrap();
        assert!(first.changed);
        assert!(!second.changed);

        let stored = records.get(record.id).await.unwrap().unwrap();
        assert_eq!(stored.version, 2);
        assert_eq!(stored, first.record);
        assert_eq!(
            stored.completion_date(),
            Some(march(15, 12) + Duration::microseconds(123_456))
        );
    }

    #[tokio::test]
    async fn test_reopen_clears_compliance_and_is_audited() {
        let (evaluator, _records, record) = setup_evaluator().await;
        evaluator.complete(record.id, true, Some(march(15, 9))).await.unwrap();

        let outcome = evaluator.reopen(record.id).await.unwrap();
        assert_eq!(outcome.record.state, CompletionState::Pending);
        assert_eq!(outcome.record.is_compliant(), None);
        assert_eq!(outcome.record.completion_date(), None);

        let history = evaluator.history(record.id).await.unwrap();
        let transitions: Vec<_> = history
            .iter()
            .map(|e| (e.from_state.as_str(), e.to_state.as_str()))
            .collect();
        assert_eq!(transitions, vec![("pending", "compliant"), ("compliant", "pending")]);
    }

    #[tokio::test]
    async fn test_stale_version_is_rejected() {
        let (evaluator, _records, record) = setup_evaluator().await;
        evaluator.complete(record.id, true, Some(march(15, 9))).await.unwrap();

        let result = evaluator
            .set_completion(record.id, CompletionUpdate::pending(), Some(record.version))
            .await;
        assert!(matches!(result, Err(DomainError::ConcurrencyConflict { .. })));
    }

    #[tokio::test]
    async fn test_update_notes_keeps_state() {
        let (evaluator, _records, record) = setup_evaluator().await;
        evaluator.complete(record.id, false, Some(march(15, 9))).await.unwrap();

        let outcome = evaluator
            .update_notes(
                record.id,
                Some(Some("joint de carrelage à reprendre".into())),
                Some(PhotoChange::Set("file:///tmp/p.jpg".into())),
            )
            .await
            .unwrap();
        assert!(outcome.changed);
        assert!(outcome.event.is_none());
        assert_eq!(outcome.record.is_compliant(), Some(false));
        assert_eq!(outcome.record.photo_url.as_deref(), Some("file:///tmp/p.jpg"));
        assert_eq!(outcome.record.comments.as_deref(), Some("joint de carrelage à reprendre"));
    }

    #[tokio::test]
    async fn test_unknown_record() {
        let (evaluator, _records, _record) = setup_evaluator().await;
        let result = evaluator.reopen(Uuid::new_v4()).await;
        assert!(matches!(result, Err(DomainError::RecordNotFound(_))));
    }
}
