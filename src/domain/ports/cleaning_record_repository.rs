//! Repository port for cleaning records (task occurrences).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::cleaning_record::{CleaningRecord, RecordEvent};

/// Completion filter applied by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionFilter {
    Pending,
    Completed,
}

/// Filter for listing records. Date bounds are half-open: `[from, to)`.
#[derive(Debug, Default, Clone)]
pub struct RecordQuery {
    pub task_id: Option<Uuid>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub completion: Option<CompletionFilter>,
    pub limit: Option<u32>,
}

impl RecordQuery {
    pub fn for_task(task_id: Uuid) -> Self {
        Self {
            task_id: Some(task_id),
            ..Self::default()
        }
    }

    pub fn between(from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        Self {
            from: Some(from),
            to: Some(to),
            ..Self::default()
        }
    }
}

#[async_trait]
pub trait CleaningRecordRepository: Send + Sync {
    /// Insert a single record.
    async fn insert(&self, record: &CleaningRecord) -> DomainResult<()>;

    /// Insert many records atomically; returns how many were inserted.
    async fn insert_batch(&self, records: &[CleaningRecord]) -> DomainResult<usize>;

    /// Get a record by ID.
    async fn get(&self, id: Uuid) -> DomainResult<Option<CleaningRecord>>;

    /// List records, most recently scheduled first.
    async fn list(&self, query: RecordQuery) -> DomainResult<Vec<CleaningRecord>>;

    /// Persist `record` if the stored version still equals
    /// `expected_version`. The stored version becomes `record.version`.
    /// Fails with `ConcurrencyConflict` when the row moved on.
    async fn update(
        &self,
        record: &CleaningRecord,
        expected_version: u64,
        event: Option<&RecordEvent>,
    ) -> DomainResult<()>;

    /// Delete a record by ID.
    async fn delete(&self, id: Uuid) -> DomainResult<()>;

    /// Number of records attached to a task.
    async fn count_for_task(&self, task_id: Uuid) -> DomainResult<u64>;

    /// Completion audit trail of a record, oldest first.
    async fn list_events(&self, record_id: Uuid) -> DomainResult<Vec<RecordEvent>>;
}
