//! Repository port for the cleaning task catalog.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::cleaning_task::CleaningTask;

/// Filter for listing catalog entries.
#[derive(Debug, Default, Clone)]
pub struct TaskQuery {
    pub organization_id: Option<Uuid>,
    pub active_only: bool,
    /// Zone name; with `zone_id` set, unlinked tasks match on this name.
    pub zone: Option<String>,
    pub zone_id: Option<Uuid>,
    pub sub_zone_id: Option<Uuid>,
}

#[async_trait]
pub trait CleaningTaskRepository: Send + Sync {
    /// Create a new catalog entry.
    async fn create(&self, task: &CleaningTask) -> DomainResult<()>;

    /// Get a task by ID.
    async fn get(&self, id: Uuid) -> DomainResult<Option<CleaningTask>>;

    /// Update an existing task.
    async fn update(&self, task: &CleaningTask) -> DomainResult<()>;

    /// Delete a task by ID.
    async fn delete(&self, id: Uuid) -> DomainResult<()>;

    /// List tasks, ordered by name.
    async fn list(&self, query: TaskQuery) -> DomainResult<Vec<CleaningTask>>;
}
