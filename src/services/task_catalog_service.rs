//! Service for managing the cleaning task catalog.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::cleaning_library::{self, PredefinedTask};
use crate::domain::models::cleaning_record::stored_precision;
use crate::domain::models::cleaning_reference::TaskReferences;
use crate::domain::models::cleaning_task::{CleaningTask, Frequency};
use crate::domain::ports::{CleaningRecordRepository, CleaningTaskRepository, TaskQuery};
use crate::services::occurrence_generator::{GenerationReport, OccurrenceGenerator};

/// Partial edit of a catalog entry; `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    pub name: Option<String>,
    pub frequency: Option<Frequency>,
    pub zone: Option<Option<String>>,
    pub action_to_perform: Option<String>,
    pub responsible_role: Option<Option<String>>,
    pub references: Option<TaskReferences>,
    pub is_active: Option<bool>,
}

impl TaskPatch {
    fn apply(self, task: &mut CleaningTask) {
        if let Some(name) = self.name {
            task.name = name.trim().to_string();
        }
        if let Some(frequency) = self.frequency {
            task.frequency = frequency;
        }
        if let Some(zone) = self.zone {
            task.zone = zone;
        }
        if let Some(action) = self.action_to_perform {
            task.action_to_perform = action.trim().to_string();
        }
        if let Some(role) = self.responsible_role {
            task.responsible_role = role;
        }
        if let Some(references) = self.references {
            task.references = references;
        }
        if let Some(active) = self.is_active {
            task.is_active = active;
        }
    }
}

/// Result of bootstrapping a zone from the predefined library.
#[derive(Debug, Clone, Serialize)]
pub struct ZonePlan {
    pub zone: String,
    pub tasks: Vec<CleaningTask>,
    /// Library entries whose name already existed in the catalog.
    pub reused: usize,
    pub occurrences: Vec<GenerationReport>,
}

impl ZonePlan {
    pub fn occurrence_count(&self) -> usize {
        self.occurrences.iter().map(|r| r.created.len()).sum()
    }
}

pub struct TaskCatalogService<T: CleaningTaskRepository, R: CleaningRecordRepository> {
    tasks: Arc<T>,
    records: Arc<R>,
    organization_id: Option<Uuid>,
}

impl<T: CleaningTaskRepository, R: CleaningRecordRepository> TaskCatalogService<T, R> {
    pub fn new(tasks: Arc<T>, records: Arc<R>) -> Self {
        Self {
            tasks,
            records,
            organization_id: None,
        }
    }

    /// Stamp new tasks with an organization and scope listings to it.
    pub fn with_organization(mut self, organization_id: Option<Uuid>) -> Self {
        self.organization_id = organization_id;
        self
    }

    /// Validate and store a new task.
    #[instrument(skip(self, task), fields(name = %task.name))]
    pub async fn create_task(&self, mut task: CleaningTask) -> DomainResult<CleaningTask> {
        task.name = task.name.trim().to_string();
        task.action_to_perform = task.action_to_perform.trim().to_string();
        if task.organization_id.is_none() {
            task.organization_id = self.organization_id;
        }
        task.validate()?;

        self.tasks.create(&task).await?;
        info!(task_id = %task.id, frequency = %task.frequency, "created cleaning task");
        Ok(task)
    }

    pub async fn get_task(&self, id: Uuid) -> DomainResult<CleaningTask> {
        self.tasks.get(id).await?.ok_or(DomainError::TaskNotFound(id))
    }

    pub async fn list_tasks(&self, active_only: bool, zone: Option<String>) -> DomainResult<Vec<CleaningTask>> {
        self.tasks
            .list(TaskQuery {
                organization_id: self.organization_id,
                active_only,
                zone,
                ..TaskQuery::default()
            })
            .await
            .map_err(|e| DomainError::fetch_failed("cleaning tasks", &e))
    }

    /// Apply a patch; the result is validated before being stored.
    #[instrument(skip(self, patch))]
    pub async fn update_task(&self, id: Uuid, patch: TaskPatch) -> DomainResult<CleaningTask> {
        let mut task = self.get_task(id).await?;
        let before = task.clone();
        patch.apply(&mut task);
        if task == before {
            return Ok(task);
        }
        task.validate()?;
        task.updated_at = stored_precision(Utc::now());

        self.tasks.update(&task).await?;
        info!(task_id = %id, "updated cleaning task");
        Ok(task)
    }

    /// Hide a task from planning while keeping its history.
    pub async fn deactivate_task(&self, id: Uuid) -> DomainResult<CleaningTask> {
        self.update_task(
            id,
            TaskPatch {
                is_active: Some(false),
                ..TaskPatch::default()
            },
        )
        .await
    }

    /// Delete a task that has no records. Tasks with history must be
    /// deactivated instead.
    #[instrument(skip(self))]
    pub async fn delete_task(&self, id: Uuid) -> DomainResult<()> {
        let task = self.get_task(id).await?;
        let count = self.records.count_for_task(id).await?;
        if count > 0 {
            warn!(task_id = %id, records = count, "refusing to delete task with records");
            return Err(DomainError::ValidationFailed(format!(
                "task '{}' has {count} record(s); deactivate it instead",
                task.name
            )));
        }

        self.tasks.delete(id).await?;
        info!(task_id = %id, "deleted cleaning task");
        Ok(())
    }

    /// Predefined tasks of a zone.
    pub fn library(&self, zone: Option<&str>) -> Vec<PredefinedTask> {
        match zone {
            Some(zone) => cleaning_library::tasks_for_zone(zone),
            None => cleaning_library::predefined_tasks().to_vec(),
        }
    }

    /// Add every library task of `zone` to the catalog (reusing tasks that
    /// already exist under the same name) and lay out their occurrences from
    /// `start` over `days`.
    #[instrument(skip(self, generator))]
    pub async fn create_zone_plan(
        &self,
        generator: &OccurrenceGenerator<T, R>,
        zone: &str,
        start: NaiveDate,
        days: u32,
    ) -> DomainResult<ZonePlan> {
        let library = cleaning_library::tasks_for_zone(zone);
        let Some(first) = library.first() else {
            return Err(DomainError::ValidationFailed(format!(
                "unknown zone '{zone}' (known zones: {})",
                cleaning_library::zones().join(", ")
            )));
        };
        let zone_name = first.zone.to_string();

        let existing = self.list_tasks(false, Some(zone_name.clone())).await?;
        let mut tasks = Vec::with_capacity(library.len());
        let mut reused = 0;

        for entry in &library {
            match existing.iter().find(|t| t.name == entry.name) {
                Some(task) => {
                    reused += 1;
                    tasks.push(task.clone());
                }
                None => {
                    let task = CleaningTask::new(entry.name, entry.default_frequency, entry.category)
                        .with_zone(entry.zone);
                    tasks.push(self.create_task(task).await?);
                }
            }
        }

        let mut occurrences = Vec::new();
        for task in tasks.iter().filter(|t| t.is_active && t.frequency.is_schedulable()) {
            occurrences.push(generator.generate_plan(task.id, start, days).await?);
        }

        let plan = ZonePlan {
            zone: zone_name,
            tasks,
            reused,
            occurrences,
        };
        info!(
            zone = %plan.zone,
            tasks = plan.tasks.len(),
            reused = plan.reused,
            occurrences = plan.occurrence_count(),
            "created zone plan"
        );
        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::{
        create_migrated_test_pool, SqliteCleaningRecordRepository, SqliteCleaningTaskRepository,
    };
    use crate::domain::models::calendar::OrgTimezone;
    use crate::domain::models::cleaning_record::CleaningRecord;

    type Catalog = TaskCatalogService<SqliteCleaningTaskRepository, SqliteCleaningRecordRepository>;
    type Generator = OccurrenceGenerator<SqliteCleaningTaskRepository, SqliteCleaningRecordRepository>;

    async fn setup_service() -> (Catalog, Generator, Arc<SqliteCleaningRecordRepository>) {
        let pool = create_migrated_test_pool().await.unwrap();
        let tasks = Arc::new(SqliteCleaningTaskRepository::new(pool.clone()));
        let records = Arc::new(SqliteCleaningRecordRepository::new(pool));
        let generator = OccurrenceGenerator::new(tasks.clone(), records.clone(), OrgTimezone::utc());
        (TaskCatalogService::new(tasks, records.clone()), generator, records)
    }

    #[tokio::test]
    async fn test_create_task_validates() {
        let (service, _, _) = setup_service().await;
        let result = service.create_task(CleaningTask::new("  ", Frequency::Daily, "x")).await;
        assert!(matches!(result, Err(DomainError::ValidationFailed(_))));

        let task = service
            .create_task(CleaningTask::new(" Sols ", Frequency::Daily, " Laver "))
            .await
            .unwrap();
        assert_eq!(task.name, "Sols");
        assert_eq!(task.action_to_perform, "Laver");
    }

    #[tokio::test]
    async fn test_update_and_deactivate() {
        let (service, _, _) = setup_service().await;
        let task = service
            .create_task(CleaningTask::new("Hotte", Frequency::Weekly, "Dégraisser"))
            .await
            .unwrap();

        let updated = service
            .update_task(
                task.id,
                TaskPatch {
                    frequency: Some(Frequency::Custom { every_days: 14 }),
                    zone: Some(Some("CUISINE".into())),
                    ..TaskPatch::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.frequency, Frequency::Custom { every_days: 14 });

        let bad = service
            .update_task(task.id, TaskPatch { action_to_perform: Some(String::new()), ..TaskPatch::default() })
            .await;
        assert!(bad.is_err());

        let inactive = service.deactivate_task(task.id).await.unwrap();
        assert!(!inactive.is_active);
        assert!(service.list_tasks(true, None).await.unwrap().is_empty());
        assert_eq!(service.list_tasks(false, None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_is_refused_when_records_exist() {
        let (service, _, records) = setup_service().await;
        let task = service
            .create_task(CleaningTask::new("Sols", Frequency::Daily, "Laver"))
            .await
            .unwrap();
        records.insert(&CleaningRecord::new(task.id, Utc::now())).await.unwrap();

        let result = service.delete_task(task.id).await;
        assert!(matches!(result, Err(DomainError::ValidationFailed(_))));

        let empty = service
            .create_task(CleaningTask::new("Vitres", Frequency::Monthly, "Laver"))
            .await
            .unwrap();
        service.delete_task(empty.id).await.unwrap();
        assert!(matches!(service.get_task(empty.id).await, Err(DomainError::TaskNotFound(_))));
    }

    #[tokio::test]
    async fn test_zone_plan_from_library() {
        let (service, generator, _) = setup_service().await;
        let start = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();

        let plan = service.create_zone_plan(&generator, "economat", start, 6).await.unwrap();
        assert_eq!(plan.zone, "ECONOMAT");
        assert_eq!(plan.tasks.len(), 4);
        assert_eq!(plan.reused, 0);
        // After-service task is skipped; two weekly tasks and one monthly get
        // one occurrence each within the first week.
        assert_eq!(plan.occurrences.len(), 3);
        assert_eq!(plan.occurrence_count(), 3);

        let again = service.create_zone_plan(&generator, "ECONOMAT", start, 6).await.unwrap();
        assert_eq!(again.reused, 4);
        assert_eq!(again.occurrence_count(), 0);

        assert!(service.create_zone_plan(&generator, "TERRASSE", start, 6).await.is_err());
    }
}
