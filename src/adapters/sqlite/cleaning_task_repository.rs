//! SQLite adapter for CleaningTaskRepository.

use async_trait::async_trait;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use uuid::Uuid;

use crate::adapters::sqlite::{format_datetime, parse_datetime, parse_optional_uuid, parse_uuid};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::cleaning_reference::TaskReferences;
use crate::domain::models::cleaning_task::{CleaningTask, Frequency};
use crate::domain::ports::cleaning_task_repository::{CleaningTaskRepository, TaskQuery};

#[derive(Clone)]
pub struct SqliteCleaningTaskRepository {
    pool: SqlitePool,
}

impl SqliteCleaningTaskRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct CleaningTaskRow {
    id: String,
    organization_id: Option<String>,
    name: String,
    frequency: String,
    frequency_days: Option<i64>,
    zone: Option<String>,
    action_to_perform: String,
    responsible_role: Option<String>,
    zone_id: Option<String>,
    sub_zone_id: Option<String>,
    product_id: Option<String>,
    equipment_id: Option<String>,
    method_id: Option<String>,
    is_active: bool,
    created_at: String,
    updated_at: String,
}

fn row_to_task(row: CleaningTaskRow) -> DomainResult<CleaningTask> {
    let every_days = row.frequency_days.and_then(|d| u32::try_from(d).ok());
    let frequency = Frequency::parse(&row.frequency, every_days).ok_or_else(|| {
        DomainError::SerializationError(format!(
            "unknown frequency '{}' for task {}",
            row.frequency, row.id
        ))
    })?;

    Ok(CleaningTask {
        id: parse_uuid(&row.id)?,
        organization_id: parse_optional_uuid(row.organization_id)?,
        name: row.name,
        frequency,
        zone: row.zone,
        action_to_perform: row.action_to_perform,
        responsible_role: row.responsible_role,
        references: TaskReferences {
            zone_id: parse_optional_uuid(row.zone_id)?,
            sub_zone_id: parse_optional_uuid(row.sub_zone_id)?,
            product_id: parse_optional_uuid(row.product_id)?,
            equipment_id: parse_optional_uuid(row.equipment_id)?,
            method_id: parse_optional_uuid(row.method_id)?,
        },
        is_active: row.is_active,
        created_at: parse_datetime(&row.created_at)?,
        updated_at: parse_datetime(&row.updated_at)?,
    })
}

fn optional_id(id: Option<Uuid>) -> Option<String> {
    id.map(|id| id.to_string())
}

#[async_trait]
impl CleaningTaskRepository for SqliteCleaningTaskRepository {
    async fn create(&self, task: &CleaningTask) -> DomainResult<()> {
        sqlx::query(
            "INSERT INTO cleaning_tasks
             (id, organization_id, name, frequency, frequency_days, zone,
              action_to_perform, responsible_role, is_active, created_at, updated_at,
              zone_id, sub_zone_id, product_id, equipment_id, method_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)"
        )
        .bind(task.id.to_string())
        .bind(task.organization_id.map(|id| id.to_string()))
        .bind(&task.name)
        .bind(task.frequency.as_str())
        .bind(task.frequency.every_days().map(i64::from))
        .bind(&task.zone)
        .bind(&task.action_to_perform)
        .bind(&task.responsible_role)
        .bind(task.is_active)
        .bind(format_datetime(task.created_at))
        .bind(format_datetime(task.updated_at))
        .bind(optional_id(task.references.zone_id))
        .bind(optional_id(task.references.sub_zone_id))
        .bind(optional_id(task.references.product_id))
        .bind(optional_id(task.references.equipment_id))
        .bind(optional_id(task.references.method_id))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get(&self, id: Uuid) -> DomainResult<Option<CleaningTask>> {
        let row: Option<CleaningTaskRow> =
            sqlx::query_as("SELECT * FROM cleaning_tasks WHERE id = ?")
                .bind(id.to_string())
                .fetch_optional(&self.pool)
                .await?;

        row.map(row_to_task).transpose()
    }

    async fn update(&self, task: &CleaningTask) -> DomainResult<()> {
        let result = sqlx::query(
            "UPDATE cleaning_tasks SET
             organization_id = ?2, name = ?3, frequency = ?4, frequency_days = ?5,
             zone = ?6, action_to_perform = ?7, responsible_role = ?8,
             is_active = ?9, updated_at = ?10, zone_id = ?11, sub_zone_id = ?12,
             product_id = ?13, equipment_id = ?14, method_id = ?15
             WHERE id = ?1"
        )
        .bind(task.id.to_string())
        .bind(task.organization_id.map(|id| id.to_string()))
        .bind(&task.name)
        .bind(task.frequency.as_str())
        .bind(task.frequency.every_days().map(i64::from))
        .bind(&task.zone)
        .bind(&task.action_to_perform)
        .bind(&task.responsible_role)
        .bind(task.is_active)
        .bind(format_datetime(task.updated_at))
        .bind(optional_id(task.references.zone_id))
        .bind(optional_id(task.references.sub_zone_id))
        .bind(optional_id(task.references.product_id))
        .bind(optional_id(task.references.equipment_id))
        .bind(optional_id(task.references.method_id))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DomainError::TaskNotFound(task.id));
        }

        Ok(())
    }

    async fn delete(&self, id: Uuid) -> DomainResult<()> {
        let result = sqlx::query("DELETE FROM cleaning_tasks WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DomainError::TaskNotFound(id));
        }

        Ok(())
    }

    async fn list(&self, query: TaskQuery) -> DomainResult<Vec<CleaningTask>> {
        let mut builder: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT * FROM cleaning_tasks WHERE 1 = 1");

        if let Some(org) = query.organization_id {
            builder.push(" AND organization_id = ").push_bind(org.to_string());
        }
        if query.active_only {
            builder.push(" AND is_active = 1");
        }
        match (query.zone_id, query.zone) {
            (Some(zone_id), Some(zone)) => {
                builder
                    .push(" AND (zone_id = ")
                    .push_bind(zone_id.to_string())
                    .push(" OR (zone_id IS NULL AND zone = ")
                    .push_bind(zone)
                    .push("))");
            }
            (Some(zone_id), None) => {
                builder.push(" AND zone_id = ").push_bind(zone_id.to_string());
            }
            (None, Some(zone)) => {
                builder.push(" AND zone = ").push_bind(zone);
            }
            (None, None) => {}
        }
        if let Some(sub_zone_id) = query.sub_zone_id {
            builder.push(" AND sub_zone_id = ").push_bind(sub_zone_id.to_string());
        }
        builder.push(" ORDER BY name ASC, created_at ASC");

        let rows: Vec<CleaningTaskRow> = builder.build_query_as().fetch_all(&self.pool).await?;
        rows.into_iter().map(row_to_task).collect()
    }
}
