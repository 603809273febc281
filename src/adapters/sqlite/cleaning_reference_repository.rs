//! SQLite adapter for CleaningReferenceRepository.

use async_trait::async_trait;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use uuid::Uuid;

use crate::adapters::sqlite::{format_datetime, parse_datetime, parse_optional_uuid, parse_uuid};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::cleaning_reference::{CleaningReference, ReferenceKind};
use crate::domain::ports::cleaning_reference_repository::{CleaningReferenceRepository, ReferenceQuery};

#[derive(Clone)]
pub struct SqliteCleaningReferenceRepository {
    pool: SqlitePool,
}

impl SqliteCleaningReferenceRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct CleaningReferenceRow {
    id: String,
    organization_id: Option<String>,
    kind: String,
    parent_id: Option<String>,
    name: String,
    description: Option<String>,
    category: Option<String>,
    brand: Option<String>,
    steps: String,
    is_active: bool,
    created_at: String,
}

fn row_to_reference(row: CleaningReferenceRow) -> DomainResult<CleaningReference> {
    let kind = ReferenceKind::parse(&row.kind).ok_or_else(|| {
        DomainError::SerializationError(format!("unknown reference kind '{}' for {}", row.kind, row.id))
    })?;

    Ok(CleaningReference {
        id: parse_uuid(&row.id)?,
        organization_id: parse_optional_uuid(row.organization_id)?,
        kind,
        parent_id: parse_optional_uuid(row.parent_id)?,
        name: row.name,
        description: row.description,
        category: row.category,
        brand: row.brand,
        steps: serde_json::from_str(&row.steps)?,
        is_active: row.is_active,
        created_at: parse_datetime(&row.created_at)?,
    })
}

#[async_trait]
impl CleaningReferenceRepository for SqliteCleaningReferenceRepository {
    async fn create(&self, reference: &CleaningReference) -> DomainResult<()> {
        sqlx::query(
            "INSERT INTO cleaning_references
             (id, organization_id, kind, parent_id, name, description, category, brand,
              steps, is_active, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"
        )
        .bind(reference.id.to_string())
        .bind(reference.organization_id.map(|id| id.to_string()))
        .bind(reference.kind.as_str())
        .bind(reference.parent_id.map(|id| id.to_string()))
        .bind(&reference.name)
        .bind(&reference.description)
        .bind(&reference.category)
        .bind(&reference.brand)
        .bind(serde_json::to_string(&reference.steps)?)
        .bind(reference.is_active)
        .bind(format_datetime(reference.created_at))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get(&self, id: Uuid) -> DomainResult<Option<CleaningReference>> {
        let row: Option<CleaningReferenceRow> =
            sqlx::query_as("SELECT * FROM cleaning_references WHERE id = ?")
                .bind(id.to_string())
                .fetch_optional(&self.pool)
                .await?;

        row.map(row_to_reference).transpose()
    }

    async fn update(&self, reference: &CleaningReference) -> DomainResult<()> {
        let result = sqlx::query(
            "UPDATE cleaning_references SET
             name = ?2, description = ?3, category = ?4, brand = ?5, steps = ?6, is_active = ?7
             WHERE id = ?1"
        )
        .bind(reference.id.to_string())
        .bind(&reference.name)
        .bind(&reference.description)
        .bind(&reference.category)
        .bind(&reference.brand)
        .bind(serde_json::to_string(&reference.steps)?)
        .bind(reference.is_active)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DomainError::ReferenceNotFound(reference.id));
        }

        Ok(())
    }

    async fn delete(&self, id: Uuid) -> DomainResult<()> {
        let result = sqlx::query("DELETE FROM cleaning_references WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DomainError::ReferenceNotFound(id));
        }

        Ok(())
    }

    async fn list(&self, query: ReferenceQuery) -> DomainResult<Vec<CleaningReference>> {
        let mut builder: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT * FROM cleaning_references WHERE 1 = 1");

        if let Some(org) = query.organization_id {
            builder.push(" AND organization_id = ").push_bind(org.to_string());
        }
        if let Some(kind) = query.kind {
            builder.push(" AND kind = ").push_bind(kind.as_str());
        }
        if let Some(parent) = query.parent_id {
            builder.push(" AND parent_id = ").push_bind(parent.to_string());
        }
        if query.active_only {
            builder.push(" AND is_active = 1");
        }
        builder.push(" ORDER BY kind ASC, name COLLATE NOCASE ASC");

        let rows: Vec<CleaningReferenceRow> = builder.build_query_as().fetch_all(&self.pool).await?;
        rows.into_iter().map(row_to_reference).collect()
    }

    async fn count_linked_tasks(&self, id: Uuid) -> DomainResult<u64> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM cleaning_tasks
             WHERE zone_id = ?1 OR sub_zone_id = ?1 OR product_id = ?1
                OR equipment_id = ?1 OR method_id = ?1
                OR sub_zone_id IN (SELECT id FROM cleaning_references WHERE parent_id = ?1)"
        )
        .bind(id.to_string())
        .fetch_one(&self.pool)
        .await?;

        Ok(u64::try_from(count).unwrap_or(0))
    }
}
