//! Short ID prefix resolution for CLI commands.
//!
//! Any unique prefix of a UUID can be given instead of the full id, similar
//! to git short hashes.

use anyhow::{bail, Result};
use sqlx::SqlitePool;
use uuid::Uuid;

const TASK_QUERY: &str = "SELECT id FROM cleaning_tasks WHERE id LIKE ?";
const RECORD_QUERY: &str = "SELECT id FROM cleaning_records WHERE id LIKE ?";
const REFERENCE_QUERY: &str = "SELECT id FROM cleaning_references WHERE id LIKE ?";

/// Resolve a cleaning task ID prefix to a full UUID.
pub async fn resolve_task_id(pool: &SqlitePool, prefix: &str) -> Result<Uuid> {
    resolve_prefix(pool, prefix, "task", TASK_QUERY).await
}

/// Resolve a cleaning record ID prefix to a full UUID.
pub async fn resolve_record_id(pool: &SqlitePool, prefix: &str) -> Result<Uuid> {
    resolve_prefix(pool, prefix, "record", RECORD_QUERY).await
}

/// Resolve a zone, product, equipment or method ID prefix to a full UUID.
pub async fn resolve_reference_id(pool: &SqlitePool, prefix: &str) -> Result<Uuid> {
    resolve_prefix(pool, prefix, "reference", REFERENCE_QUERY).await
}

fn validate_prefix(prefix: &str) -> Result<()> {
    if prefix.is_empty() {
        bail!("ID prefix must not be empty");
    }
    if !prefix.chars().all(|c| c.is_ascii_hexdigit() || c == '-') {
        bail!("Invalid ID prefix '{prefix}': must contain only hex characters and dashes");
    }
    Ok(())
}

async fn resolve_prefix(pool: &SqlitePool, prefix: &str, entity: &str, query: &str) -> Result<Uuid> {
    if let Ok(uuid) = Uuid::parse_str(prefix) {
        return Ok(uuid);
    }

    validate_prefix(prefix)?;
    let pattern = format!("{}%", prefix.to_lowercase());

    let rows: Vec<(String,)> = sqlx::query_as(query).bind(&pattern).fetch_all(pool).await?;

    match rows.as_slice() {
        [] => bail!("No {entity} found matching '{prefix}'"),
        [(id,)] => Ok(Uuid::parse_str(id)?),
        _ => {
            let mut msg = format!("Ambiguous prefix '{prefix}': matches {} {entity}s:", rows.len());
            for (id,) in &rows {
                msg.push_str(&format!("\n  {id}"));
            }
            bail!("{msg}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::{create_migrated_test_pool, SqliteCleaningTaskRepository};
    use crate::domain::models::cleaning_task::{CleaningTask, Frequency};
    use crate::domain::ports::CleaningTaskRepository;

    #[tokio::test]
    async fn test_resolve_task_prefix() {
        let pool = create_migrated_test_pool().await.unwrap();
        let repo = SqliteCleaningTaskRepository::new(pool.clone());
        let task = CleaningTask::new("Sols", Frequency::Daily, "Laver");
        repo.create(&task).await.unwrap();

        let prefix = &task.id.to_string()[..8];
        assert_eq!(resolve_task_id(&pool, prefix).await.unwrap(), task.id);
        assert_eq!(resolve_task_id(&pool, &task.id.to_string()).await.unwrap(), task.id);
        assert!(resolve_record_id(&pool, prefix).await.is_err());
        assert!(resolve_task_id(&pool, "zz").await.is_err());
    }
}
