//! SQLite adapter for CleaningRecordRepository.

use async_trait::async_trait;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use uuid::Uuid;

use crate::adapters::sqlite::{format_datetime, parse_datetime, parse_optional_datetime, parse_uuid};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::cleaning_record::{CleaningRecord, CompletionState, RecordEvent};
use crate::domain::ports::cleaning_record_repository::{
    CleaningRecordRepository, CompletionFilter, RecordQuery,
};

#[derive(Clone)]
pub struct SqliteCleaningRecordRepository {
    pool: SqlitePool,
}

impl SqliteCleaningRecordRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct CleaningRecordRow {
    id: String,
    cleaning_task_id: String,
    scheduled_date: String,
    is_completed: bool,
    is_compliant: Option<bool>,
    completion_date: Option<String>,
    photo_url: Option<String>,
    comments: Option<String>,
    version: i64,
    created_at: String,
    updated_at: String,
}

#[derive(sqlx::FromRow)]
struct RecordEventRow {
    id: String,
    record_id: String,
    from_state: String,
    to_state: String,
    occurred_at: String,
}

fn row_to_record(row: CleaningRecordRow) -> DomainResult<CleaningRecord> {
    let updated_at = parse_datetime(&row.updated_at)?;
    let state = CompletionState::from_columns(
        row.is_completed,
        row.is_compliant,
        parse_optional_datetime(row.completion_date)?,
        updated_at,
    );

    Ok(CleaningRecord {
        id: parse_uuid(&row.id)?,
        cleaning_task_id: parse_uuid(&row.cleaning_task_id)?,
        scheduled_date: parse_datetime(&row.scheduled_date)?,
        state,
        photo_url: row.photo_url,
        comments: row.comments,
        version: u64::try_from(row.version).unwrap_or(1),
        created_at: parse_datetime(&row.created_at)?,
        updated_at,
    })
}

fn row_to_event(row: RecordEventRow) -> DomainResult<RecordEvent> {
    Ok(RecordEvent {
        id: parse_uuid(&row.id)?,
        record_id: parse_uuid(&row.record_id)?,
        from_state: row.from_state,
        to_state: row.to_state,
        occurred_at: parse_datetime(&row.occurred_at)?,
    })
}

/// Column values derived from the completion state.
fn state_columns(state: &CompletionState) -> (bool, Option<bool>, Option<String>) {
    match state {
        CompletionState::Pending => (false, None, None),
        CompletionState::Completed { compliant, completed_at } => {
            (true, Some(*compliant), Some(format_datetime(*completed_at)))
        }
    }
}

fn version_to_i64(version: u64) -> i64 {
    i64::try_from(version).unwrap_or(i64::MAX)
}

const INSERT_SQL: &str = "INSERT INTO cleaning_records
     (id, cleaning_task_id, scheduled_date, is_completed, is_compliant, completion_date,
      photo_url, comments, version, created_at, updated_at)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)";

const INSERT_IGNORE_SQL: &str = "INSERT OR IGNORE INTO cleaning_records
     (id, cleaning_task_id, scheduled_date, is_completed, is_compliant, completion_date,
      photo_url, comments, version, created_at, updated_at)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)";

fn bind_record<'q>(
    sql: &'q str,
    record: &'q CleaningRecord,
) -> sqlx::query::Query<'q, Sqlite, sqlx::sqlite::SqliteArguments<'q>> {
    let (is_completed, is_compliant, completion_date) = state_columns(&record.state);
    sqlx::query(sql)
        .bind(record.id.to_string())
        .bind(record.cleaning_task_id.to_string())
        .bind(format_datetime(record.scheduled_date))
        .bind(is_completed)
        .bind(is_compliant)
        .bind(completion_date)
        .bind(&record.photo_url)
        .bind(&record.comments)
        .bind(version_to_i64(record.version))
        .bind(format_datetime(record.created_at))
        .bind(format_datetime(record.updated_at))
}

#[async_trait]
impl CleaningRecordRepository for SqliteCleaningRecordRepository {
    async fn insert(&self, record: &CleaningRecord) -> DomainResult<()> {
        bind_record(INSERT_SQL, record)
            .execute(&self.pool)
            .await
            .map_err(|e| match e.as_database_error() {
                Some(db) if db.is_unique_violation() => DomainError::ValidationFailed(format!(
                    "task {} is already scheduled at {}",
                    record.cleaning_task_id,
                    format_datetime(record.scheduled_date)
                )),
                Some(db) if db.is_foreign_key_violation() => {
                    DomainError::TaskNotFound(record.cleaning_task_id)
                }
                _ => DomainError::from(e),
            })?;

        Ok(())
    }

    async fn insert_batch(&self, records: &[CleaningRecord]) -> DomainResult<usize> {
        let mut tx = self.pool.begin().await?;
        let mut inserted = 0u64;

        for record in records {
            let result = bind_record(INSERT_IGNORE_SQL, record).execute(&mut *tx).await?;
            inserted += result.rows_affected();
        }

        tx.commit().await?;
        Ok(usize::try_from(inserted).unwrap_or(usize::MAX))
    }

    async fn get(&self, id: Uuid) -> DomainResult<Option<CleaningRecord>> {
        let row: Option<CleaningRecordRow> =
            sqlx::query_as("SELECT * FROM cleaning_records WHERE id = ?")
                .bind(id.to_string())
                .fetch_optional(&self.pool)
                .await?;

        row.map(row_to_record).transpose()
    }

    async fn list(&self, query: RecordQuery) -> DomainResult<Vec<CleaningRecord>> {
        let mut builder: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT * FROM cleaning_records WHERE 1 = 1");

        if let Some(task_id) = query.task_id {
            builder.push(" AND cleaning_task_id = ").push_bind(task_id.to_string());
        }
        if let Some(from) = query.from {
            builder.push(" AND scheduled_date >= ").push_bind(format_datetime(from));
        }
        if let Some(to) = query.to {
            builder.push(" AND scheduled_date < ").push_bind(format_datetime(to));
        }
        match query.completion {
            Some(CompletionFilter::Pending) => {
                builder.push(" AND is_completed = 0");
            }
            Some(CompletionFilter::Completed) => {
                builder.push(" AND is_completed = 1");
            }
            None => {}
        }
        builder.push(" ORDER BY scheduled_date DESC, id ASC");
        if let Some(limit) = query.limit {
            builder.push(" LIMIT ").push_bind(i64::from(limit));
        }

        let rows: Vec<CleaningRecordRow> = builder.build_query_as().fetch_all(&self.pool).await?;
        rows.into_iter().map(row_to_record).collect()
    }

    async fn update(
        &self,
        record: &CleaningRecord,
        expected_version: u64,
        event: Option<&RecordEvent>,
    ) -> DomainResult<()> {
        let (is_completed, is_compliant, completion_date) = state_columns(&record.state);
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "UPDATE cleaning_records SET
             is_completed = ?3, is_compliant = ?4, completion_date = ?5,
             photo_url = ?6, comments = ?7, version = ?8, updated_at = ?9
             WHERE id = ?1 AND version = ?2"
        )
        .bind(record.id.to_string())
        .bind(version_to_i64(expected_version))
        .bind(is_completed)
        .bind(is_compliant)
        .bind(completion_date)
        .bind(&record.photo_url)
        .bind(&record.comments)
        .bind(version_to_i64(record.version))
        .bind(format_datetime(record.updated_at))
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            let exists: Option<(i64,)> = sqlx::query_as("SELECT version FROM cleaning_records WHERE id = ?")
                .bind(record.id.to_string())
                .fetch_optional(&mut *tx)
                .await?;
            tx.rollback().await?;

            return Err(match exists {
                Some(_) => DomainError::ConcurrencyConflict {
                    entity: "cleaning_record".to_string(),
                    id: record.id.to_string(),
                },
                None => DomainError::RecordNotFound(record.id),
            });
        }

        if let Some(event) = event {
            sqlx::query(
                "INSERT INTO cleaning_record_events (id, record_id, from_state, to_state, occurred_at)
                 VALUES (?, ?, ?, ?, ?)"
            )
            .bind(event.id.to_string())
            .bind(event.record_id.to_string())
            .bind(&event.from_state)
            .bind(&event.to_state)
            .bind(format_datetime(event.occurred_at))
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> DomainResult<()> {
        let result = sqlx::query("DELETE FROM cleaning_records WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DomainError::RecordNotFound(id));
        }

        Ok(())
    }

    async fn count_for_task(&self, task_id: Uuid) -> DomainResult<u64> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM cleaning_records WHERE cleaning_task_id = ?")
                .bind(task_id.to_string())
                .fetch_one(&self.pool)
                .await?;

        Ok(u64::try_from(count).unwrap_or(0))
    }

    async fn list_events(&self, record_id: Uuid) -> DomainResult<Vec<RecordEvent>> {
        let rows: Vec<RecordEventRow> = sqlx::query_as(
            "SELECT * FROM cleaning_record_events WHERE record_id = ? ORDER BY occurred_at ASC, rowid ASC"
        )
        .bind(record_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(row_to_event).collect()
    }
}
