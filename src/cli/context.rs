//! Wiring of the sqlite adapters and services for one CLI invocation.

use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Duration, NaiveTime, Utc};
use sqlx::SqlitePool;

use crate::adapters::sqlite::{
    initialize_database, SqliteCleaningRecordRepository, SqliteCleaningReferenceRepository, SqliteCleaningTaskRepository,
};
use crate::adapters::LocalPhotoStorage;
use crate::domain::models::calendar::OrgTimezone;
use crate::domain::models::config::Config;
use crate::domain::ports::{Clock, RecordQuery, SystemClock, TaskQuery};
use crate::infrastructure::config::ConfigLoader;
use crate::services::{
    BoardSnapshot, ComplianceEvaluator, LoadOutcome, OccurrenceGenerator, RecordBoard, RecordEditor, ReferenceCatalog,
    TaskCatalogService,
};

pub type TaskRepo = SqliteCleaningTaskRepository;
pub type RecordRepo = SqliteCleaningRecordRepository;
pub type ReferenceRepo = SqliteCleaningReferenceRepository;

pub struct AppContext {
    pub config: Config,
    pub pool: SqlitePool,
    pub tasks: Arc<TaskRepo>,
    pub records: Arc<RecordRepo>,
    pub references: Arc<ReferenceRepo>,
    pub tz: OrgTimezone,
    pub clock: Arc<dyn Clock>,
    time_of_day: NaiveTime,
}

impl AppContext {
    /// Open the configured database. Fails when `init` has not been run.
    pub async fn open(config: &Config) -> Result<Self> {
        let db_path = config.database.path.trim_start_matches("sqlite:");
        if db_path != ":memory:" && !Path::new(db_path).exists() {
            bail!("No database at {db_path}. Run 'haccp-plan init' first.");
        }
        let pool = initialize_database(&config.database)
            .await
            .context("Failed to initialize database. Run 'haccp-plan init' first.")?;
        Self::with_pool(config, pool, Arc::new(SystemClock))
    }

    /// Build the context around an existing pool and clock.
    pub fn with_pool(config: &Config, pool: SqlitePool, clock: Arc<dyn Clock>) -> Result<Self> {
        let tz = OrgTimezone::parse(&config.organization.timezone)?;
        let time_of_day = ConfigLoader::time_of_day(config)?;
        Ok(Self {
            config: config.clone(),
            tasks: Arc::new(SqliteCleaningTaskRepository::new(pool.clone())),
            records: Arc::new(SqliteCleaningRecordRepository::new(pool.clone())),
            references: Arc::new(SqliteCleaningReferenceRepository::new(pool.clone())),
            pool,
            tz,
            clock,
            time_of_day,
        })
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn task_query(&self) -> TaskQuery {
        TaskQuery {
            organization_id: self.config.organization.id,
            ..TaskQuery::default()
        }
    }

    pub fn catalog(&self) -> TaskCatalogService<TaskRepo, RecordRepo> {
        TaskCatalogService::new(self.tasks.clone(), self.records.clone())
            .with_organization(self.config.organization.id)
    }

    pub fn reference_catalog(&self) -> ReferenceCatalog<ReferenceRepo, TaskRepo> {
        ReferenceCatalog::new(self.references.clone(), self.tasks.clone())
            .with_organization(self.config.organization.id)
    }

    pub fn generator(&self) -> OccurrenceGenerator<TaskRepo, RecordRepo> {
        OccurrenceGenerator::new(self.tasks.clone(), self.records.clone(), self.tz)
            .with_time_of_day(self.time_of_day)
    }

    pub fn evaluator(&self) -> ComplianceEvaluator<RecordRepo> {
        ComplianceEvaluator::new(self.records.clone(), self.clock.clone()).with_future_tolerance(
            Duration::minutes(self.config.scheduling.future_completion_tolerance_minutes),
        )
    }

    pub fn board(&self) -> RecordBoard<TaskRepo, RecordRepo> {
        RecordBoard::new(self.tasks.clone(), self.records.clone())
    }

    /// Load a board for `query` and return it with its installed snapshot.
    pub async fn load_board(
        &self,
        query: RecordQuery,
    ) -> Result<(Arc<RecordBoard<TaskRepo, RecordRepo>>, Arc<BoardSnapshot>)> {
        let board = Arc::new(self.board());
        let snapshot = match board.refresh(self.task_query(), query).await? {
            LoadOutcome::Installed(snapshot) => snapshot,
            LoadOutcome::Discarded { .. } => board.snapshot().await,
        };
        Ok((board, snapshot))
    }

    /// Editor sharing `board` so saved edits show up in its snapshot.
    pub fn editor(&self, board: Arc<RecordBoard<TaskRepo, RecordRepo>>) -> RecordEditor<TaskRepo, RecordRepo> {
        RecordEditor::new(
            self.records.clone(),
            Arc::new(self.evaluator()),
            board,
            Arc::new(LocalPhotoStorage::new(&self.config.photos)),
        )
    }
}
