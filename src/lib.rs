//! HACCP cleaning plan
//!
//! Keeps the cleaning task catalog of a food business, schedules dated
//! occurrences of each task, records whether each occurrence was done and
//! judged compliant, and projects the records into calendar and task list
//! views.
//!
//! # Architecture
//!
//! The crate follows a hexagonal layout:
//!
//! - **Domain Layer** (`domain`): models, errors and the ports services depend on
//! - **Adapters** (`adapters`): `SQLite` repositories and local photo storage
//! - **Service Layer** (`services`): compliance rules, occurrence generation,
//!   calendar aggregation, task list tabs and the record board
//! - **Infrastructure Layer** (`infrastructure`): configuration and logging
//! - **CLI Layer** (`cli`): command-line interface
//!
//! # Example
//!
//! ```ignore
//! use haccp_plan::adapters::sqlite::create_migrated_test_pool;
//! use haccp_plan::cli::AppContext;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let pool = create_migrated_test_pool().await?;
//!     let config = haccp_plan::Config::default();
//!     let ctx = AppContext::with_pool(&config, pool, std::sync::Arc::new(haccp_plan::SystemClock))?;
//!     let plan = ctx.catalog().create_zone_plan(&ctx.generator(), "CUISINE", chrono::Utc::now().date_naive(), 7).await?;
//!     println!("{} occurrences", plan.occurrence_count());
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::models::{
    CalendarCursor, CleaningRecord, CleaningReference, CleaningTask, CompletionState, CompletionUpdate, Config, Frequency,
    Granularity, OrgTimezone, PhotoChange, RecordEvent, ReferenceKind, TaskReferences,
};
pub use domain::ports::{
    CleaningRecordRepository, CleaningReferenceRepository, CleaningTaskRepository, Clock, FixedClock, PhotoStorage, RecordQuery,
    SystemClock, TaskQuery,
};
pub use domain::{DomainError, DomainResult};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{
    ComplianceEvaluator, OccurrenceGenerator, RecordBoard, RecordEditor, RecordTab, ReferenceCatalog,
    TaskCatalogService,
};
