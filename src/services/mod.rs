pub mod calendar_aggregator;
pub mod cleaning_stats;
pub mod compliance_evaluator;
pub mod occurrence_generator;
pub mod record_board;
pub mod record_editor;
pub mod reference_catalog;
pub mod task_catalog_service;
pub mod task_list;

pub use cleaning_stats::CleaningStats;
pub use compliance_evaluator::{ComplianceEvaluator, CompletionOutcome};
pub use occurrence_generator::{GenerationReport, OccurrenceGenerator, RepeatInterval};
pub use record_board::{BoardSnapshot, LoadOutcome, RecordBoard};
pub use record_editor::{EditSession, PhotoUpload, RecordDraft, RecordEditor, SubmitOutcome};
pub use reference_catalog::{LinkRequest, ReferenceCatalog};
pub use task_catalog_service::{TaskCatalogService, TaskPatch, ZonePlan};
pub use task_list::{RecordTab, TabCounts, TaskListQuery, TaskListView};
