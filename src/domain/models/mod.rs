//! Domain models for the cleaning plan.

pub mod calendar;
pub mod cleaning_library;
pub mod cleaning_record;
pub mod cleaning_reference;
pub mod cleaning_task;
pub mod config;

pub use calendar::{
    days_in_month, BucketStats, CalendarCell, CalendarCursor, CalendarView, DayBucket,
    Granularity, OrgTimezone,
};
pub use cleaning_library::PredefinedTask;
pub use cleaning_record::{
    CleaningRecord, CompletionState, CompletionUpdate, PhotoChange, RecordEvent,
};
pub use cleaning_reference::{CleaningReference, ReferenceKind, TaskReferences};
pub use cleaning_task::{CleaningTask, Frequency};
pub use config::{
    Config, DatabaseConfig, LoggingConfig, OrganizationConfig, PhotoConfig, SchedulingConfig,
};
