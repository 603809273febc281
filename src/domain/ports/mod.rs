//! Ports (interfaces) the services depend on.

pub mod cleaning_record_repository;
pub mod cleaning_reference_repository;
pub mod cleaning_task_repository;
pub mod clock;
pub mod photo_storage;

pub use cleaning_record_repository::{CleaningRecordRepository, CompletionFilter, RecordQuery};
pub use cleaning_reference_repository::{CleaningReferenceRepository, ReferenceQuery};
pub use cleaning_task_repository::{CleaningTaskRepository, TaskQuery};
pub use clock::{Clock, FixedClock, SystemClock};
pub use photo_storage::PhotoStorage;
