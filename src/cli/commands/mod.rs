//! CLI command implementations.

pub mod calendar;
pub mod init;
pub mod plan;
pub mod record;
pub mod reference;
pub mod task;
