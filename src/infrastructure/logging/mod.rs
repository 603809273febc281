//! Logging infrastructure
//!
//! Structured logging using tracing and tracing-subscriber:
//! - compact or JSON console output on stderr
//! - optional rolling JSON log files

pub mod config;
pub mod logger;

pub use config::{LogConfig, LogFormat, RotationPolicy};
pub use logger::LoggerImpl;
