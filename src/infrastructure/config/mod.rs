//! Configuration management infrastructure
//!
//! Hierarchical configuration using figment:
//! - YAML file loading (`.haccp/config.yaml`, `.haccp/local.yaml`)
//! - Environment variable overrides (`HACCP_` prefix)
//! - Configuration validation

pub mod loader;

pub use loader::{ConfigError, ConfigLoader};
