use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration structure for the cleaning plan
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Organization the plan belongs to
    #[serde(default)]
    pub organization: OrganizationConfig,

    /// Photo evidence storage
    #[serde(default)]
    pub photos: PhotoConfig,

    /// Occurrence generation and completion defaults
    #[serde(default)]
    pub scheduling: SchedulingConfig,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DatabaseConfig {
    /// Path to `SQLite` database file
    #[serde(default = "default_database_path")]
    pub path: String,

    /// Maximum number of database connections in pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_database_path() -> String {
    ".haccp/haccp.db".to_string()
}

const fn default_max_connections() -> u32 {
    5
}

impl DatabaseConfig {
    /// sqlx connection URL for the configured path.
    pub fn url(&self) -> String {
        if self.path.starts_with("sqlite:") {
            self.path.clone()
        } else {
            format!("sqlite:{}", self.path)
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
            max_connections: default_max_connections(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Directory for rolling log files; stderr only when unset
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    /// Rotation of file logs: daily, hourly, never
    #[serde(default = "default_rotation")]
    pub rotation: String,
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_rotation() -> String {
    "daily".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_dir: None,
            rotation: default_rotation(),
        }
    }
}

/// Organization settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct OrganizationConfig {
    /// Organization id stamped on catalog entries (optional)
    #[serde(default)]
    pub id: Option<uuid::Uuid>,

    /// IANA timezone used for every calendar-day comparison
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

fn default_timezone() -> String {
    "Europe/Paris".to_string()
}

impl Default for OrganizationConfig {
    fn default() -> Self {
        Self {
            id: None,
            timezone: default_timezone(),
        }
    }
}

/// Photo evidence storage
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PhotoConfig {
    /// Directory where uploaded photos are written
    #[serde(default = "default_photo_directory")]
    pub directory: PathBuf,

    /// Maximum accepted photo size in bytes
    #[serde(default = "default_max_photo_bytes")]
    pub max_bytes: u64,

    /// Accepted file extensions (lowercase, without dot)
    #[serde(default = "default_allowed_extensions")]
    pub allowed_extensions: Vec<String>,
}

fn default_photo_directory() -> PathBuf {
    PathBuf::from(".haccp/photos")
}

const fn default_max_photo_bytes() -> u64 {
    5 * 1024 * 1024
}

fn default_allowed_extensions() -> Vec<String> {
    ["jpg", "jpeg", "png", "webp", "heic"]
        .iter()
        .map(|s| (*s).to_string())
        .collect()
}

impl Default for PhotoConfig {
    fn default() -> Self {
        Self {
            directory: default_photo_directory(),
            max_bytes: default_max_photo_bytes(),
            allowed_extensions: default_allowed_extensions(),
        }
    }
}

/// Occurrence generation and completion defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SchedulingConfig {
    /// Days covered when generating a plan from a start date
    #[serde(default = "default_horizon_days")]
    pub default_horizon_days: u32,

    /// Occurrences created by a repeat request
    #[serde(default = "default_repeat_count")]
    pub default_repeat_count: u32,

    /// Local wall-clock time of generated occurrences (HH:MM)
    #[serde(default = "default_time_of_day")]
    pub default_time_of_day: String,

    /// How far in the future a completion date may lie, in minutes
    #[serde(default = "default_future_tolerance")]
    pub future_completion_tolerance_minutes: i64,
}

const fn default_horizon_days() -> u32 {
    100
}

const fn default_repeat_count() -> u32 {
    30
}

fn default_time_of_day() -> String {
    "00:00".to_string()
}

const fn default_future_tolerance() -> i64 {
    5
}

impl Default for SchedulingConfig {
    fn default() -> Self {
        Self {
            default_horizon_days: default_horizon_days(),
            default_repeat_count: default_repeat_count(),
            default_time_of_day: default_time_of_day(),
            future_completion_tolerance_minutes: default_future_tolerance(),
        }
    }
}
