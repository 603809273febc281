//! Implementation of the `haccp-plan init` command.

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;
use tokio::fs;

use crate::adapters::sqlite::initialize_database;
use crate::cli::output::{output, CommandOutput};
use crate::domain::models::calendar::OrgTimezone;
use crate::domain::models::config::{Config, DatabaseConfig};

const STATE_DIR: &str = ".haccp";

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Force reinitialization even if already initialized (drops existing data)
    #[arg(long, short)]
    pub force: bool,

    /// IANA timezone of the organization, written to config.yaml
    #[arg(long, default_value = "Europe/Paris")]
    pub timezone: String,

    /// Target directory (defaults to current directory)
    #[arg(default_value = ".")]
    pub path: PathBuf,
}

#[derive(Debug, serde::Serialize)]
pub struct InitOutput {
    pub success: bool,
    pub message: String,
    pub initialized_path: PathBuf,
    pub directories_created: Vec<String>,
    pub config_written: bool,
    pub database_initialized: bool,
}

impl CommandOutput for InitOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![self.message.clone()];
        if !self.directories_created.is_empty() {
            lines.push("\nCreated directories:".to_string());
            for dir in &self.directories_created {
                lines.push(format!("  - {dir}"));
            }
        }
        if self.config_written {
            lines.push(format!("\nConfiguration written to {STATE_DIR}/config.yaml"));
        }
        if self.database_initialized {
            lines.push(format!("Database initialized at {STATE_DIR}/haccp.db"));
        }
        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn execute(args: InitArgs, json_mode: bool) -> Result<()> {
    let target_path = if args.path.is_absolute() {
        args.path.clone()
    } else {
        std::env::current_dir().context("Failed to get current directory")?.join(&args.path)
    };
    OrgTimezone::parse(&args.timezone)?;

    let state_dir = target_path.join(STATE_DIR);

    if state_dir.exists() && !args.force {
        let output_data = InitOutput {
            success: false,
            message: "Cleaning plan already initialized. Use --force to reinitialize.".to_string(),
            initialized_path: target_path,
            directories_created: vec![],
            config_written: false,
            database_initialized: false,
        };
        output(&output_data, json_mode);
        return Ok(());
    }

    if args.force && state_dir.exists() {
        fs::remove_dir_all(&state_dir)
            .await
            .context("Failed to remove existing .haccp directory")?;
    }

    let mut directories_created = vec![];
    for dir in [state_dir.clone(), state_dir.join("photos"), state_dir.join("logs")] {
        if !dir.exists() {
            fs::create_dir_all(&dir)
                .await
                .with_context(|| format!("Failed to create {}", dir.display()))?;
            let relative = dir.strip_prefix(&target_path).unwrap_or(&dir).to_string_lossy().to_string();
            directories_created.push(relative);
        }
    }

    let mut config = Config::default();
    config.organization.timezone = args.timezone.clone();
    let yaml = serde_yaml::to_string(&config).context("Failed to serialize default configuration")?;
    fs::write(state_dir.join("config.yaml"), yaml)
        .await
        .context("Failed to write config.yaml")?;

    let database = DatabaseConfig {
        path: state_dir.join("haccp.db").to_string_lossy().to_string(),
        ..DatabaseConfig::default()
    };
    let pool = initialize_database(&database)
        .await
        .context("Failed to initialize database")?;
    pool.close().await;

    tracing::info!(path = %target_path.display(), timezone = %args.timezone, "cleaning plan initialized");

    let output_data = InitOutput {
        success: true,
        message: if args.force {
            "Cleaning plan reinitialized successfully.".to_string()
        } else {
            "Cleaning plan initialized successfully.".to_string()
        },
        initialized_path: target_path,
        directories_created,
        config_written: true,
        database_initialized: true,
    };

    output(&output_data, json_mode);
    Ok(())
}
