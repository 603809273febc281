//! Command-line interface for the cleaning plan.

pub mod commands;
pub mod context;
pub mod id_resolver;
pub mod output;
pub mod table;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use clap::{Parser, Subcommand};

use crate::domain::errors::DomainError;
use crate::domain::models::calendar::OrgTimezone;

pub use context::AppContext;

#[derive(Parser, Debug)]
#[command(name = "haccp-plan")]
#[command(about = "HACCP cleaning plan: tasks, scheduled occurrences and compliance records")]
#[command(version)]
pub struct Cli {
    /// Emit machine-readable JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the .haccp directory, default config and database
    Init(commands::init::InitArgs),
    /// Manage the cleaning task catalog
    Task(commands::task::TaskArgs),
    /// Create scheduled occurrences
    Plan(commands::plan::PlanArgs),
    /// Inspect and update cleaning records
    Record(commands::record::RecordArgs),
    /// Show the calendar view
    Calendar(commands::calendar::CalendarArgs),
    /// Manage zones, sub-zones, products, equipment and methods
    #[command(alias = "ref")]
    Reference(commands::reference::ReferenceArgs),
}

#[derive(Debug, serde::Serialize)]
struct ErrorOutput<'a> {
    success: bool,
    error: &'a str,
    message: String,
    retryable: bool,
}

/// Print an error (text or JSON) and exit non-zero.
pub fn handle_error(err: anyhow::Error, json_mode: bool) -> ! {
    let domain = err.downcast_ref::<DomainError>();
    if json_mode {
        let out = ErrorOutput {
            success: false,
            error: domain.map_or("error", DomainError::code),
            message: format!("{err:#}"),
            retryable: domain.is_some_and(DomainError::is_retryable),
        };
        println!("{}", serde_json::to_string_pretty(&out).unwrap_or_default());
    } else {
        eprintln!("{}", output::action_failure(&format!("{err:#}")));
        if domain.is_some_and(DomainError::is_retryable) {
            eprintln!("  The operation can be retried.");
        }
    }
    std::process::exit(1);
}

/// Parse a `YYYY-MM-DD` calendar date.
pub fn parse_date(s: &str) -> anyhow::Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|_| anyhow::anyhow!("Invalid date '{s}'. Use YYYY-MM-DD"))
}

/// Parse a timestamp: RFC3339, or a local `YYYY-MM-DD HH:MM` / `YYYY-MM-DD`
/// in the organization timezone.
pub fn parse_timestamp(s: &str, tz: OrgTimezone) -> anyhow::Result<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M"] {
        if let Ok(local) = NaiveDateTime::parse_from_str(s, format) {
            return Ok(tz.to_utc(local.date(), local.time()));
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(tz.start_of_day(date));
    }
    anyhow::bail!("Invalid date/time '{s}'. Use RFC3339, 'YYYY-MM-DD HH:MM' or YYYY-MM-DD")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_timestamp_formats() {
        let paris = OrgTimezone::parse("Europe/Paris").unwrap();
        let expected = Utc.with_ymd_and_hms(2024, 3, 15, 8, 30, 0).unwrap();
        assert_eq!(parse_timestamp("2024-03-15T08:30:00Z", paris).unwrap(), expected);
        assert_eq!(parse_timestamp("2024-03-15 09:30", paris).unwrap(), expected);
        assert_eq!(
            parse_timestamp("2024-03-15", paris).unwrap(),
            Utc.with_ymd_and_hms(2024, 3, 14, 23, 0, 0).unwrap()
        );
        assert!(parse_timestamp("15/03/2024", paris).is_err());
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(parse_date("2024-02-29").unwrap(), NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
        assert!(parse_date("2023-02-29").is_err());
    }
}
