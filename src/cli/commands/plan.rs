//! Occurrence generation commands.

use anyhow::{anyhow, Result};
use clap::{Args, Subcommand};
use uuid::Uuid;

use crate::cli::context::AppContext;
use crate::cli::id_resolver::resolve_task_id;
use crate::cli::output::{output, short_id, CommandOutput};
use crate::cli::{parse_date, parse_timestamp};
use crate::domain::models::cleaning_record::CleaningRecord;
use crate::services::{GenerationReport, RepeatInterval, ZonePlan};

#[derive(Args, Debug)]
pub struct PlanArgs {
    #[command(subcommand)]
    pub command: PlanCommands,
}

#[derive(Subcommand, Debug)]
pub enum PlanCommands {
    /// Add every library task of a zone and schedule their occurrences
    Zone {
        /// Zone name from the library, e.g. CUISINE or ECONOMAT
        zone: String,
        /// First day (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        start: Option<String>,
        /// Number of days covered (defaults to scheduling.default_horizon_days)
        #[arg(long)]
        days: Option<u32>,
    },
    /// Schedule a task's occurrences according to its frequency
    Generate {
        /// Task ID (full UUID or prefix)
        task: String,
        #[arg(long)]
        start: Option<String>,
        #[arg(long)]
        days: Option<u32>,
    },
    /// Create occurrences at a fixed step from a first date and time
    Repeat {
        /// Task ID (full UUID or prefix)
        task: String,
        /// First occurrence (RFC3339 or local "YYYY-MM-DD HH:MM")
        #[arg(long)]
        start: String,
        /// daily, weekly or monthly
        #[arg(long, short, default_value = "daily")]
        interval: String,
        /// Number of occurrences (defaults to scheduling.default_repeat_count)
        #[arg(long, short)]
        count: Option<u32>,
    },
    /// Schedule a single occurrence
    Schedule {
        /// Task ID (full UUID or prefix)
        task: String,
        /// When (RFC3339 or local "YYYY-MM-DD HH:MM")
        #[arg(long)]
        at: String,
        #[arg(long)]
        comments: Option<String>,
    },
}

#[derive(Debug, serde::Serialize)]
pub struct GenerationOutput {
    pub task_id: Uuid,
    pub requested: usize,
    pub skipped: usize,
    pub created: usize,
    pub first: Option<String>,
    pub last: Option<String>,
}

impl GenerationOutput {
    fn from_report(report: &GenerationReport, ctx: &AppContext) -> Self {
        let local = |r: &CleaningRecord| {
            r.scheduled_date
                .with_timezone(&ctx.tz.tz())
                .format("%Y-%m-%d %H:%M")
                .to_string()
        };
        Self {
            task_id: report.task_id,
            requested: report.requested,
            skipped: report.skipped,
            created: report.created.len(),
            first: report.created.iter().min_by_key(|r| r.scheduled_date).map(local),
            last: report.created.iter().max_by_key(|r| r.scheduled_date).map(local),
        }
    }
}

impl CommandOutput for GenerationOutput {
    fn to_human(&self) -> String {
        let mut line = format!(
            "Created {} occurrence(s) for task {}",
            self.created,
            short_id(&self.task_id)
        );
        if let (Some(first), Some(last)) = (&self.first, &self.last) {
            line.push_str(&format!(" from {first} to {last}"));
        }
        if self.skipped > 0 {
            line.push_str(&format!("\n{} slot(s) already scheduled, skipped", self.skipped));
        }
        line
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

#[derive(Debug, serde::Serialize)]
pub struct ZonePlanOutput {
    pub zone: String,
    pub tasks_created: usize,
    pub tasks_reused: usize,
    pub occurrences_created: usize,
    pub tasks: Vec<ZoneTaskLine>,
}

#[derive(Debug, serde::Serialize)]
pub struct ZoneTaskLine {
    pub id: Uuid,
    pub name: String,
    pub frequency: String,
    pub occurrences: usize,
}

impl From<&ZonePlan> for ZonePlanOutput {
    fn from(plan: &ZonePlan) -> Self {
        let tasks = plan
            .tasks
            .iter()
            .map(|task| ZoneTaskLine {
                id: task.id,
                name: task.name.clone(),
                frequency: task.frequency.label(),
                occurrences: plan
                    .occurrences
                    .iter()
                    .filter(|r| r.task_id == task.id)
                    .map(|r| r.created.len())
                    .sum(),
            })
            .collect();
        Self {
            zone: plan.zone.clone(),
            tasks_created: plan.tasks.len() - plan.reused,
            tasks_reused: plan.reused,
            occurrences_created: plan.occurrence_count(),
            tasks,
        }
    }
}

impl CommandOutput for ZonePlanOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![format!(
            "Zone {}: {} task(s) created, {} reused, {} occurrence(s) scheduled",
            self.zone, self.tasks_created, self.tasks_reused, self.occurrences_created
        )];
        for task in &self.tasks {
            lines.push(format!(
                "  {} {} ({}): {}",
                short_id(&task.id),
                task.name,
                task.frequency,
                task.occurrences
            ));
        }
        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

#[derive(Debug, serde::Serialize)]
pub struct ScheduleOutput {
    pub success: bool,
    pub record_id: Uuid,
    pub scheduled_local: String,
}

impl CommandOutput for ScheduleOutput {
    fn to_human(&self) -> String {
        format!(
            "Scheduled record {} for {}",
            short_id(&self.record_id),
            self.scheduled_local
        )
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn execute(args: PlanArgs, ctx: &AppContext, json_mode: bool) -> Result<()> {
    let generator = ctx.generator();
    let today = ctx.tz.local_date(ctx.now());
    let horizon = ctx.config.scheduling.default_horizon_days;

    match args.command {
        PlanCommands::Zone { zone, start, days } => {
            let start = start.as_deref().map(parse_date).transpose()?.unwrap_or(today);
            let plan = ctx
                .catalog()
                .create_zone_plan(&generator, &zone, start, days.unwrap_or(horizon))
                .await?;
            output(&ZonePlanOutput::from(&plan), json_mode);
        }

        PlanCommands::Generate { task, start, days } => {
            let task_id = resolve_task_id(&ctx.pool, &task).await?;
            let start = start.as_deref().map(parse_date).transpose()?.unwrap_or(today);
            let report = generator
                .generate_plan(task_id, start, days.unwrap_or(horizon))
                .await?;
            output(&GenerationOutput::from_report(&report, ctx), json_mode);
        }

        PlanCommands::Repeat {
            task,
            start,
            interval,
            count,
        } => {
            let task_id = resolve_task_id(&ctx.pool, &task).await?;
            let start = parse_timestamp(&start, ctx.tz)?;
            let interval = RepeatInterval::from_str(&interval)
                .ok_or_else(|| anyhow!("Unknown interval '{interval}'. Use daily, weekly or monthly"))?;
            let count = count.unwrap_or(ctx.config.scheduling.default_repeat_count);
            let report = generator.repeat(task_id, start, interval, count).await?;
            output(&GenerationOutput::from_report(&report, ctx), json_mode);
        }

        PlanCommands::Schedule { task, at, comments } => {
            let task_id = resolve_task_id(&ctx.pool, &task).await?;
            let at = parse_timestamp(&at, ctx.tz)?;
            let record = generator.schedule_once(task_id, at, comments).await?;
            output(
                &ScheduleOutput {
                    success: true,
                    record_id: record.id,
                    scheduled_local: at.with_timezone(&ctx.tz.tz()).format("%Y-%m-%d %H:%M").to_string(),
                },
                json_mode,
            );
        }
    }

    Ok(())
}
