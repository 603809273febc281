//! Cleaning task catalog commands.

use std::collections::HashMap;

use anyhow::{anyhow, Result};
use clap::{Args, Subcommand};
use uuid::Uuid;

use crate::cli::context::AppContext;
use crate::cli::id_resolver::resolve_task_id;
use crate::cli::output::{output, short_id, ActionOutput, CommandOutput};
use crate::cli::table::TableFormatter;
use crate::domain::models::cleaning_library::PredefinedTask;
use crate::domain::models::cleaning_reference::{CleaningReference, ReferenceKind};
use crate::domain::models::cleaning_task::{CleaningTask, Frequency};
use crate::domain::ports::CleaningRecordRepository;
use crate::services::{LinkRequest, TaskPatch};

#[derive(Args, Debug)]
pub struct TaskArgs {
    #[command(subcommand)]
    pub command: TaskCommands,
}

#[derive(Subcommand, Debug)]
pub enum TaskCommands {
    /// Add a cleaning task to the catalog
    Add {
        /// Task name, e.g. "Nettoyage des sols"
        name: String,
        /// daily, weekly, monthly, after_use, after_service or custom
        #[arg(long, short, default_value = "daily")]
        frequency: String,
        /// Day interval for a custom frequency
        #[arg(long)]
        every_days: Option<u32>,
        /// What has to be done
        #[arg(long, short)]
        action: String,
        /// Zone, e.g. CUISINE; linked when the zone is in the reference table
        #[arg(long, short)]
        zone: Option<String>,
        /// Role responsible for the task
        #[arg(long)]
        role: Option<String>,
        #[command(flatten)]
        links: LinkArgs,
    },
    /// List catalog tasks
    List {
        /// Include deactivated tasks
        #[arg(long)]
        all: bool,
        /// Only tasks of this zone
        #[arg(long, short)]
        zone: Option<String>,
        /// Only tasks of this sub-zone of --zone
        #[arg(long, requires = "zone")]
        sub_zone: Option<String>,
    },
    /// Show one task
    Show {
        /// Task ID (full UUID or prefix)
        id: String,
    },
    /// Change fields of a task
    Update {
        /// Task ID (full UUID or prefix)
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long, short)]
        frequency: Option<String>,
        #[arg(long)]
        every_days: Option<u32>,
        #[arg(long, short)]
        action: Option<String>,
        /// New zone; empty string clears it
        #[arg(long, short)]
        zone: Option<String>,
        /// New responsible role; empty string clears it
        #[arg(long)]
        role: Option<String>,
        #[command(flatten)]
        links: LinkArgs,
        /// Reactivate a deactivated task
        #[arg(long)]
        activate: bool,
    },
    /// Hide a task from planning, keeping its records
    Deactivate {
        /// Task ID (full UUID or prefix)
        id: String,
    },
    /// Delete a task that has no records
    Delete {
        /// Task ID (full UUID or prefix)
        id: String,
    },
    /// Show the predefined task library
    Library {
        /// Only this zone
        #[arg(long, short)]
        zone: Option<String>,
    },
}

/// Reference links by name; on update an empty string removes the link.
#[derive(Args, Debug)]
pub struct LinkArgs {
    /// Sub-zone of the task's zone
    #[arg(long)]
    pub sub_zone: Option<String>,
    /// Cleaning product
    #[arg(long)]
    pub product: Option<String>,
    /// Cleaning equipment
    #[arg(long)]
    pub equipment: Option<String>,
    /// Cleaning method
    #[arg(long)]
    pub method: Option<String>,
}

impl LinkArgs {
    fn into_request(self, zone: Option<String>) -> LinkRequest {
        LinkRequest {
            zone: optional_text(zone),
            sub_zone: optional_text(self.sub_zone),
            product: optional_text(self.product),
            equipment: optional_text(self.equipment),
            method: optional_text(self.method),
        }
    }
}

#[derive(Debug, serde::Serialize)]
pub struct TaskSummary {
    pub id: Uuid,
    pub short_id: String,
    pub name: String,
    pub frequency: Frequency,
    pub frequency_label: String,
    pub zone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_zone: Option<String>,
    pub action_to_perform: String,
    pub responsible_role: Option<String>,
    pub is_active: bool,
}

impl TaskSummary {
    fn with_sub_zone(mut self, names: &HashMap<Uuid, String>, task: &CleaningTask) -> Self {
        self.sub_zone = task.references.sub_zone_id.and_then(|id| names.get(&id).cloned());
        self
    }

    /// Zone and sub-zone as shown in tables.
    pub fn location(&self) -> Option<String> {
        match (&self.zone, &self.sub_zone) {
            (Some(zone), Some(sub)) => Some(format!("{zone} / {sub}")),
            (zone, _) => zone.clone(),
        }
    }
}

impl From<&CleaningTask> for TaskSummary {
    fn from(task: &CleaningTask) -> Self {
        Self {
            id: task.id,
            short_id: short_id(&task.id),
            name: task.name.clone(),
            frequency: task.frequency,
            frequency_label: task.frequency.label(),
            zone: task.zone.clone(),
            sub_zone: None,
            action_to_perform: task.action_to_perform.clone(),
            responsible_role: task.responsible_role.clone(),
            is_active: task.is_active,
        }
    }
}

#[derive(Debug, serde::Serialize)]
pub struct TaskListOutput {
    pub tasks: Vec<TaskSummary>,
    pub total: usize,
}

impl CommandOutput for TaskListOutput {
    fn to_human(&self) -> String {
        if self.tasks.is_empty() {
            return "No cleaning tasks found.".to_string();
        }
        format!(
            "{}\n{} task(s)",
            TableFormatter::new().format_tasks(&self.tasks),
            self.total
        )
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

#[derive(Debug, serde::Serialize)]
pub struct TaskDetailOutput {
    #[serde(flatten)]
    pub task: TaskSummary,
    pub links: Vec<TaskLink>,
    pub record_count: u64,
}

#[derive(Debug, serde::Serialize)]
pub struct TaskLink {
    pub kind: ReferenceKind,
    pub name: String,
    pub is_active: bool,
}

impl From<&CleaningReference> for TaskLink {
    fn from(reference: &CleaningReference) -> Self {
        Self {
            kind: reference.kind,
            name: reference.name.clone(),
            is_active: reference.is_active,
        }
    }
}

impl CommandOutput for TaskDetailOutput {
    fn to_human(&self) -> String {
        let t = &self.task;
        let mut lines = vec![
            format!("Task: {}", t.name),
            format!("ID: {}", t.id),
            format!("Frequency: {}", t.frequency_label),
            format!("Action: {}", t.action_to_perform),
        ];
        if let Some(zone) = &t.zone {
            lines.push(format!("Zone: {zone}"));
        }
        for link in self.links.iter().filter(|l| l.kind != ReferenceKind::Zone) {
            let inactive = if link.is_active { "" } else { " (inactive)" };
            lines.push(format!("{}: {}{inactive}", link.kind.label(), link.name));
        }
        if let Some(role) = &t.responsible_role {
            lines.push(format!("Responsible: {role}"));
        }
        lines.push(format!("Active: {}", if t.is_active { "yes" } else { "no" }));
        lines.push(format!("Records: {}", self.record_count));
        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

#[derive(Debug, serde::Serialize)]
pub struct LibraryEntry {
    pub zone: String,
    pub category: String,
    pub name: String,
    pub frequency: Frequency,
    pub frequency_label: String,
}

impl From<&PredefinedTask> for LibraryEntry {
    fn from(entry: &PredefinedTask) -> Self {
        Self {
            zone: entry.zone.to_string(),
            category: entry.category.to_string(),
            name: entry.name.to_string(),
            frequency: entry.default_frequency,
            frequency_label: entry.default_frequency.label(),
        }
    }
}

#[derive(Debug, serde::Serialize)]
pub struct LibraryOutput {
    pub entries: Vec<LibraryEntry>,
}

impl CommandOutput for LibraryOutput {
    fn to_human(&self) -> String {
        if self.entries.is_empty() {
            return "No predefined tasks for this zone.".to_string();
        }
        TableFormatter::new().format_library(&self.entries)
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

/// Parse `--frequency` / `--every-days`. A day count alone means custom.
pub fn parse_frequency(frequency: Option<&str>, every_days: Option<u32>) -> Result<Option<Frequency>> {
    let name = match (frequency, every_days) {
        (None, None) => return Ok(None),
        (None, Some(_)) => "custom",
        (Some(name), _) => name,
    };
    Frequency::parse(name, every_days).map(Some).ok_or_else(|| {
        if name.trim().eq_ignore_ascii_case("custom") {
            anyhow!("A custom frequency needs --every-days")
        } else {
            anyhow!("Unknown frequency '{name}'. Use daily, weekly, monthly, after_use, after_service or custom")
        }
    })
}

fn optional_text(value: Option<String>) -> Option<Option<String>> {
    value.map(|v| {
        let v = v.trim().to_string();
        (!v.is_empty()).then_some(v)
    })
}

pub async fn execute(args: TaskArgs, ctx: &AppContext, json_mode: bool) -> Result<()> {
    let catalog = ctx.catalog();
    let references = ctx.reference_catalog();

    match args.command {
        TaskCommands::Add {
            name,
            frequency,
            every_days,
            action,
            zone,
            role,
            links,
        } => {
            let frequency = parse_frequency(Some(&frequency), every_days)?.unwrap_or(Frequency::Daily);
            let mut task = CleaningTask::new(name, frequency, action);
            task.responsible_role = optional_text(role).flatten();
            references.link_task(&mut task, links.into_request(zone)).await?;

            let task = catalog.create_task(task).await?;
            output(
                &ActionOutput::ok(format!("Task '{}' created ({})", task.name, short_id(&task.id))),
                json_mode,
            );
        }

        TaskCommands::List { all, zone, sub_zone } => {
            let tasks = match zone {
                Some(zone) => references.zone_tasks(&zone, sub_zone.as_deref(), !all).await?,
                None => catalog.list_tasks(!all, None).await?,
            };
            let sub_zones: HashMap<Uuid, String> = references
                .list_references(Some(ReferenceKind::SubZone), false)
                .await?
                .into_iter()
                .map(|s| (s.id, s.name))
                .collect();
            let out = TaskListOutput {
                total: tasks.len(),
                tasks: tasks
                    .iter()
                    .map(|t| TaskSummary::from(t).with_sub_zone(&sub_zones, t))
                    .collect(),
            };
            output(&out, json_mode);
        }

        TaskCommands::Show { id } => {
            let id = resolve_task_id(&ctx.pool, &id).await?;
            let task = catalog.get_task(id).await?;
            let links = references.links_of(&task).await?;
            let record_count = ctx.records.count_for_task(id).await?;
            let mut summary = TaskSummary::from(&task);
            summary.sub_zone = links
                .iter()
                .find(|l| l.kind == ReferenceKind::SubZone)
                .map(|l| l.name.clone());
            output(
                &TaskDetailOutput {
                    task: summary,
                    links: links.iter().map(TaskLink::from).collect(),
                    record_count,
                },
                json_mode,
            );
        }

        TaskCommands::Update {
            id,
            name,
            frequency,
            every_days,
            action,
            zone,
            role,
            links,
            activate,
        } => {
            let id = resolve_task_id(&ctx.pool, &id).await?;
            let mut patch = TaskPatch {
                name,
                frequency: parse_frequency(frequency.as_deref(), every_days)?,
                action_to_perform: action,
                responsible_role: optional_text(role),
                is_active: activate.then_some(true),
                ..TaskPatch::default()
            };
            let request = links.into_request(zone);
            if !request.is_empty() {
                let mut linked = catalog.get_task(id).await?;
                references.link_task(&mut linked, request).await?;
                patch.zone = Some(linked.zone);
                patch.references = Some(linked.references);
            }
            let task = catalog.update_task(id, patch).await?;
            output(&ActionOutput::ok(format!("Task '{}' updated", task.name)), json_mode);
        }

        TaskCommands::Deactivate { id } => {
            let id = resolve_task_id(&ctx.pool, &id).await?;
            let task = catalog.deactivate_task(id).await?;
            output(&ActionOutput::ok(format!("Task '{}' deactivated", task.name)), json_mode);
        }

        TaskCommands::Delete { id } => {
            let id = resolve_task_id(&ctx.pool, &id).await?;
            catalog.delete_task(id).await?;
            output(&ActionOutput::ok(format!("Task {} deleted", short_id(&id))), json_mode);
        }

        TaskCommands::Library { zone } => {
            let entries = catalog.library(zone.as_deref());
            let out = LibraryOutput {
                entries: entries.iter().map(LibraryEntry::from).collect(),
            };
            output(&out, json_mode);
        }
    }

    Ok(())
}
