//! Cleaning record commands: task list tabs, completion and editing.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::{Args, Subcommand};
use uuid::Uuid;

use crate::cli::context::AppContext;
use crate::cli::id_resolver::{resolve_record_id, resolve_task_id};
use crate::cli::output::{output, short_id, CommandOutput};
use crate::cli::parse_timestamp;
use crate::cli::table::TableFormatter;
use crate::domain::errors::DomainError;
use crate::domain::models::calendar::OrgTimezone;
use crate::domain::models::cleaning_record::{CleaningRecord, RecordEvent};
use crate::domain::ports::{CleaningRecordRepository, CleaningTaskRepository, RecordQuery};
use crate::services::{
    BoardSnapshot, CleaningStats, PhotoUpload, RecordTab, SubmitOutcome, TabCounts, TaskListQuery,
};

const LOCAL_FORMAT: &str = "%Y-%m-%d %H:%M";

#[derive(Args, Debug)]
pub struct RecordArgs {
    #[command(subcommand)]
    pub command: RecordCommands,
}

#[derive(Subcommand, Debug)]
pub enum RecordCommands {
    /// List records of one tab: all, todo, completed, overdue, today
    List {
        #[arg(long, short, default_value = "all")]
        tab: String,
        /// Only records of this task (ID or prefix)
        #[arg(long)]
        task: Option<String>,
        /// Show at most this many records
        #[arg(long, short)]
        limit: Option<usize>,
    },
    /// Show one record
    Show {
        /// Record ID (full UUID or prefix)
        id: String,
    },
    /// Mark a record completed
    Complete {
        /// Record ID (full UUID or prefix)
        id: String,
        /// Judge the cleaning non-compliant
        #[arg(long)]
        non_compliant: bool,
        /// Completion time (defaults to now)
        #[arg(long)]
        at: Option<String>,
        #[arg(long)]
        comments: Option<String>,
        /// Photo evidence to attach
        #[arg(long)]
        photo: Option<PathBuf>,
    },
    /// Put a completed record back to pending
    Reopen {
        /// Record ID (full UUID or prefix)
        id: String,
    },
    /// Edit completion, comments and photo of a record
    Edit {
        /// Record ID (full UUID or prefix)
        id: String,
        /// Set completion: true or false
        #[arg(long)]
        completed: Option<bool>,
        #[arg(long, conflicts_with = "non_compliant")]
        compliant: bool,
        #[arg(long)]
        non_compliant: bool,
        /// Completion time
        #[arg(long)]
        at: Option<String>,
        /// New comments; empty string clears them
        #[arg(long)]
        comments: Option<String>,
        /// Replace the photo with this file
        #[arg(long, conflicts_with = "remove_photo")]
        photo: Option<PathBuf>,
        /// Delete the current photo
        #[arg(long)]
        remove_photo: bool,
    },
    /// Show the completion audit trail of a record
    History {
        /// Record ID (full UUID or prefix)
        id: String,
    },
    /// Dashboard figures over all records
    Stats,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct RecordSummary {
    pub id: Uuid,
    pub short_id: String,
    pub task_id: Uuid,
    pub task_name: String,
    pub scheduled_date: DateTime<Utc>,
    pub scheduled_local: String,
    /// pending, overdue, compliant or non_compliant
    pub status: String,
    pub label: String,
    pub is_completed: bool,
    pub is_compliant: Option<bool>,
    pub completed_local: Option<String>,
    pub comments: Option<String>,
    pub photo_url: Option<String>,
    pub version: u64,
}

impl RecordSummary {
    pub fn build(record: &CleaningRecord, task_name: &str, now: DateTime<Utc>, tz: OrgTimezone) -> Self {
        let (status, label) = if record.is_overdue(now) {
            ("overdue", "En retard")
        } else {
            (record.state.as_str(), record.state.label())
        };
        let local = |ts: DateTime<Utc>| ts.with_timezone(&tz.tz()).format(LOCAL_FORMAT).to_string();
        Self {
            id: record.id,
            short_id: short_id(&record.id),
            task_id: record.cleaning_task_id,
            task_name: task_name.to_string(),
            scheduled_date: record.scheduled_date,
            scheduled_local: local(record.scheduled_date),
            status: status.to_string(),
            label: label.to_string(),
            is_completed: record.is_completed(),
            is_compliant: record.is_compliant(),
            completed_local: record.completion_date().map(local),
            comments: record.comments.clone(),
            photo_url: record.photo_url.clone(),
            version: record.version,
        }
    }
}

#[derive(Debug, serde::Serialize)]
pub struct RecordListOutput {
    pub tab: RecordTab,
    pub counts: TabCounts,
    pub matching: usize,
    pub has_more: bool,
    pub records: Vec<RecordSummary>,
}

impl CommandOutput for RecordListOutput {
    fn to_human(&self) -> String {
        let tabs: Vec<String> = RecordTab::ALL_TABS
            .iter()
            .map(|tab| {
                let text = format!("{} ({})", tab.as_str(), self.counts.get(*tab));
                if *tab == self.tab {
                    format!("[{text}]")
                } else {
                    text
                }
            })
            .collect();
        let mut lines = vec![tabs.join("  ")];
        if self.records.is_empty() {
            lines.push("No records in this tab.".to_string());
        } else {
            lines.push(TableFormatter::new().format_records(&self.records));
        }
        if self.has_more {
            lines.push(format!(
                "Showing {} of {} record(s); raise --limit to see more",
                self.records.len(),
                self.matching
            ));
        }
        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

#[derive(Debug, serde::Serialize)]
pub struct RecordDetailOutput {
    #[serde(flatten)]
    pub record: RecordSummary,
    /// Counts of the record's task after the change, when one was made
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_counts: Option<TabCounts>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub changed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo_error: Option<String>,
}

impl RecordDetailOutput {
    fn plain(record: RecordSummary) -> Self {
        Self {
            record,
            task_counts: None,
            changed: None,
            photo_error: None,
        }
    }
}

impl CommandOutput for RecordDetailOutput {
    fn to_human(&self) -> String {
        let r = &self.record;
        let mut lines = Vec::new();
        match self.changed {
            Some(true) => lines.push(crate::cli::output::action_success("Record saved")),
            Some(false) => lines.push("No changes to save".to_string()),
            None => {}
        }
        lines.push(format!("Record: {}", r.id));
        lines.push(format!("Task: {}", r.task_name));
        lines.push(format!("Scheduled: {}", r.scheduled_local));
        lines.push(format!("Status: {}", r.label));
        if let Some(done) = &r.completed_local {
            lines.push(format!("Completed: {done}"));
        }
        if let Some(comments) = &r.comments {
            lines.push(format!("Comments: {comments}"));
        }
        if let Some(photo) = &r.photo_url {
            lines.push(format!("Photo: {photo}"));
        }
        if let Some(err) = &self.photo_error {
            lines.push(crate::cli::output::action_failure(&format!("Photo not saved: {err}")));
        }
        if let Some(counts) = &self.task_counts {
            lines.push(format!(
                "Task records: {} total, {} to do, {} overdue",
                counts.all, counts.todo, counts.overdue
            ));
        }
        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

#[derive(Debug, serde::Serialize)]
pub struct EventSummary {
    pub from_state: String,
    pub to_state: String,
    pub occurred_at: DateTime<Utc>,
    pub occurred_local: String,
}

impl EventSummary {
    fn build(event: &RecordEvent, tz: OrgTimezone) -> Self {
        Self {
            from_state: event.from_state.clone(),
            to_state: event.to_state.clone(),
            occurred_at: event.occurred_at,
            occurred_local: event.occurred_at.with_timezone(&tz.tz()).format(LOCAL_FORMAT).to_string(),
        }
    }
}

#[derive(Debug, serde::Serialize)]
pub struct HistoryOutput {
    pub record_id: Uuid,
    pub events: Vec<EventSummary>,
}

impl CommandOutput for HistoryOutput {
    fn to_human(&self) -> String {
        if self.events.is_empty() {
            return format!("No state changes recorded for {}", short_id(&self.record_id));
        }
        TableFormatter::new().format_events(&self.events)
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

#[derive(Debug, serde::Serialize)]
pub struct StatsOutput {
    #[serde(flatten)]
    pub stats: CleaningStats,
}

impl CommandOutput for StatsOutput {
    fn to_human(&self) -> String {
        let s = &self.stats;
        [
            format!("Total records:     {}", s.total),
            format!("Completed today:   {}", s.completed_today),
            format!("Compliance rate:   {}%", s.compliance_rate),
            format!("Pending:           {}", s.pending),
        ]
        .join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

async fn read_photo(path: &Path) -> Result<PhotoUpload> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read photo {}", path.display()))?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .ok_or_else(|| anyhow!("Photo path has no file name: {}", path.display()))?;
    Ok(PhotoUpload { file_name, bytes })
}

async fn fetch_record(ctx: &AppContext, id: Uuid) -> Result<CleaningRecord> {
    ctx.records
        .get(id)
        .await?
        .ok_or_else(|| DomainError::RecordNotFound(id).into())
}

async fn task_name(ctx: &AppContext, task_id: Uuid) -> Result<String> {
    Ok(ctx
        .tasks
        .get(task_id)
        .await?
        .map_or_else(|| "(tâche supprimée)".to_string(), |t| t.name))
}

fn edited_output(
    outcome: SubmitOutcome,
    snapshot: &BoardSnapshot,
    ctx: &AppContext,
) -> RecordDetailOutput {
    let now = ctx.now();
    let record = &outcome.record;
    let counts = snapshot
        .task_list(TaskListQuery::tab(RecordTab::All).with_task(record.cleaning_task_id), now, ctx.tz)
        .counts;
    RecordDetailOutput {
        record: RecordSummary::build(record, snapshot.task_name(record.cleaning_task_id), now, ctx.tz),
        task_counts: Some(counts),
        changed: Some(outcome.changed),
        photo_error: outcome.photo_error,
    }
}

/// Reject `record edit` flag combinations that would be dropped or would
/// complete a record without a compliance judgment.
fn check_edit_flags(was_completed: bool, completed: Option<bool>, judged: bool, has_at: bool) -> Result<()> {
    let completes = completed.unwrap_or(was_completed);
    if !completes && (judged || has_at) {
        bail!("A compliance judgment or --at needs a completed record; add --completed true");
    }
    if completed == Some(true) && !was_completed && !judged {
        bail!("Completing a record needs --compliant or --non-compliant");
    }
    Ok(())
}

pub async fn execute(args: RecordArgs, ctx: &AppContext, json_mode: bool) -> Result<()> {
    match args.command {
        RecordCommands::List { tab, task, limit } => {
            let tab = RecordTab::from_str(&tab)
                .ok_or_else(|| anyhow!("Unknown tab '{tab}'. Use all, todo, completed, overdue or today"))?;
            let mut query = TaskListQuery::tab(tab);
            let mut record_query = RecordQuery::default();
            if let Some(task) = task {
                let task_id = resolve_task_id(&ctx.pool, &task).await?;
                query = query.with_task(task_id);
                record_query = RecordQuery::for_task(task_id);
            }
            if let Some(limit) = limit {
                query = query.with_limit(limit);
            }

            let (_, snapshot) = ctx.load_board(record_query).await?;
            let now = ctx.now();
            let view = snapshot.task_list(query, now, ctx.tz);
            let out = RecordListOutput {
                tab: view.tab,
                counts: view.counts,
                matching: view.matching,
                has_more: view.has_more(),
                records: view
                    .records
                    .iter()
                    .map(|r| RecordSummary::build(r, snapshot.task_name(r.cleaning_task_id), now, ctx.tz))
                    .collect(),
            };
            output(&out, json_mode);
        }

        RecordCommands::Show { id } => {
            let id = resolve_record_id(&ctx.pool, &id).await?;
            let record = fetch_record(ctx, id).await?;
            let name = task_name(ctx, record.cleaning_task_id).await?;
            output(
                &RecordDetailOutput::plain(RecordSummary::build(&record, &name, ctx.now(), ctx.tz)),
                json_mode,
            );
        }

        RecordCommands::Complete {
            id,
            non_compliant,
            at,
            comments,
            photo,
        } => {
            let id = resolve_record_id(&ctx.pool, &id).await?;
            let at = at.as_deref().map(|s| parse_timestamp(s, ctx.tz)).transpose()?;

            if comments.is_none() && photo.is_none() {
                let outcome = ctx.evaluator().complete(id, !non_compliant, at).await?;
                let name = task_name(ctx, outcome.record.cleaning_task_id).await?;
                let mut out =
                    RecordDetailOutput::plain(RecordSummary::build(&outcome.record, &name, ctx.now(), ctx.tz));
                out.changed = Some(outcome.changed);
                output(&out, json_mode);
                return Ok(());
            }

            let upload = match photo {
                Some(path) => Some(read_photo(&path).await?),
                None => None,
            };
            let record = fetch_record(ctx, id).await?;
            let (board, _) = ctx.load_board(RecordQuery::for_task(record.cleaning_task_id)).await?;
            let editor = ctx.editor(board.clone());

            let mut session = editor.open(id).await?;
            if at.is_some() {
                session.draft.completion_date = at;
            }
            session.draft.set_completed(true, ctx.now());
            session.draft.is_compliant = Some(!non_compliant);
            if comments.is_some() {
                session.draft.comments = comments;
            }
            let outcome = editor.submit(&mut session, upload).await?;
            let snapshot = board.snapshot().await;
            output(&edited_output(outcome, &snapshot, ctx), json_mode);
        }

        RecordCommands::Reopen { id } => {
            let id = resolve_record_id(&ctx.pool, &id).await?;
            let outcome = ctx.evaluator().reopen(id).await?;
            let name = task_name(ctx, outcome.record.cleaning_task_id).await?;
            let mut out = RecordDetailOutput::plain(RecordSummary::build(&outcome.record, &name, ctx.now(), ctx.tz));
            out.changed = Some(outcome.changed);
            output(&out, json_mode);
        }

        RecordCommands::Edit {
            id,
            completed,
            compliant,
            non_compliant,
            at,
            comments,
            photo,
            remove_photo,
        } => {
            let id = resolve_record_id(&ctx.pool, &id).await?;
            let at = at.as_deref().map(|s| parse_timestamp(s, ctx.tz)).transpose()?;
            let record = fetch_record(ctx, id).await?;
            check_edit_flags(record.is_completed(), completed, compliant || non_compliant, at.is_some())?;
            let upload = match photo {
                Some(path) => Some(read_photo(&path).await?),
                None => None,
            };

            let (board, _) = ctx.load_board(RecordQuery::for_task(record.cleaning_task_id)).await?;
            let editor = ctx.editor(board.clone());
            let mut session = editor.open(id).await?;

            let mut photo_error = None;
            if remove_photo {
                photo_error = editor.remove_photo(&mut session).await?.photo_error;
            }

            if let Some(at) = at {
                session.draft.completion_date = Some(at);
            }
            if let Some(completed) = completed {
                session.draft.set_completed(completed, ctx.now());
            }
            if compliant || non_compliant {
                session.draft.is_compliant = Some(compliant);
            }
            if let Some(comments) = comments {
                let comments = comments.trim().to_string();
                session.draft.comments = (!comments.is_empty()).then_some(comments);
            }

            let mut outcome = editor.submit(&mut session, upload).await?;
            if outcome.photo_error.is_none() {
                outcome.photo_error = photo_error;
            }
            let snapshot = board.snapshot().await;
            output(&edited_output(outcome, &snapshot, ctx), json_mode);
        }

        RecordCommands::History { id } => {
            let id = resolve_record_id(&ctx.pool, &id).await?;
            let events = ctx.evaluator().history(id).await?;
            output(
                &HistoryOutput {
                    record_id: id,
                    events: events.iter().map(|e| EventSummary::build(e, ctx.tz)).collect(),
                },
                json_mode,
            );
        }

        RecordCommands::Stats => {
            let (_, snapshot) = ctx.load_board(RecordQuery::default()).await?;
            output(
                &StatsOutput {
                    stats: snapshot.stats(ctx.now(), ctx.tz),
                },
                json_mode,
            );
        }
    }

    Ok(())
}
