//! `haccp-plan calendar`: day, week or month view of the records.

use anyhow::{anyhow, Result};
use chrono::{Datelike, NaiveDate};
use clap::Args;

use crate::cli::context::AppContext;
use crate::cli::output::{output, CommandOutput};
use crate::cli::parse_date;
use crate::cli::table::TableFormatter;
use crate::domain::models::calendar::{BucketStats, CalendarCell, CalendarCursor, CalendarView, Granularity};
use crate::domain::ports::RecordQuery;
use crate::services::calendar_aggregator::utc_bounds;
use crate::services::BoardSnapshot;

use super::record::RecordSummary;

const MONTHS_FR: [&str; 12] = [
    "janvier", "février", "mars", "avril", "mai", "juin", "juillet", "août", "septembre", "octobre", "novembre",
    "décembre",
];

#[derive(Args, Debug)]
pub struct CalendarArgs {
    /// day, week or month
    #[arg(long, short, default_value = "month")]
    pub view: String,
    /// Reference date (YYYY-MM-DD, defaults to today)
    #[arg(long, short)]
    pub date: Option<String>,
    /// Jump to this month (1-12) of the reference year
    #[arg(long)]
    pub month: Option<u32>,
    /// Jump to this year
    #[arg(long)]
    pub year: Option<i32>,
    /// Move this many periods forward (negative: backward)
    #[arg(long, allow_hyphen_values = true, default_value_t = 0)]
    pub shift: i32,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct CalendarDayOutput {
    pub date: NaiveDate,
    pub is_today: bool,
    pub is_weekend: bool,
    pub stats: BucketStats,
    pub records: Vec<RecordSummary>,
}

#[derive(Debug, serde::Serialize)]
pub struct CalendarOutput {
    pub granularity: String,
    pub title: String,
    pub range_start: NaiveDate,
    pub range_end: NaiveDate,
    pub totals: BucketStats,
    /// Grid cells; `None` is padding outside the month.
    pub cells: Vec<Option<CalendarDayOutput>>,
}

impl CalendarOutput {
    fn build(view: &CalendarView<'_>, snapshot: &BoardSnapshot, ctx: &AppContext) -> Self {
        let now = ctx.now();
        let cells = view
            .cells
            .iter()
            .map(|cell| match cell {
                CalendarCell::Padding => None,
                CalendarCell::Day(bucket) => Some(CalendarDayOutput {
                    date: bucket.date,
                    is_today: bucket.is_today,
                    is_weekend: bucket.is_weekend,
                    stats: bucket.stats,
                    records: bucket
                        .records
                        .iter()
                        .map(|r| RecordSummary::build(r, snapshot.task_name(r.cleaning_task_id), now, ctx.tz))
                        .collect(),
                }),
            })
            .collect();

        Self {
            granularity: view.cursor.granularity.as_str().to_string(),
            title: title(&view.cursor, view.range_start, view.range_end),
            range_start: view.range_start,
            range_end: view.range_end,
            totals: view.totals,
            cells,
        }
    }

    fn days(&self) -> impl Iterator<Item = &CalendarDayOutput> {
        self.cells.iter().flatten()
    }
}

impl CommandOutput for CalendarOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![self.title.clone()];

        if self.granularity == Granularity::Month.as_str() {
            lines.push(TableFormatter::new().format_calendar_grid(self));
        } else {
            for day in self.days() {
                let marker = if day.is_today { " (aujourd'hui)" } else { "" };
                lines.push(format!("{}{marker}", day.date.format("%d/%m/%Y")));
                if day.records.is_empty() {
                    lines.push("  -".to_string());
                }
                for record in &day.records {
                    lines.push(format!(
                        "  {} {} [{}]",
                        &record.scheduled_local[11..],
                        record.task_name,
                        record.label
                    ));
                }
            }
        }

        let t = &self.totals;
        lines.push(format!(
            "{} record(s): {} completed, {} compliant, {} overdue",
            t.total, t.completed, t.compliant, t.overdue
        ));
        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

fn title(cursor: &CalendarCursor, start: NaiveDate, end: NaiveDate) -> String {
    match cursor.granularity {
        Granularity::Day => start.format("%d/%m/%Y").to_string(),
        Granularity::Week => format!("Semaine du {} au {}", start.format("%d/%m"), end.format("%d/%m/%Y")),
        Granularity::Month => {
            let month = MONTHS_FR[cursor.reference.month0() as usize];
            format!("{month} {}", cursor.reference.year())
        }
    }
}

/// Resolve the cursor from the navigation flags, applied in the order
/// year, month, shift.
pub fn resolve_cursor(args: &CalendarArgs, today: NaiveDate) -> Result<CalendarCursor> {
    let granularity = Granularity::from_str(&args.view)
        .ok_or_else(|| anyhow!("Unknown view '{}'. Use day, week or month", args.view))?;
    let reference = args.date.as_deref().map(parse_date).transpose()?.unwrap_or(today);

    let mut cursor = CalendarCursor::new(reference, granularity);
    if let Some(year) = args.year {
        cursor = cursor.go_to_year(year)?;
    }
    if let Some(month) = args.month {
        cursor = cursor.go_to_month(month)?;
    }
    Ok(cursor.shift(args.shift)?)
}

pub async fn execute(args: CalendarArgs, ctx: &AppContext, json_mode: bool) -> Result<()> {
    let now = ctx.now();
    let cursor = resolve_cursor(&args, ctx.tz.local_date(now))?;

    let (from, to) = utc_bounds(&cursor, ctx.tz);
    let (_, snapshot) = ctx.load_board(RecordQuery::between(from, to)).await?;
    let view = snapshot.calendar(cursor, now, ctx.tz);

    output(&CalendarOutput::build(&view, &snapshot, ctx), json_mode);
    Ok(())
}
