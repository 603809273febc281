//! Table output formatting for CLI commands
//!
//! Renders tasks, references, records, audit events and the calendar grid using
//! comfy-table. Colors are dropped when `NO_COLOR` is set or the terminal is
//! dumb.

use comfy_table::{presets, Attribute, Cell, Color, ContentArrangement, Table};
use std::env;

use super::commands::calendar::{CalendarDayOutput, CalendarOutput};
use super::commands::record::{EventSummary, RecordSummary};
use super::commands::reference::ReferenceSummary;
use super::commands::task::{LibraryEntry, TaskSummary};
use super::output::truncate;

const WEEKDAY_HEADERS: [&str; 7] = ["Dim", "Lun", "Mar", "Mer", "Jeu", "Ven", "Sam"];

/// Table formatter for CLI output
pub struct TableFormatter {
    use_colors: bool,
    max_width: Option<u16>,
}

impl TableFormatter {
    pub fn new() -> Self {
        Self {
            use_colors: supports_color(),
            max_width: None,
        }
    }

    pub fn with_config(use_colors: bool, max_width: Option<u16>) -> Self {
        Self { use_colors, max_width }
    }

    pub fn format_tasks(&self, tasks: &[TaskSummary]) -> String {
        let mut table = self.create_base_table();
        table.set_header(header(&["ID", "Name", "Zone", "Frequency", "Role", "Active"]));

        for task in tasks {
            let active = if task.is_active {
                self.colored("yes", Color::Green)
            } else {
                self.colored("no", Color::DarkGrey)
            };
            table.add_row(vec![
                Cell::new(&task.short_id),
                Cell::new(truncate(&task.name, 45)),
                Cell::new(task.location().unwrap_or_else(|| "-".to_string())),
                Cell::new(&task.frequency_label),
                Cell::new(task.responsible_role.as_deref().unwrap_or("-")),
                active,
            ]);
        }

        table.to_string()
    }

    pub fn format_references(&self, references: &[ReferenceSummary]) -> String {
        let mut table = self.create_base_table();
        table.set_header(header(&["ID", "Kind", "Name", "Zone", "Details", "Active"]));

        for reference in references {
            let active = if reference.is_active {
                self.colored("yes", Color::Green)
            } else {
                self.colored("no", Color::DarkGrey)
            };
            let details = reference.details();
            table.add_row(vec![
                Cell::new(&reference.short_id),
                Cell::new(&reference.kind_label),
                Cell::new(truncate(&reference.name, 40)),
                Cell::new(reference.zone.as_deref().unwrap_or("-")),
                Cell::new(if details.is_empty() { "-".to_string() } else { truncate(&details, 40) }),
                active,
            ]);
        }

        table.to_string()
    }

    pub fn format_library(&self, entries: &[LibraryEntry]) -> String {
        let mut table = self.create_base_table();
        table.set_header(header(&["Zone", "Category", "Task", "Default frequency"]));
        for entry in entries {
            table.add_row(vec![
                Cell::new(&entry.zone),
                Cell::new(&entry.category),
                Cell::new(&entry.name),
                Cell::new(&entry.frequency_label),
            ]);
        }
        table.to_string()
    }

    pub fn format_records(&self, records: &[RecordSummary]) -> String {
        let mut table = self.create_base_table();
        table.set_header(header(&["ID", "Task", "Scheduled", "Status", "Completed", "Comments"]));

        for record in records {
            let status = if self.use_colors {
                Cell::new(&record.label).fg(status_color(&record.status))
            } else {
                Cell::new(format!("{} {}", status_icon(&record.status), record.label))
            };
            table.add_row(vec![
                Cell::new(&record.short_id),
                Cell::new(truncate(&record.task_name, 35)),
                Cell::new(&record.scheduled_local),
                status,
                Cell::new(record.completed_local.as_deref().unwrap_or("-")),
                Cell::new(record.comments.as_deref().map_or_else(|| "-".to_string(), |c| truncate(c, 30))),
            ]);
        }

        table.to_string()
    }

    pub fn format_events(&self, events: &[EventSummary]) -> String {
        let mut table = self.create_base_table();
        table.set_header(header(&["When", "From", "To"]));
        for event in events {
            table.add_row(vec![
                Cell::new(&event.occurred_local),
                Cell::new(&event.from_state),
                Cell::new(&event.to_state).fg(status_color(&event.to_state)),
            ]);
        }
        table.to_string()
    }

    /// Seven-column grid, Sunday first. Each day shows `completed/total`.
    pub fn format_calendar_grid(&self, calendar: &CalendarOutput) -> String {
        let mut table = self.create_base_table();
        table.set_header(header(&WEEKDAY_HEADERS));

        for week in calendar.cells.chunks(7) {
            let row: Vec<Cell> = week
                .iter()
                .map(|cell| match cell {
                    Some(day) => self.day_cell(day),
                    None => Cell::new(""),
                })
                .collect();
            table.add_row(row);
        }

        table.to_string()
    }

    fn day_cell(&self, day: &CalendarDayOutput) -> Cell {
        let mut text = day.date.format("%d").to_string();
        if day.stats.total > 0 {
            text.push_str(&format!("\n{}/{}", day.stats.completed, day.stats.total));
            if day.stats.overdue > 0 {
                text.push_str(&format!(" !{}", day.stats.overdue));
            }
        }

        let mut cell = Cell::new(text);
        if day.is_today {
            cell = cell.add_attribute(Attribute::Bold);
        }
        if !self.use_colors {
            return cell;
        }
        if day.stats.overdue > 0 {
            cell.fg(Color::Red)
        } else if day.stats.all_completed() {
            cell.fg(Color::Green)
        } else if day.stats.total > 0 {
            cell.fg(Color::Yellow)
        } else if day.is_weekend {
            cell.fg(Color::DarkGrey)
        } else {
            cell
        }
    }

    fn colored(&self, text: &str, color: Color) -> Cell {
        if self.use_colors {
            Cell::new(text).fg(color)
        } else {
            Cell::new(text)
        }
    }

    fn create_base_table(&self) -> Table {
        let mut table = Table::new();
        table
            .load_preset(presets::UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic);
        if let Some(width) = self.max_width {
            table.set_width(width);
        }
        table
    }
}

impl Default for TableFormatter {
    fn default() -> Self {
        Self::new()
    }
}

fn header(names: &[&str]) -> Vec<Cell> {
    names
        .iter()
        .map(|name| Cell::new(name).add_attribute(Attribute::Bold))
        .collect()
}

/// Check if color output is supported
pub fn supports_color() -> bool {
    if env::var("NO_COLOR").is_ok() {
        return false;
    }
    !matches!(env::var("TERM").as_deref(), Ok("dumb"))
}

fn status_color(status: &str) -> Color {
    match status {
        "compliant" => Color::Green,
        "non_compliant" | "overdue" => Color::Red,
        "pending" => Color::Yellow,
        _ => Color::White,
    }
}

fn status_icon(status: &str) -> &'static str {
    match status {
        "compliant" => "✓",
        "non_compliant" => "✗",
        "overdue" => "!",
        _ => "●",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::calendar::BucketStats;
    use chrono::NaiveDate;

    fn record(status: &str, label: &str) -> RecordSummary {
        RecordSummary {
            id: uuid::Uuid::nil(),
            short_id: "00000000".into(),
            task_id: uuid::Uuid::nil(),
            task_name: "Nettoyage des sols".into(),
            scheduled_date: chrono::Utc::now(),
            scheduled_local: "2024-03-15 00:00".into(),
            status: status.into(),
            label: label.into(),
            is_completed: status != "pending" && status != "overdue",
            is_compliant: None,
            completed_local: None,
            comments: None,
            photo_url: None,
            version: 1,
        }
    }

    #[test]
    fn test_plain_records_table_has_icons() {
        let formatter = TableFormatter::with_config(false, Some(120));
        let out = formatter.format_records(&[record("overdue", "En retard"), record("compliant", "Complété (Conforme)")]);
        assert!(out.contains("! En retard"));
        assert!(out.contains("✓ Complété (Conforme)"));
        assert!(out.contains("Nettoyage des sols"));
    }

    #[test]
    fn test_calendar_grid_rows() {
        let day = |d: u32, total: usize, completed: usize| {
            Some(CalendarDayOutput {
                date: NaiveDate::from_ymd_opt(2024, 3, d).unwrap(),
                is_today: false,
                is_weekend: false,
                stats: BucketStats {
                    total,
                    completed,
                    compliant: completed,
                    overdue: 0,
                },
                records: Vec::new(),
            })
        };
        let mut cells = vec![None; 5];
        cells.push(day(1, 1, 1));
        cells.push(day(2, 0, 0));
        let calendar = CalendarOutput {
            granularity: "month".into(),
            title: "mars 2024".into(),
            range_start: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            range_end: NaiveDate::from_ymd_opt(2024, 3, 31).unwrap(),
            totals: BucketStats::default(),
            cells,
        };
        let out = TableFormatter::with_config(false, Some(120)).format_calendar_grid(&calendar);
        assert!(out.contains("Dim"));
        assert!(out.contains("1/1"));
    }
}
