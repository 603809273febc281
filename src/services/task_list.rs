//! Status tabs over a record snapshot.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::domain::models::calendar::OrgTimezone;
use crate::domain::models::cleaning_record::CleaningRecord;

/// Task list tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordTab {
    All,
    Todo,
    Completed,
    Overdue,
    Today,
}

impl RecordTab {
    pub const ALL_TABS: [Self; 5] = [Self::All, Self::Todo, Self::Completed, Self::Overdue, Self::Today];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Todo => "todo",
            Self::Completed => "completed",
            Self::Overdue => "overdue",
            Self::Today => "today",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "all" | "toutes" => Some(Self::All),
            "todo" | "pending" | "a_faire" => Some(Self::Todo),
            "completed" | "done" | "terminees" => Some(Self::Completed),
            "overdue" | "late" | "en_retard" => Some(Self::Overdue),
            "today" | "aujourdhui" => Some(Self::Today),
            _ => None,
        }
    }

    /// Membership predicate shared by the filter and the counts.
    pub fn matches(&self, record: &CleaningRecord, now: DateTime<Utc>, tz: OrgTimezone) -> bool {
        match self {
            Self::All => true,
            Self::Todo => !record.is_completed(),
            Self::Completed => record.is_completed(),
            Self::Overdue => record.is_overdue(now),
            Self::Today => tz.local_date(record.scheduled_date) == tz.local_date(now),
        }
    }
}

/// Per-tab record counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TabCounts {
    pub all: usize,
    pub todo: usize,
    pub completed: usize,
    pub overdue: usize,
    pub today: usize,
}

impl TabCounts {
    pub fn get(&self, tab: RecordTab) -> usize {
        match tab {
            RecordTab::All => self.all,
            RecordTab::Todo => self.todo,
            RecordTab::Completed => self.completed,
            RecordTab::Overdue => self.overdue,
            RecordTab::Today => self.today,
        }
    }

    fn bump(&mut self, tab: RecordTab) {
        match tab {
            RecordTab::All => self.all += 1,
            RecordTab::Todo => self.todo += 1,
            RecordTab::Completed => self.completed += 1,
            RecordTab::Overdue => self.overdue += 1,
            RecordTab::Today => self.today += 1,
        }
    }
}

/// Filter input for [`filter_records`].
#[derive(Debug, Clone, Copy)]
pub struct TaskListQuery {
    pub tab: RecordTab,
    pub task_id: Option<Uuid>,
    pub limit: Option<usize>,
}

impl TaskListQuery {
    pub fn tab(tab: RecordTab) -> Self {
        Self {
            tab,
            task_id: None,
            limit: None,
        }
    }

    pub fn with_task(mut self, task_id: Uuid) -> Self {
        self.task_id = Some(task_id);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Filtered records plus the counts of every tab.
#[derive(Debug, Clone, Serialize)]
pub struct TaskListView<'a> {
    pub tab: RecordTab,
    pub records: Vec<&'a CleaningRecord>,
    pub counts: TabCounts,
    /// Records matching the tab before the limit was applied.
    pub matching: usize,
}

impl TaskListView<'_> {
    pub fn has_more(&self) -> bool {
        self.matching > self.records.len()
    }
}

/// Count records per tab. The task filter applies, the limit does not.
pub fn tab_counts(
    records: &[CleaningRecord],
    task_id: Option<Uuid>,
    now: DateTime<Utc>,
    tz: OrgTimezone,
) -> TabCounts {
    let mut counts = TabCounts::default();
    for record in records.iter().filter(|r| task_id.map_or(true, |id| r.cleaning_task_id == id)) {
        for tab in RecordTab::ALL_TABS {
            if tab.matches(record, now, tz) {
                counts.bump(tab);
            }
        }
    }
    counts
}

/// Records of one tab, most recently scheduled first, with all tab counts.
pub fn filter_records<'a>(
    records: &'a [CleaningRecord],
    query: TaskListQuery,
    now: DateTime<Utc>,
    tz: OrgTimezone,
) -> TaskListView<'a> {
    let mut selected: Vec<&CleaningRecord> = records
        .iter()
        .filter(|r| query.task_id.map_or(true, |id| r.cleaning_task_id == id))
        .filter(|r| query.tab.matches(r, now, tz))
        .collect();
    selected.sort_by(|a, b| {
        b.scheduled_date
            .cmp(&a.scheduled_date)
            .then_with(|| a.id.cmp(&b.id))
    });

    let matching = selected.len();
    if let Some(limit) = query.limit {
        selected.truncate(limit);
    }

    TaskListView {
        tab: query.tab,
        records: selected,
        counts: tab_counts(records, query.task_id, now, tz),
        matching,
    }
}
