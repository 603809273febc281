//! Creation of dated records from catalog tasks.
//!
//! Frequency never produces records by itself; occurrences exist only when
//! someone asks for a single slot, a plan over a horizon, or a repeat series.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Datelike, Days, Months, NaiveDate, NaiveTime, Utc};
use serde::Serialize;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::calendar::OrgTimezone;
use crate::domain::models::cleaning_record::CleaningRecord;
use crate::domain::models::cleaning_task::{CleaningTask, Frequency};
use crate::domain::ports::{CleaningRecordRepository, CleaningTaskRepository, RecordQuery};

/// Step between repeated occurrences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RepeatInterval {
    Daily,
    Weekly,
    Monthly,
}

impl RepeatInterval {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "daily" | "quotidien" | "quotidienne" => Some(Self::Daily),
            "weekly" | "hebdomadaire" => Some(Self::Weekly),
            "monthly" | "mensuel" | "mensuelle" => Some(Self::Monthly),
            _ => None,
        }
    }
}

/// Outcome of a batch creation.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationReport {
    pub task_id: Uuid,
    /// Slots computed for the request.
    pub requested: usize,
    /// Slots skipped because the task already had a record there.
    pub skipped: usize,
    /// Records actually written.
    pub created: Vec<CleaningRecord>,
}

/// Local dates of a plan from `start` through `start + days` inclusive.
///
/// Weekly plans keep the weekday of `start`, monthly plans keep its day of
/// month and skip months that do not have it.
pub fn plan_dates(frequency: &Frequency, start: NaiveDate, days: u32) -> Vec<NaiveDate> {
    let Some(end) = start.checked_add_days(Days::new(u64::from(days))) else {
        return Vec::new();
    };
    let every_day = start.iter_days().take_while(move |d| *d <= end);

    match frequency {
        Frequency::Daily => every_day.collect(),
        Frequency::Weekly => every_day.step_by(7).collect(),
        Frequency::Monthly => every_day.filter(|d| d.day() == start.day()).collect(),
        Frequency::Custom { every_days } => every_day.step_by((*every_days).max(1) as usize).collect(),
        Frequency::AfterUse | Frequency::AfterService => Vec::new(),
    }
}

/// `count` local timestamps starting at `start`. Monthly steps clamp to the
/// last day of shorter months and always count from `start`, so the 31st
/// stays the 31st whenever the month has one.
pub fn repeat_dates(start: NaiveDate, interval: RepeatInterval, count: u32) -> Vec<NaiveDate> {
    (0..count)
        .map_while(|i| match interval {
            RepeatInterval::Daily => start.checked_add_days(Days::new(u64::from(i))),
            RepeatInterval::Weekly => start.checked_add_days(Days::new(u64::from(i) * 7)),
            RepeatInterval::Monthly => start.checked_add_months(Months::new(i)),
        })
        .collect()
}

pub struct OccurrenceGenerator<T: CleaningTaskRepository, R: CleaningRecordRepository> {
    tasks: Arc<T>,
    records: Arc<R>,
    tz: OrgTimezone,
    time_of_day: NaiveTime,
}

impl<T: CleaningTaskRepository, R: CleaningRecordRepository> OccurrenceGenerator<T, R> {
    pub fn new(tasks: Arc<T>, records: Arc<R>, tz: OrgTimezone) -> Self {
        Self {
            tasks,
            records,
            tz,
            time_of_day: NaiveTime::MIN,
        }
    }

    /// Local wall-clock time given to plan occurrences.
    pub fn with_time_of_day(mut self, time: NaiveTime) -> Self {
        self.time_of_day = time;
        self
    }

    /// Create one record at `at`.
    #[instrument(skip(self, comments), fields(task_id = %task_id))]
    pub async fn schedule_once(
        &self,
        task_id: Uuid,
        at: DateTime<Utc>,
        comments: Option<String>,
    ) -> DomainResult<CleaningRecord> {
        let task = self.active_task(task_id).await?;
        let mut record = CleaningRecord::new(task.id, at);
        record.comments = comments.map(|c| c.trim().to_string()).filter(|c| !c.is_empty());

        self.records.insert(&record).await?;
        info!(record_id = %record.id, scheduled = %at, "scheduled occurrence");
        Ok(record)
    }

    /// Create the occurrences of a task's frequency over a horizon.
    #[instrument(skip(self), fields(task_id = %task_id))]
    pub async fn generate_plan(&self, task_id: Uuid, start: NaiveDate, days: u32) -> DomainResult<GenerationReport> {
        let task = self.active_task(task_id).await?;
        if !task.frequency.is_schedulable() {
            return Err(DomainError::ValidationFailed(format!(
                "'{}' is done {} and has no fixed schedule",
                task.name,
                task.frequency.label()
            )));
        }

        let slots: Vec<DateTime<Utc>> = plan_dates(&task.frequency, start, days)
            .into_iter()
            .map(|d| self.tz.to_utc(d, self.time_of_day))
            .collect();
        self.create_batch(&task, slots).await
    }

    /// Create `count` occurrences stepping by `interval` from `start`,
    /// keeping its local time of day.
    #[instrument(skip(self), fields(task_id = %task_id))]
    pub async fn repeat(
        &self,
        task_id: Uuid,
        start: DateTime<Utc>,
        interval: RepeatInterval,
        count: u32,
    ) -> DomainResult<GenerationReport> {
        if count == 0 {
            return Err(DomainError::ValidationFailed(
                "repeat count must be at least 1".to_string(),
            ));
        }
        let task = self.active_task(task_id).await?;

        let local = start.with_timezone(&self.tz.tz()).naive_local();
        let slots = repeat_dates(local.date(), interval, count)
            .into_iter()
            .map(|d| self.tz.to_utc(d, local.time()))
            .collect();
        self.create_batch(&task, slots).await
    }

    async fn active_task(&self, task_id: Uuid) -> DomainResult<CleaningTask> {
        let task = self
            .tasks
            .get(task_id)
            .await?
            .ok_or(DomainError::TaskNotFound(task_id))?;
        if !task.is_active {
            return Err(DomainError::ValidationFailed(format!(
                "task '{}' is inactive",
                task.name
            )));
        }
        Ok(task)
    }

    async fn create_batch(&self, task: &CleaningTask, slots: Vec<DateTime<Utc>>) -> DomainResult<GenerationReport> {
        let requested = slots.len();
        let (Some(first), Some(last)) = (slots.iter().min().copied(), slots.iter().max().copied()) else {
            return Ok(GenerationReport {
                task_id: task.id,
                requested: 0,
                skipped: 0,
                created: Vec::new(),
            });
        };

        let existing: HashSet<DateTime<Utc>> = self
            .records
            .list(RecordQuery {
                task_id: Some(task.id),
                from: Some(first),
                to: Some(last + chrono::Duration::microseconds(1)),
                ..RecordQuery::default()
            })
            .await?
            .into_iter()
            .map(|r| r.scheduled_date)
            .collect();

        let mut seen = HashSet::new();
        let candidates: Vec<CleaningRecord> = slots
            .into_iter()
            .filter(|slot| !existing.contains(slot) && seen.insert(*slot))
            .map(|slot| CleaningRecord::new(task.id, slot))
            .collect();

        let inserted = self.records.insert_batch(&candidates).await?;
        let created = if inserted == candidates.len() {
            candidates
        } else {
            // Lost a race with another writer; report what is actually stored.
            let ids: HashSet<Uuid> = candidates.iter().map(|r| r.id).collect();
            self.records
                .list(RecordQuery::between(first, last + chrono::Duration::microseconds(1)))
                .await?
                .into_iter()
                .filter(|r| ids.contains(&r.id))
                .collect()
        };

        info!(
            task_id = %task.id,
            requested,
            created = created.len(),
            "generated occurrences"
        );

        Ok(GenerationReport {
            task_id: task.id,
            requested,
            skipped: requested - created.len(),
            created,
        })
    }
}
