//! Calendar view models and date arithmetic.
//!
//! All calendar-day comparisons go through [`OrgTimezone`] so that a record
//! stored as a UTC timestamp lands on the same local day everywhere: in the
//! calendar buckets, in the "today" tab and in the stats.

use chrono::{DateTime, Datelike, Days, Months, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc, Weekday};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use super::cleaning_record::CleaningRecord;
use crate::domain::errors::{DomainError, DomainResult};

/// Timezone of the organization; the single normalization point for
/// converting timestamps into calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrgTimezone(Tz);

impl OrgTimezone {
    pub fn new(tz: Tz) -> Self {
        Self(tz)
    }

    /// Parse an IANA timezone name such as `Europe/Paris`.
    pub fn parse(name: &str) -> DomainResult<Self> {
        name.parse::<Tz>()
            .map(Self)
            .map_err(|e| DomainError::ValidationFailed(format!("unknown timezone '{name}': {e}")))
    }

    pub fn utc() -> Self {
        Self(chrono_tz::UTC)
    }

    pub fn tz(&self) -> Tz {
        self.0
    }

    /// Local calendar day of a timestamp.
    pub fn local_date(&self, ts: DateTime<Utc>) -> NaiveDate {
        ts.with_timezone(&self.0).date_naive()
    }

    /// UTC instant of a local wall-clock time.
    ///
    /// Ambiguous times (DST fall-back) resolve to the earlier instant; times
    /// skipped by a DST jump are interpreted as UTC offsets of the previous
    /// hour.
    pub fn to_utc(&self, date: NaiveDate, time: NaiveTime) -> DateTime<Utc> {
        let local = NaiveDateTime::new(date, time);
        match self.0.from_local_datetime(&local).earliest() {
            Some(dt) => dt.with_timezone(&Utc),
            None => {
                let shifted = local + chrono::Duration::hours(1);
                self.0
                    .from_local_datetime(&shifted)
                    .earliest()
                    .map_or_else(|| Utc.from_utc_datetime(&local), |dt| dt.with_timezone(&Utc))
            }
        }
    }

    /// UTC instant of local midnight starting `date`.
    pub fn start_of_day(&self, date: NaiveDate) -> DateTime<Utc> {
        self.to_utc(date, NaiveTime::MIN)
    }
}

impl Default for OrgTimezone {
    fn default() -> Self {
        Self::utc()
    }
}

/// Number of days in a calendar month.
pub fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|d| d.pred_opt())
        .map_or(31, |d| d.day())
}

/// View granularity of the calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    Day,
    Week,
    Month,
}

impl Granularity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Day => "day",
            Self::Week => "week",
            Self::Month => "month",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "day" | "jour" => Some(Self::Day),
            "week" | "semaine" => Some(Self::Week),
            "month" | "mois" => Some(Self::Month),
            _ => None,
        }
    }
}

/// Reference date plus granularity; navigation never touches records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarCursor {
    pub reference: NaiveDate,
    pub granularity: Granularity,
}

impl CalendarCursor {
    pub fn new(reference: NaiveDate, granularity: Granularity) -> Self {
        Self {
            reference,
            granularity,
        }
    }

    pub fn with_granularity(self, granularity: Granularity) -> Self {
        Self {
            granularity,
            ..self
        }
    }

    /// One unit forward: a day, seven days, or a calendar month (clamped at
    /// month end).
    pub fn next(self) -> Self {
        let reference = match self.granularity {
            Granularity::Day => self.reference.checked_add_days(Days::new(1)),
            Granularity::Week => self.reference.checked_add_days(Days::new(7)),
            Granularity::Month => self.reference.checked_add_months(Months::new(1)),
        };
        Self {
            reference: reference.unwrap_or(self.reference),
            ..self
        }
    }

    /// One unit backward.
    pub fn previous(self) -> Self {
        let reference = match self.granularity {
            Granularity::Day => self.reference.checked_sub_days(Days::new(1)),
            Granularity::Week => self.reference.checked_sub_days(Days::new(7)),
            Granularity::Month => self.reference.checked_sub_months(Months::new(1)),
        };
        Self {
            reference: reference.unwrap_or(self.reference),
            ..self
        }
    }

    /// Shift by `steps` units in one jump; negative goes backward. Months
    /// clamp once at the target month end (Jan 31 + 2 months is Mar 31).
    pub fn shift(self, steps: i32) -> DomainResult<Self> {
        let n = steps.unsigned_abs();
        let forward = steps >= 0;
        let days = |count: Option<u64>| {
            count.map(Days::new).and_then(|days| {
                if forward {
                    self.reference.checked_add_days(days)
                } else {
                    self.reference.checked_sub_days(days)
                }
            })
        };
        let reference = match self.granularity {
            Granularity::Day => days(Some(u64::from(n))),
            Granularity::Week => days(u64::from(n).checked_mul(7)),
            Granularity::Month if forward => self.reference.checked_add_months(Months::new(n)),
            Granularity::Month => self.reference.checked_sub_months(Months::new(n)),
        };
        let reference = reference.ok_or_else(|| {
            DomainError::ValidationFailed(format!("cannot shift the calendar by {steps} steps"))
        })?;
        Ok(Self { reference, ..self })
    }

    pub fn go_to_today(self, today: NaiveDate) -> Self {
        Self {
            reference: today,
            ..self
        }
    }

    /// Set the month (1-12), keeping the day where it exists.
    pub fn go_to_month(self, month: u32) -> DomainResult<Self> {
        if !(1..=12).contains(&month) {
            return Err(DomainError::ValidationFailed(format!(
                "month must be between 1 and 12, got {month}"
            )));
        }
        let year = self.reference.year();
        let day = self.reference.day().min(days_in_month(year, month));
        Ok(Self {
            reference: ymd(year, month, day)?,
            ..self
        })
    }

    /// Set the year, keeping month and day (Feb 29 clamps to Feb 28).
    pub fn go_to_year(self, year: i32) -> DomainResult<Self> {
        let month = self.reference.month();
        let day = self.reference.day().min(days_in_month(year, month));
        Ok(Self {
            reference: ymd(year, month, day)?,
            ..self
        })
    }

    /// Inclusive date range covered by the current view.
    pub fn range(&self) -> (NaiveDate, NaiveDate) {
        match self.granularity {
            Granularity::Day => (self.reference, self.reference),
            Granularity::Week => {
                let back = u64::from(self.reference.weekday().num_days_from_sunday());
                let start = self.reference - Days::new(back);
                (start, start + Days::new(6))
            }
            Granularity::Month => {
                let year = self.reference.year();
                let month = self.reference.month();
                let start = self.reference.with_day(1).unwrap_or(self.reference);
                let end = start
                    .with_day(days_in_month(year, month))
                    .unwrap_or(start);
                (start, end)
            }
        }
    }
}

fn ymd(year: i32, month: u32, day: u32) -> DomainResult<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| {
        DomainError::ValidationFailed(format!("invalid date {year}-{month:02}-{day:02}"))
    })
}

/// Aggregated counts of one bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BucketStats {
    pub total: usize,
    pub completed: usize,
    pub compliant: usize,
    pub overdue: usize,
}

impl BucketStats {
    pub fn add(&mut self, record: &CleaningRecord, now: DateTime<Utc>) {
        self.total += 1;
        if record.is_completed() {
            self.completed += 1;
        }
        if record.is_completed_compliant() {
            self.compliant += 1;
        }
        if record.is_overdue(now) {
            self.overdue += 1;
        }
    }

    pub fn merge(&mut self, other: &Self) {
        self.total += other.total;
        self.completed += other.completed;
        self.compliant += other.compliant;
        self.overdue += other.overdue;
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    pub fn all_completed(&self) -> bool {
        self.total > 0 && self.completed == self.total
    }
}

/// Records of one calendar day.
#[derive(Debug, Clone, Serialize)]
pub struct DayBucket<'a> {
    pub date: NaiveDate,
    pub records: Vec<&'a CleaningRecord>,
    pub stats: BucketStats,
    pub is_today: bool,
    pub is_weekend: bool,
}

impl DayBucket<'_> {
    pub fn empty(date: NaiveDate, today: NaiveDate) -> Self {
        Self {
            date,
            records: Vec::new(),
            stats: BucketStats::default(),
            is_today: date == today,
            is_weekend: matches!(date.weekday(), Weekday::Sat | Weekday::Sun),
        }
    }
}

/// A cell of the rendered grid.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CalendarCell<'a> {
    /// Leading/trailing filler outside the month.
    Padding,
    Day(DayBucket<'a>),
}

impl<'a> CalendarCell<'a> {
    pub fn bucket(&self) -> Option<&DayBucket<'a>> {
        match self {
            Self::Day(bucket) => Some(bucket),
            Self::Padding => None,
        }
    }
}

/// Bucketed projection of the record snapshot for one cursor position.
#[derive(Debug, Clone, Serialize)]
pub struct CalendarView<'a> {
    pub cursor: CalendarCursor,
    pub range_start: NaiveDate,
    pub range_end: NaiveDate,
    /// Day view: one cell. Week view: seven cells, Sunday first. Month view:
    /// padded grid whose length is a multiple of seven.
    pub cells: Vec<CalendarCell<'a>>,
    pub totals: BucketStats,
}

impl<'a> CalendarView<'a> {
    pub fn days(&self) -> impl Iterator<Item = &DayBucket<'a>> {
        self.cells.iter().filter_map(CalendarCell::bucket)
    }

    pub fn bucket(&self, date: NaiveDate) -> Option<&DayBucket<'a>> {
        self.days().find(|b| b.date == date)
    }

    /// Grid rows of seven cells (week and month views).
    pub fn weeks(&self) -> impl Iterator<Item = &[CalendarCell<'a>]> {
        self.cells.chunks(7)
    }
}
