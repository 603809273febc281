//! Calendar projection of a record snapshot.
//!
//! Pure functions: the same snapshot, cursor and clock always give the same
//! view. Records are placed on the organization's local calendar day.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Days, NaiveDate, Utc};

use crate::domain::models::calendar::{
    BucketStats, CalendarCell, CalendarCursor, CalendarView, DayBucket, Granularity, OrgTimezone,
};
use crate::domain::models::cleaning_record::CleaningRecord;

/// Bucket `records` for the period under `cursor`.
pub fn aggregate<'a>(
    records: &'a [CleaningRecord],
    cursor: CalendarCursor,
    now: DateTime<Utc>,
    tz: OrgTimezone,
) -> CalendarView<'a> {
    let (range_start, range_end) = cursor.range();
    let today = tz.local_date(now);

    let mut by_day: BTreeMap<NaiveDate, DayBucket<'a>> = dates_between(range_start, range_end)
        .map(|date| (date, DayBucket::empty(date, today)))
        .collect();

    for record in records {
        let date = tz.local_date(record.scheduled_date);
        if let Some(bucket) = by_day.get_mut(&date) {
            bucket.stats.add(record, now);
            bucket.records.push(record);
        }
    }

    let mut totals = BucketStats::default();
    for bucket in by_day.values_mut() {
        bucket.records.sort_by_key(|r| (r.scheduled_date, r.id));
        totals.merge(&bucket.stats);
    }

    let leading = match cursor.granularity {
        Granularity::Month => range_start.weekday().num_days_from_sunday() as usize,
        Granularity::Day | Granularity::Week => 0,
    };

    let mut cells: Vec<CalendarCell<'a>> = Vec::with_capacity(leading + by_day.len() + 6);
    cells.extend(std::iter::repeat_with(|| CalendarCell::Padding).take(leading));
    cells.extend(by_day.into_values().map(CalendarCell::Day));

    if cursor.granularity == Granularity::Month {
        let trailing = (7 - cells.len() % 7) % 7;
        cells.extend(std::iter::repeat_with(|| CalendarCell::Padding).take(trailing));
    }

    CalendarView {
        cursor,
        range_start,
        range_end,
        cells,
        totals,
    }
}

/// Half-open UTC bounds `[start, end)` covering the local days of the
/// cursor's range, for narrowing a store query.
pub fn utc_bounds(cursor: &CalendarCursor, tz: OrgTimezone) -> (DateTime<Utc>, DateTime<Utc>) {
    let (start, end) = cursor.range();
    let after_end = end.checked_add_days(Days::new(1)).unwrap_or(end);
    (tz.start_of_day(start), tz.start_of_day(after_end))
}

fn dates_between(start: NaiveDate, end: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    start.iter_days().take_while(move |d| *d <= end)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::cleaning_record::CompletionState;
    use chrono::TimeZone;
    use uuid::Uuid;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn at(y: i32, m: u32, day: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, day, h, 0, 0).unwrap()
    }

    fn completed(mut record: CleaningRecord, compliant: bool) -> CleaningRecord {
        record.state = CompletionState::Completed {
            compliant,
            completed_at: record.scheduled_date,
        };
        record
    }

    #[test]
    fn test_march_2024_daily_month_view() {
        let task = Uuid::new_v4();
        let records: Vec<_> = (1..=31)
            .map(|day| {
                let r = CleaningRecord::new(task, at(2024, 3, day, 0));
                if day <= 10 { completed(r, true) } else { r }
            })
            .collect();
        let cursor = CalendarCursor::new(d(2024, 3, 1), Granularity::Month);
        let now = at(2024, 3, 15, 0);

        let view = aggregate(&records, cursor, now, OrgTimezone::utc());

        // March 1st 2024 is a Friday: five leading cells, 5 + 31 = 36 -> 42.
        assert_eq!(view.cells.len(), 42);
        assert!(view.cells[..5].iter().all(|c| matches!(c, CalendarCell::Padding)));
        assert_eq!(view.days().count(), 31);
        assert!(view.days().all(|b| b.stats.total == 1));

        assert_eq!(view.totals.total, 31);
        assert_eq!(view.totals.completed, 10);
        assert_eq!(view.totals.compliant, 10);
        // Days 11 through 14 are pending and before "now"; the 15th is not.
        assert_eq!(view.totals.overdue, 4);
        assert_eq!(view.bucket(d(2024, 3, 15)).unwrap().stats.overdue, 0);
        assert!(view.bucket(d(2024, 3, 15)).unwrap().is_today);
    }

    #[test]
    fn test_week_view_has_seven_buckets_and_filters_range() {
        let task = Uuid::new_v4();
        let records = vec![
            CleaningRecord::new(task, at(2024, 3, 9, 8)),
            CleaningRecord::new(task, at(2024, 3, 10, 8)),
            CleaningRecord::new(task, at(2024, 3, 16, 8)),
            CleaningRecord::new(task, at(2024, 3, 17, 8)),
        ];
        let cursor = CalendarCursor::new(d(2024, 3, 13), Granularity::Week);
        let view = aggregate(&records, cursor, at(2024, 3, 1, 0), OrgTimezone::utc());

        assert_eq!(view.cells.len(), 7);
        assert_eq!(view.totals.total, 2);
        assert_eq!(view.days().next().unwrap().date, d(2024, 3, 10));
        assert!(view.days().next().unwrap().is_weekend);
    }

    #[test]
    fn test_day_view_uses_local_dates() {
        let task = Uuid::new_v4();
        // 23:30 UTC on the 1st is the 2nd in Paris.
        let late = CleaningRecord::new(task, Utc.with_ymd_and_hms(2024, 3, 1, 23, 30, 0).unwrap());
        let records = vec![late];
        let tz = OrgTimezone::parse("Europe/Paris").unwrap();

        let first = CalendarCursor::new(d(2024, 3, 1), Granularity::Day);
        assert_eq!(aggregate(&records, first, at(2024, 3, 1, 0), tz).totals.total, 0);
        let second = first.next();
        let view = aggregate(&records, second, at(2024, 3, 1, 0), tz);
        assert_eq!(view.cells.len(), 1);
        assert_eq!(view.totals.total, 1);
    }

    #[test]
    fn test_bucket_stats_count_non_compliant() {
        let task = Uuid::new_v4();
        let records = vec![
            completed(CleaningRecord::new(task, at(2024, 3, 5, 8)), true),
            completed(CleaningRecord::new(task, at(2024, 3, 5, 12)), false),
            CleaningRecord::new(task, at(2024, 3, 5, 18)),
        ];
        let cursor = CalendarCursor::new(d(2024, 3, 5), Granularity::Day);
        let view = aggregate(&records, cursor, at(2024, 3, 6, 0), OrgTimezone::utc());
        let stats = view.days().next().unwrap().stats;
        assert_eq!(stats, BucketStats { total: 3, completed: 2, compliant: 1, overdue: 1 });
    }

    #[test]
    fn test_month_sum_equals_records_in_range() {
        let task = Uuid::new_v4();
        let records: Vec<_> = (0..90)
            .map(|i| CleaningRecord::new(task, at(2024, 2, 1, 0) + chrono::Duration::hours(i * 13)))
            .collect();
        let cursor = CalendarCursor::new(d(2024, 3, 1), Granularity::Month);
        let view = aggregate(&records, cursor, at(2024, 3, 1, 0), OrgTimezone::utc());

        let in_march = records
            .iter()
            .filter(|r| r.scheduled_date.month() == 3)
            .count();
        let summed: usize = view.days().map(|b| b.stats.total).sum();
        assert_eq!(summed, in_march);
        assert_eq!(view.totals.total, in_march);
    }

    #[test]
    fn test_utc_bounds_follow_timezone() {
        let tz = OrgTimezone::parse("Europe/Paris").unwrap();
        let cursor = CalendarCursor::new(d(2024, 3, 15), Granularity::Day);
        let (from, to) = utc_bounds(&cursor, tz);
        assert_eq!(from, at(2024, 3, 14, 23));
        assert_eq!(to, at(2024, 3, 15, 23));
    }
}
