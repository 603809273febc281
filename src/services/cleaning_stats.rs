//! Dashboard figures for the cleaning plan.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::models::calendar::OrgTimezone;
use crate::domain::models::cleaning_record::CleaningRecord;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CleaningStats {
    pub total: usize,
    /// Completed with a completion date on today's local day.
    pub completed_today: usize,
    /// Rounded percentage of completed records judged compliant; 0 when
    /// nothing is completed yet.
    pub compliance_rate: u8,
    pub pending: usize,
}

pub fn compute(records: &[CleaningRecord], now: DateTime<Utc>, tz: OrgTimezone) -> CleaningStats {
    let today = tz.local_date(now);
    let mut completed = 0usize;
    let mut compliant = 0usize;
    let mut completed_today = 0usize;

    for record in records {
        if let Some(done_at) = record.completion_date() {
            completed += 1;
            if record.is_completed_compliant() {
                compliant += 1;
            }
            if tz.local_date(done_at) == today {
                completed_today += 1;
            }
        }
    }

    let compliance_rate = if completed == 0 {
        0
    } else {
        ((compliant as f64 / completed as f64) * 100.0).round() as u8
    };

    CleaningStats {
        total: records.len(),
        completed_today,
        compliance_rate,
        pending: records.len() - completed,
    }
}
