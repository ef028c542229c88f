//! Workout reports — free-text reports with a per-day cap.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// One accepted report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportEntry {
    pub at: DateTime<Utc>,
    pub text: String,
}

/// Result of submitting a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportOutcome {
    Recorded { remaining: u32 },
    LimitReached,
}

/// Reports a user has sent, plus the counter for the current day.
///
/// The counter belongs to `day`; the first report on a later date starts
/// a fresh count.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportLog {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day: Option<NaiveDate>,
    #[serde(default)]
    pub count: u32,
    #[serde(default)]
    pub entries: Vec<ReportEntry>,
}

impl ReportLog {
    /// Reports still allowed on `today`.
    pub fn remaining(&self, today: NaiveDate, limit: u32) -> u32 {
        limit.saturating_sub(self.count_on(today))
    }

    /// Accept a report unless the day's limit is used up.
    pub fn record(&mut self, text: impl Into<String>, now: DateTime<Utc>, limit: u32) -> ReportOutcome {
        let today = now.date_naive();
        if self.remaining(today, limit) == 0 {
            return ReportOutcome::LimitReached;
        }

        if self.day != Some(today) {
            self.day = Some(today);
            self.count = 0;
        }
        self.count += 1;
        self.entries.push(ReportEntry {
            at: now,
            text: text.into(),
        });

        ReportOutcome::Recorded {
            remaining: limit - self.count,
        }
    }

    fn count_on(&self, today: NaiveDate) -> u32 {
        if self.day == Some(today) { self.count } else { 0 }
    }
}
