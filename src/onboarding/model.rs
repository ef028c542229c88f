//! Coach profile — what is kept about a user once onboarding is done.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::coach::reports::ReportLog;
use crate::plan::model::ActivePlan;

use super::catalog::keys;
use super::question::AnswerSet;

/// User profile built from a finished interview.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CoachProfile {
    /// Answers of the last completed interview.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answers: Option<AnswerSet>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reminder_mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub onboarding_completed_at: Option<DateTime<Utc>>,
    /// Current plan. Replaced whole, never patched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan: Option<ActivePlan>,
    #[serde(default)]
    pub reports: ReportLog,
    /// The next free-text message is a workout report.
    #[serde(default)]
    pub awaiting_report: bool,
}

impl CoachProfile {
    /// Record a finished interview.
    pub fn complete_onboarding(&mut self, answers: AnswerSet, now: DateTime<Utc>) {
        if let Some(mode) = answers.str(keys::REMINDER_MODE) {
            self.reminder_mode = Some(mode.to_string());
        }
        self.answers = Some(answers);
        self.onboarding_completed_at = Some(now);
    }

    pub fn display_name(&self) -> Option<&str> {
        self.answers.as_ref().and_then(|a| a.str(keys::NAME))
    }

    pub fn has_plan(&self) -> bool {
        self.plan.is_some()
    }
}
