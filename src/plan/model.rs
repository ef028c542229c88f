//! Plan data model — calculated targets, model-authored plans, plan period.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::onboarding::catalog::goals;

/// Primary goal as the calculator understands it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Goal {
    Loss,
    Gain,
    Maintenance,
    Performance,
}

impl Goal {
    /// Map a recorded goal answer. Anything unrecognized is maintenance.
    pub fn from_answer(answer: Option<&str>) -> Self {
        match answer {
            Some(goals::LOSS) => Self::Loss,
            Some(goals::GAIN) => Self::Gain,
            Some(goals::PERFORMANCE) => Self::Performance,
            _ => Self::Maintenance,
        }
    }
}

/// Deterministic daily targets derived from the interview.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanTargets {
    pub goal: Goal,
    pub resting_kcal: i64,
    pub activity_multiplier: f64,
    pub total_kcal: i64,
    pub target_kcal: i64,
    pub protein_g_per_kg: f64,
    pub water_ml: i64,
    pub sleep_hours: i64,
    pub days_per_week: u32,
    pub workout_template: Vec<String>,
}

/// The window a plan covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanPeriod {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl PlanPeriod {
    pub fn starting_at(start: DateTime<Utc>, days: i64) -> Self {
        Self {
            start,
            end: start + Duration::days(days),
        }
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start <= at && at < self.end
    }
}

/// A plan object returned by the language model.
///
/// Only the fields the bot reads are typed; the rest is carried as is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModelPlan(pub Value);

impl ModelPlan {
    pub fn target_kcal(&self) -> Option<f64> {
        self.0.pointer("/nutrition/target_kcal").and_then(Value::as_f64)
    }

    /// Telegram-ready HTML overview, preferring the weekly breakdown.
    pub fn rich_html(&self) -> Option<&str> {
        ["/rich_text/week_overview_html", "/rich_text/intro_html"]
            .iter()
            .filter_map(|p| self.0.pointer(p).and_then(Value::as_str))
            .find(|s| !s.trim().is_empty())
    }
}

/// The plan a user currently follows. Replaced as a whole, never merged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum ActivePlan {
    Calculated {
        targets: PlanTargets,
        period: PlanPeriod,
    },
    ModelEnriched {
        plan: ModelPlan,
        /// Calculated baseline the model plan was checked against.
        baseline: PlanTargets,
        period: PlanPeriod,
    },
}

impl ActivePlan {
    pub fn period(&self) -> &PlanPeriod {
        match self {
            Self::Calculated { period, .. } | Self::ModelEnriched { period, .. } => period,
        }
    }

    pub fn is_model_enriched(&self) -> bool {
        matches!(self, Self::ModelEnriched { .. })
    }
}
