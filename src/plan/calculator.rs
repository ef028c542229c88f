//! Deterministic plan calculator.
//!
//! Resting expenditure (Mifflin–St Jeor) → activity multiplier from the
//! step bracket → calorie target for the goal → protein, water, sleep and a
//! weekly session template. Only the period stamps depend on the clock.

use chrono::{DateTime, Utc};

use crate::onboarding::catalog::{keys, STEP_BRACKETS};
use crate::onboarding::question::AnswerSet;

use super::model::{Goal, PlanPeriod, PlanTargets};

const DEFAULT_WEIGHT_KG: f64 = 70.0;
const DEFAULT_HEIGHT_CM: f64 = 170.0;
const DEFAULT_AGE: f64 = 30.0;
const DEFAULT_DAYS_PER_WEEK: u32 = 3;

const KCAL_PER_KG_LOSS: f64 = 7700.0;
const KCAL_PER_KG_GAIN: f64 = 2500.0;

/// Multiplier per step bracket, same order as `STEP_BRACKETS`.
const ACTIVITY_MULTIPLIERS: [f64; 4] = [1.3, 1.45, 1.6, 1.75];

const SLEEP_HOURS: i64 = 7;

pub fn is_male(sex: Option<&str>) -> bool {
    matches!(sex, Some("М") | Some("M"))
}

/// Mifflin–St Jeor resting expenditure, rounded to whole kcal.
pub fn resting_kcal(male: bool, weight_kg: f64, height_cm: f64, age: f64) -> i64 {
    let sex_term = if male { 5.0 } else { -161.0 };
    (10.0 * weight_kg + 6.25 * height_cm - 5.0 * age + sex_term).round() as i64
}

/// Unknown brackets get the second-lowest multiplier.
pub fn activity_multiplier(bracket: Option<&str>) -> f64 {
    bracket
        .and_then(|b| STEP_BRACKETS.iter().position(|known| *known == b))
        .map(|i| ACTIVITY_MULTIPLIERS[i])
        .unwrap_or(ACTIVITY_MULTIPLIERS[1])
}

fn target_kcal(total: i64, goal: Goal, loss_kg: Option<f64>, gain_kg: Option<f64>) -> i64 {
    let total = total as f64;
    let target = match goal {
        Goal::Loss => match loss_kg.filter(|kg| *kg > 0.0) {
            Some(kg) => total - kg * KCAL_PER_KG_LOSS / 30.0,
            None => total * 0.85,
        },
        Goal::Gain => match gain_kg.filter(|kg| *kg > 0.0) {
            Some(kg) => total + kg * KCAL_PER_KG_GAIN / 30.0,
            None => total * 1.10,
        },
        Goal::Maintenance | Goal::Performance => total,
    };
    target.round() as i64
}

/// Whole-number day counts only; anything else falls back to three.
fn days_per_week(raw: Option<f64>) -> u32 {
    match raw {
        Some(d) if d.fract() == 0.0 && (1.0..=7.0).contains(&d) => d as u32,
        _ => DEFAULT_DAYS_PER_WEEK,
    }
}

pub fn workout_template(days: u32) -> Vec<String> {
    let labels: &[&str] = match days {
        2 => &["Full A", "Full B"],
        d if d >= 4 => &["Upper", "Lower", "Push", "Pull"],
        _ => &["Upper", "Lower", "Full"],
    };
    labels.iter().map(|s| s.to_string()).collect()
}

/// Compute targets from a finished interview.
pub fn compute(answers: &AnswerSet) -> PlanTargets {
    let male = is_male(answers.str(keys::SEX));
    let weight = answers.number(keys::WEIGHT_KG).unwrap_or(DEFAULT_WEIGHT_KG);
    let height = answers.number(keys::HEIGHT_CM).unwrap_or(DEFAULT_HEIGHT_CM);
    let age = answers.number(keys::AGE).unwrap_or(DEFAULT_AGE);
    let goal = Goal::from_answer(answers.str(keys::GOAL));

    let resting = resting_kcal(male, weight, height, age);
    let multiplier = activity_multiplier(answers.str(keys::STEPS_LEVEL));
    let total = (resting as f64 * multiplier).round() as i64;
    let target = target_kcal(
        total,
        goal,
        answers.number(keys::WEIGHT_LOSS_MONTH_KG),
        answers.number(keys::WEIGHT_GAIN_MONTH_KG),
    );
    let days = days_per_week(answers.number(keys::DAYS_PER_WEEK));

    PlanTargets {
        goal,
        resting_kcal: resting,
        activity_multiplier: multiplier,
        total_kcal: total,
        target_kcal: target,
        protein_g_per_kg: if goal == Goal::Gain { 2.0 } else { 1.6 },
        water_ml: if male { 2500 } else { 2000 },
        sleep_hours: SLEEP_HOURS,
        days_per_week: days,
        workout_template: workout_template(days),
    }
}

/// Targets plus the period they cover, starting at `now`.
pub fn plan_at(answers: &AnswerSet, now: DateTime<Utc>, period_days: i64) -> (PlanTargets, PlanPeriod) {
    (compute(answers), PlanPeriod::starting_at(now, period_days))
}
