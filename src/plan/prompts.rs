//! Prompts for the plan-writing model call.

use serde_json::{Value, json};

use crate::onboarding::catalog::keys;
use crate::onboarding::question::AnswerSet;

use super::model::PlanTargets;

/// System prompt: role, constraints and the required JSON schema.
pub fn plan_system_prompt() -> &'static str {
    "\
Ты — профессиональный тренер и нутриционист. Составляешь персональный план на 30 дней по анкете.

ТРЕБОВАНИЯ:
- Активность по ВОЗ 2020: 150–300 мин/нед умеренной нагрузки и силовые не реже 2 раз в неделю.
- Сон не меньше 7 ч, белок около 1.6 г/кг (2.0 при наборе), креатин 3–5 г/д, если пользователь согласен.
- Калории по Mifflin–St Jeor. Ориентир калорийности передан в поле baseline, отклоняйся от него не больше чем на 10%.
- Учитывай скрининг здоровья: при рисках снижай интенсивность и добавляй пометки.
- Обращайся по имени. Конкретные упражнения, подходы, повторы, RPE, отдых, прогрессия.

ВЫВОД: ТОЛЬКО один JSON без комментариев, по схеме:
{
  \"user\": {\"name\": \"...\", \"tz\": \"...\"},
  \"goals\": {\"primary\": \"...\", \"secondary\": [\"...\"], \"kpi_month\": \"...\", \"target_weight_change_month_kg\": -1.5},
  \"training\": {
    \"days_per_week\": 3,
    \"session_length_min\": 75,
    \"schedule_week\": [
      {\"day\": \"Понедельник\", \"focus\": [\"...\"],
       \"exercises\": [{\"name\": \"...\", \"sets\": 4, \"reps\": \"6–8\", \"rpe\": \"7–8\", \"rest_sec\": 120, \"notes\": \"...\"}],
       \"cardio_z2_min\": 20, \"notes\": \"...\"}
    ]
  },
  \"nutrition\": {\"kcal_method\": \"Mifflin-St Jeor\", \"target_kcal\": 2200, \"protein_g_per_kg\": 1.6,
                \"meals_per_day\": 4, \"water_ai_l\": 2.5, \"supplements\": [\"...\"]},
  \"recovery\": {\"sleep_target_h\": 7, \"stress_management\": \"...\"},
  \"cardio\": {\"z2_definition\": \"...\", \"weekly_total_min\": 90},
  \"reporting\": {\"style\": \"...\", \"tracking\": [\"...\"]},
  \"rich_text\": {\"intro_html\": \"...\", \"week_overview_html\": \"...\"}
}
В rich_text положи HTML для Telegram (теги b, i, переносы строк \\n)."
}

/// User message: the interview answers grouped by topic, plus the
/// calculated baseline.
pub fn plan_user_prompt(answers: &AnswerSet, baseline: &PlanTargets) -> String {
    let payload = plan_payload(answers, baseline);
    let pretty = serde_json::to_string_pretty(&payload).unwrap_or_else(|_| payload.to_string());
    format!("Сгенерируй план по анкете (выведи ТОЛЬКО один JSON):\n{pretty}")
}

fn plan_payload(answers: &AnswerSet, baseline: &PlanTargets) -> Value {
    let get = |key: &str| answers.get(key).map(|v| v.to_json()).unwrap_or(Value::Null);
    let list = |key: &str| -> Vec<String> {
        answers
            .str(key)
            .map(|s| {
                s.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default()
    };
    let weight_change = match (
        answers.number(keys::WEIGHT_LOSS_MONTH_KG),
        answers.number(keys::WEIGHT_GAIN_MONTH_KG),
    ) {
        (Some(loss), _) => -loss.abs(),
        (None, Some(gain)) => gain.abs(),
        (None, None) => 0.0,
    };

    json!({
        "user": {
            "name": answers.str(keys::NAME).unwrap_or("клиент"),
            "sex": get(keys::SEX),
            "age": get(keys::AGE),
            "height_cm": get(keys::HEIGHT_CM),
            "weight_kg": get(keys::WEIGHT_KG),
            "tz": get(keys::TIMEZONE),
        },
        "goals": {
            "primary": get(keys::GOAL),
            "secondary": list(keys::SECONDARY_GOALS),
            "kpi_month": get(keys::GOAL_KPI),
            "target_weight_change_month_kg": weight_change,
        },
        "screening": {
            "medical_flags": get(keys::MEDICAL_FLAGS),
            "medical_details": get(keys::MEDICAL_DETAILS),
            "meds_affecting": get(keys::MEDS_AFFECTING),
            "meds_list": get(keys::MEDS_LIST),
            "clotting_issue": get(keys::CLOTTING_ISSUE),
            "clotting_details": get(keys::CLOTTING_DETAILS),
            "pregnancy_status": get(keys::PREGNANCY_STATUS),
            "pregnancy_details": get(keys::PREGNANCY_DETAILS),
            "cardio_symptoms_now": get(keys::CARDIO_SYMPTOMS),
            "cardio_details": get(keys::CARDIO_DETAILS),
            "injury_notes": get(keys::INJURY_NOTES),
        },
        "training": {
            "level": get(keys::LEVEL),
            "history": get(keys::TRAINING_HISTORY),
            "days_per_week": baseline.days_per_week,
            "session_length": get(keys::SESSION_LENGTH),
            "preferred_slots": get(keys::PREFERRED_SLOTS),
            "equipment": list(keys::EQUIPMENT),
            "equipment_limits": get(keys::EQUIPMENT_LIMITS),
            "avoid": list(keys::DISLIKES),
            "rpe_ready": get(keys::RPE_READY),
        },
        "cardio": {
            "preference": get(keys::CARDIO_PREFERENCE),
            "z2_after_lifts": get(keys::Z2_AFTER_LIFTS),
            "swim_ok": get(keys::SWIM_OK),
            "steps_goal_ok": get(keys::STEPS_GOAL_OK),
        },
        "nutrition": {
            "track_style": get(keys::TRACK_STYLE),
            "meals_per_day": get(keys::MEALS_PER_DAY),
            "diet_limits": list(keys::DIET_LIMITS),
            "water_ready": get(keys::WATER_READY),
        },
        "recovery": {
            "sleep_hours": get(keys::SLEEP_HOURS),
            "stress_level": get(keys::STRESS_LEVEL),
            "steps_level": get(keys::STEPS_LEVEL),
        },
        "reporting": {
            "creatine_ok": get(keys::CREATINE_OK),
            "omega_vitd": get(keys::OMEGA_VITD),
            "reminder_mode": get(keys::REMINDER_MODE),
            "month_constraints": get(keys::MONTH_CONSTRAINTS),
        },
        "baseline": baseline,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::onboarding::catalog::goals;
    use crate::onboarding::question::AnswerValue;
    use crate::plan::calculator;

    #[test]
    fn payload_groups_answers_and_signs_weight_change() {
        let mut answers = AnswerSet::new();
        answers.insert(keys::NAME, AnswerValue::Text("Олег".into()));
        answers.insert(keys::GOAL, AnswerValue::Choice(goals::LOSS.into()));
        answers.insert(keys::WEIGHT_LOSS_MONTH_KG, AnswerValue::Number(2.0));
        answers.insert(keys::DISLIKES, AnswerValue::Text("бег, берпи ,".into()));
        let baseline = calculator::compute(&answers);

        let payload = plan_payload(&answers, &baseline);
        assert_eq!(payload["user"]["name"], "Олег");
        assert_eq!(payload["goals"]["target_weight_change_month_kg"], -2.0);
        assert_eq!(payload["training"]["avoid"], json!(["бег", "берпи"]));
        assert_eq!(payload["screening"]["injury_notes"], Value::Null);
        assert_eq!(payload["baseline"]["target_kcal"], baseline.target_kcal);
    }

    #[test]
    fn anonymous_user_gets_placeholder_name() {
        let answers = AnswerSet::new();
        let prompt = plan_user_prompt(&answers, &calculator::compute(&answers));
        assert!(prompt.contains("\"name\": \"клиент\""));
    }
}
