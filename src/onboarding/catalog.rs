//! The coaching questionnaire.
//!
//! Ten blocks, from identity and safety screening through goals, logistics,
//! nutrition and recovery to reporting preferences. Follow-up questions are
//! attached to the answer that triggers them via `shown_if`.

use super::question::{QuestionDefinition as Q, Section};

/// Answer keys the rest of the crate reads.
pub mod keys {
    pub const NAME: &str = "name";
    pub const SEX: &str = "sex";
    pub const TIMEZONE: &str = "tz";
    pub const AGE: &str = "age";
    pub const HEIGHT_CM: &str = "height_cm";
    pub const WEIGHT_KG: &str = "weight_kg";
    pub const MEDICAL_FLAGS: &str = "medical_flags";
    pub const MEDICAL_DETAILS: &str = "medical_details";
    pub const MEDS_AFFECTING: &str = "meds_affecting";
    pub const MEDS_LIST: &str = "meds_list";
    pub const CLOTTING_ISSUE: &str = "clotting_issue";
    pub const CLOTTING_DETAILS: &str = "clotting_details";
    pub const PREGNANCY_STATUS: &str = "pregnancy_status";
    pub const PREGNANCY_DETAILS: &str = "pregnancy_details";
    pub const CARDIO_SYMPTOMS: &str = "cardio_symptoms";
    pub const CARDIO_DETAILS: &str = "cardio_details";
    pub const INJURY_NOTES: &str = "injury_notes";
    pub const GOAL: &str = "goal";
    pub const WEIGHT_LOSS_MONTH_KG: &str = "weight_loss_month_kg";
    pub const WEIGHT_GAIN_MONTH_KG: &str = "weight_gain_month_kg";
    pub const SECONDARY_GOALS: &str = "secondary_goals";
    pub const GOAL_KPI: &str = "goal_kpi";
    pub const LEVEL: &str = "level";
    pub const TRAINING_HISTORY: &str = "training_hist";
    pub const RPE_READY: &str = "rpe_ready";
    pub const DAYS_PER_WEEK: &str = "days_per_week";
    pub const SESSION_LENGTH: &str = "session_length";
    pub const PREFERRED_SLOTS: &str = "preferred_slots";
    pub const EQUIPMENT: &str = "equipment";
    pub const EQUIPMENT_LIMITS_FLAG: &str = "equip_limits_f";
    pub const EQUIPMENT_LIMITS: &str = "equipment_limits";
    pub const DISLIKES: &str = "dislikes";
    pub const CARDIO_PREFERENCE: &str = "cardio_pref";
    pub const DIET_LIMITS: &str = "diet_limits";
    pub const TRACK_STYLE: &str = "track_style";
    pub const MEALS_PER_DAY: &str = "meals_per_day";
    pub const WATER_READY: &str = "water_ready";
    pub const SLEEP_HOURS: &str = "sleep_hours";
    pub const STRESS_LEVEL: &str = "stress_level";
    pub const STEPS_LEVEL: &str = "steps_level";
    pub const Z2_AFTER_LIFTS: &str = "z2_after_lifts";
    pub const SWIM_OK: &str = "swim_ok";
    pub const STEPS_GOAL_OK: &str = "steps_goal_ok";
    pub const CREATINE_OK: &str = "creatine_ok";
    pub const OMEGA_VITD: &str = "omega_vitd";
    pub const MONTH_CONSTRAINTS: &str = "month_constraints";
    pub const REMINDER_MODE: &str = "reminder_mode";
}

/// Goal options the plan calculator recognizes.
pub mod goals {
    pub const LOSS: &str = "Похудение";
    pub const GAIN: &str = "Набор мышечной массы";
    pub const HEALTH: &str = "Поддержание здоровья и самочувствия";
    pub const PERFORMANCE: &str = "Увеличение производительности";
}

pub const YES: &str = "Да";
pub const NO: &str = "Нет";
pub const MALE: &str = "М";
pub const FEMALE: &str = "Ж";

/// Daily step-count brackets, lowest first.
pub const STEP_BRACKETS: [&str; 4] = ["<5k", "5–8k", "8–11k", ">11k"];

/// Build the full questionnaire in presentation order.
pub fn default_questions() -> Vec<Q> {
    use keys::*;
    use Section::*;

    vec![
        // Identity
        Q::text(NAME, Identity, "Как тебя зовут?"),
        Q::choice(SEX, Identity, "Пол:", &[MALE, FEMALE]),
        Q::choice(
            TIMEZONE,
            Identity,
            "Часовой пояс (для напоминаний):",
            &[
                "Europe/Moscow",
                "Europe/Amsterdam",
                "Asia/Almaty",
                "Asia/Dubai",
                "America/New_York",
                "Другое…",
            ],
        ),
        Q::number(AGE, Identity, "Возраст (лет):", 14.0, 90.0),
        Q::number(HEIGHT_CM, Identity, "Рост (см):", 130.0, 220.0),
        Q::number(WEIGHT_KG, Identity, "Вес (кг):", 35.0, 250.0),
        // Screening
        Q::choice(
            MEDICAL_FLAGS,
            Screening,
            "Есть диагностированные проблемы сердца, сосудов, обмена веществ, почек или симптомы при нагрузке?",
            &[NO, YES],
        ),
        Q::text(MEDICAL_DETAILS, Screening, "Опиши подробнее:").shown_if(MEDICAL_FLAGS, YES),
        Q::choice(
            MEDS_AFFECTING,
            Screening,
            "Принимаешь лекарства, влияющие на пульс или давление?",
            &[NO, YES],
        ),
        Q::text(MEDS_LIST, Screening, "Перечисли препараты коротко:").shown_if(MEDS_AFFECTING, YES),
        Q::choice(
            CLOTTING_ISSUE,
            Screening,
            "Нарушения свёртываемости крови или приём антикоагулянтов?",
            &[NO, YES],
        ),
        Q::text(CLOTTING_DETAILS, Screening, "Опиши подробнее:").shown_if(CLOTTING_ISSUE, YES),
        Q::choice(
            PREGNANCY_STATUS,
            Screening,
            "Беременность или послеродовый период?",
            &["Не актуально", "Актуально"],
        )
        .shown_if(SEX, FEMALE),
        Q::text(PREGNANCY_DETAILS, Screening, "Опиши подробнее:")
            .shown_if(PREGNANCY_STATUS, "Актуально"),
        Q::choice(
            CARDIO_SYMPTOMS,
            Screening,
            "Есть сейчас тревожные симптомы: боль в груди, необъяснимая одышка, обмороки?",
            &[NO, YES],
        ),
        Q::text(CARDIO_DETAILS, Screening, "Опиши подробнее:").shown_if(CARDIO_SYMPTOMS, YES),
        Q::text(
            INJURY_NOTES,
            Screening,
            "Травмы или операции за последний год? Движения, которые вызывают боль?",
        )
        .optional(),
        // Goals
        Q::choice(
            GOAL,
            Goals,
            "Главная цель на месяц:",
            &[goals::LOSS, goals::GAIN, goals::HEALTH, goals::PERFORMANCE],
        ),
        Q::number(
            WEIGHT_LOSS_MONTH_KG,
            Goals,
            "На сколько кг за месяц хочешь похудеть?",
            0.1,
            6.0,
        )
        .shown_if(GOAL, goals::LOSS),
        Q::number(
            WEIGHT_GAIN_MONTH_KG,
            Goals,
            "На сколько кг за месяц хочешь набрать?",
            0.1,
            6.0,
        )
        .shown_if(GOAL, goals::GAIN),
        Q::text(SECONDARY_GOALS, Goals, "Вторичные цели (до трёх, через запятую):").optional(),
        Q::text(
            GOAL_KPI,
            Goals,
            "Как поймём, что месяц удался? Например: −2 кг, +2 подтягивания, 10k шагов в день.",
        )
        .optional(),
        // Profile
        Q::choice(LEVEL, Profile, "Уровень в силовых:", &["Новичок", "Средний", "Продвинутый"]),
        Q::text(TRAINING_HISTORY, Profile, "Стаж занятий:").optional(),
        Q::choice(
            RPE_READY,
            Profile,
            "Знаешь шкалу усилий RPE (0–10) и готов(а) ею пользоваться?",
            &[YES, NO],
        ),
        // Logistics
        Q::number(
            DAYS_PER_WEEK,
            Logistics,
            "Сколько дней в неделю реально готов(а) тренироваться?",
            1.0,
            6.0,
        ),
        Q::choice(
            SESSION_LENGTH,
            Logistics,
            "Длительность одной тренировки:",
            &["60 мин", "75 мин", "90 мин"],
        ),
        Q::text(
            PREFERRED_SLOTS,
            Logistics,
            "Удобные дни и время (например: Пн/Ср/Пт вечер):",
        )
        .optional(),
        Q::text(
            EQUIPMENT,
            Logistics,
            "Где тренируешься и что доступно? (дом, зал, улица, штанга, гантели, тренажёры, турник, бассейн…)",
        ),
        Q::choice(
            EQUIPMENT_LIMITS_FLAG,
            Logistics,
            "Есть ограничения по инвентарю или движениям?",
            &["Ограничений нет", "Есть ограничения"],
        ),
        Q::text(EQUIPMENT_LIMITS, Logistics, "Опиши ограничения коротко:")
            .shown_if(EQUIPMENT_LIMITS_FLAG, "Есть ограничения"),
        // Preferences
        Q::text(
            DISLIKES,
            Preferences,
            "Что не нравится или вызывает дискомфорт? (до пяти, через запятую)",
        )
        .optional(),
        Q::choice(
            CARDIO_PREFERENCE,
            Preferences,
            "Какое кардио нравится?",
            &["Ходьба в горку", "Вело", "Эллипс", "Гребля", "Плавание"],
        ),
        // Nutrition
        Q::text(DIET_LIMITS, Nutrition, "Пищевые ограничения (до трёх, через запятую):").optional(),
        Q::choice(
            TRACK_STYLE,
            Nutrition,
            "Готов(а) считать БЖУ и калории?",
            &[YES, NO, "Только калории", "Только белок"],
        ),
        Q::choice(
            MEALS_PER_DAY,
            Nutrition,
            "Сколько приёмов пищи в день удобно?",
            &["2", "3", "4", "5+"],
        ),
        Q::choice(
            WATER_READY,
            Nutrition,
            "Готов(а) соблюдать норму воды по плану?",
            &[YES, NO],
        ),
        // Recovery
        Q::choice(
            SLEEP_HOURS,
            Recovery,
            "Сколько в среднем спишь за ночь?",
            &["<6", "6–7", "7–8", "8+"],
        ),
        Q::choice(
            STRESS_LEVEL,
            Recovery,
            "Стресс, сменный график, ночные смены?",
            &[NO, "Иногда", "Часто"],
        ),
        Q::choice(
            STEPS_LEVEL,
            Recovery,
            "Средняя дневная активность (шаги):",
            &STEP_BRACKETS,
        ),
        // Cardio
        Q::choice(
            Z2_AFTER_LIFTS,
            Cardio,
            "Ок ли 20–30 минут лёгкого кардио (Z2) после силовой?",
            &[YES, NO],
        ),
        Q::choice(
            SWIM_OK,
            Cardio,
            "Доступно плавание 1–2 раза в неделю по 20–30 минут?",
            &[YES, NO],
        ),
        Q::choice(
            STEPS_GOAL_OK,
            Cardio,
            "Цель 8–10 тысяч шагов в день подходит?",
            &[YES, NO],
        ),
        // Reporting
        Q::choice(CREATINE_OK, Reporting, "Креатин 3–5 г в день — ок?", &[YES, NO]),
        Q::choice(
            OMEGA_VITD,
            Reporting,
            "Омега-3 или витамин D уже принимаешь?",
            &[NO, "Да, омега-3", "Да, вит. D", "Да, оба"],
        ),
        Q::text(
            MONTH_CONSTRAINTS,
            Reporting,
            "Что может помешать плану в этом месяце? (поездки, дедлайны, события)",
        )
        .optional(),
        Q::choice(
            REMINDER_MODE,
            Reporting,
            "Режим напоминаний:",
            &["Мягкий", "Жёсткий", "Выключено"],
        )
        .with_aliases("Жёсткий", &["hard", "крепкий"])
        .with_aliases("Мягкий", &["soft", "лайт"])
        .with_aliases("Выключено", &["выкл", "off", "нет"]),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::onboarding::graph::QuestionGraph;

    #[test]
    fn default_catalog_is_a_valid_graph() {
        let graph = QuestionGraph::new(default_questions());
        assert!(graph.is_ok(), "{:?}", graph.err());
    }

    #[test]
    fn every_section_is_used() {
        let questions = default_questions();
        for section in [
            Section::Identity,
            Section::Screening,
            Section::Goals,
            Section::Profile,
            Section::Logistics,
            Section::Preferences,
            Section::Nutrition,
            Section::Recovery,
            Section::Cardio,
            Section::Reporting,
        ] {
            assert!(
                questions.iter().any(|q| q.section == section),
                "no question in {section}"
            );
        }
    }

    #[test]
    fn steps_question_offers_every_bracket() {
        let questions = default_questions();
        let steps = questions.iter().find(|q| q.key == keys::STEPS_LEVEL).unwrap();
        assert_eq!(steps.options(), STEP_BRACKETS.map(String::from).as_slice());
    }
}
