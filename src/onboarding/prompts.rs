//! User-facing interview texts: section intros and corrective hints.

use crate::error::ValidationError;

use super::question::{QuestionDefinition, QuestionKind, Section};

/// Heading shown above the first question of a block.
pub fn section_title(section: Section) -> &'static str {
    match section {
        Section::Identity => "Знакомство",
        Section::Screening => "Скрининг здоровья",
        Section::Goals => "Цели",
        Section::Profile => "Профиль",
        Section::Logistics => "Логистика",
        Section::Preferences => "Предпочтения",
        Section::Nutrition => "Питание",
        Section::Recovery => "Восстановление",
        Section::Cardio => "Кардио",
        Section::Reporting => "Добавки и отчётность",
    }
}

/// Short explanation of why a block is asked.
pub fn section_intro(section: Section) -> String {
    let body = match section {
        Section::Identity => {
            "Пара базовых вопросов, чтобы рассчитать калории и присылать напоминания вовремя."
        }
        Section::Screening => {
            "Несколько вопросов о здоровье. Это нужно для безопасности нагрузок, \
             ответы останутся между нами."
        }
        Section::Goals => "Определим главную цель на ближайший месяц и как будем мерить прогресс.",
        Section::Profile => "Немного о твоём опыте, чтобы подобрать сложность.",
        Section::Logistics => "Сколько времени и где тренируемся.",
        Section::Preferences => "Что нравится, а что лучше убрать из плана.",
        Section::Nutrition => "Как удобнее питаться и вести учёт.",
        Section::Recovery => "Сон, стресс и дневная активность.",
        Section::Cardio => "Договоримся о кардио и шагах.",
        Section::Reporting => "Последний блок: добавки и режим напоминаний.",
    };
    format!("<b>{}</b>\n{}", section_title(section), body)
}

/// Corrective line sent before re-asking a question.
pub fn validation_hint(error: &ValidationError, question: &QuestionDefinition) -> String {
    match error {
        ValidationError::NotANumber => match &question.kind {
            QuestionKind::Number {
                min: Some(min),
                max: Some(max),
            } => format!(
                "Нужно число от {} до {}. Можно с запятой, например 72,5.",
                format_bound(*min),
                format_bound(*max)
            ),
            _ => "Нужно число. Можно с запятой, например 72,5.".to_string(),
        },
        ValidationError::BelowMinimum { min } => {
            format!("Слишком мало, минимум {}.", format_bound(*min))
        }
        ValidationError::AboveMaximum { max } => {
            format!("Слишком много, максимум {}.", format_bound(*max))
        }
        ValidationError::NotAnOption => {
            "Выбери один из вариантов кнопкой или напиши его текстом.".to_string()
        }
        ValidationError::EmptyAnswer => "Ответ не может быть пустым.".to_string(),
    }
}

fn format_bound(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        value.to_string().replace('.', ",")
    }
}
