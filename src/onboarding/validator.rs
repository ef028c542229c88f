//! Reply validation — checks and coerces a raw reply against one question.
//!
//! Pure functions only. Each question kind's rules live here and nowhere
//! else.

use crate::error::ValidationError;

use super::question::{AnswerValue, QuestionDefinition, QuestionKind, RawInput};

/// Typed reply that counts as an empty answer; chat clients cannot send
/// an empty message.
pub const SKIP_MARKER: &str = "-";

/// Validate `input` against `question`, producing the value to record.
pub fn validate(
    question: &QuestionDefinition,
    input: &RawInput,
) -> Result<AnswerValue, ValidationError> {
    match &question.kind {
        QuestionKind::Number { min, max } => validate_number(input.as_str(), *min, *max),
        QuestionKind::SingleChoice { options, aliases } => match input {
            RawInput::Selection(picked) => options
                .iter()
                .find(|o| *o == picked)
                .map(|o| AnswerValue::Choice(o.clone()))
                .ok_or(ValidationError::NotAnOption),
            RawInput::Text(text) => match_choice(text, options, aliases)
                .map(|o| AnswerValue::Choice(o.to_string()))
                .ok_or(ValidationError::NotAnOption),
        },
        QuestionKind::Text => {
            let trimmed = input.as_str().trim();
            if !trimmed.is_empty() && trimmed != SKIP_MARKER {
                Ok(AnswerValue::Text(trimmed.to_string()))
            } else if question.optional {
                Ok(AnswerValue::Null)
            } else {
                Err(ValidationError::EmptyAnswer)
            }
        }
    }
}

fn validate_number(
    raw: &str,
    min: Option<f64>,
    max: Option<f64>,
) -> Result<AnswerValue, ValidationError> {
    let value = parse_decimal(raw).ok_or(ValidationError::NotANumber)?;
    if let Some(min) = min
        && value < min
    {
        return Err(ValidationError::BelowMinimum { min });
    }
    if let Some(max) = max
        && value > max
    {
        return Err(ValidationError::AboveMaximum { max });
    }
    Ok(AnswerValue::Number(value))
}

/// Parse a decimal that may use `,` or `.` as the separator.
pub fn parse_decimal(raw: &str) -> Option<f64> {
    let cleaned = raw.trim().replace(',', ".");
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Canonical form for comparing typed text with option labels.
pub fn normalize(s: &str) -> String {
    s.trim().to_lowercase().replace('ё', "е")
}

fn match_choice<'a>(
    text: &str,
    options: &'a [String],
    aliases: &'a [(String, String)],
) -> Option<&'a str> {
    let wanted = normalize(text);
    if wanted.is_empty() {
        return None;
    }

    if let Some(option) = options.iter().find(|o| normalize(o) == wanted) {
        return Some(option);
    }

    aliases
        .iter()
        .find(|(alias, _)| normalize(alias) == wanted)
        .and_then(|(_, target)| options.iter().find(|o| *o == target))
        .map(String::as_str)
}
