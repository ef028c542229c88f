//! Questionnaire data model: question definitions, answers, raw input.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Questionnaire block. Each block opens with a short intro.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    Identity,
    Screening,
    Goals,
    Profile,
    Logistics,
    Preferences,
    Nutrition,
    Recovery,
    Cardio,
    Reporting,
}

impl std::fmt::Display for Section {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Identity => "identity",
            Self::Screening => "screening",
            Self::Goals => "goals",
            Self::Profile => "profile",
            Self::Logistics => "logistics",
            Self::Preferences => "preferences",
            Self::Nutrition => "nutrition",
            Self::Recovery => "recovery",
            Self::Cardio => "cardio",
            Self::Reporting => "reporting",
        };
        write!(f, "{s}")
    }
}

/// What kind of reply a question expects, with its constraints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QuestionKind {
    Text,
    Number {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max: Option<f64>,
    },
    SingleChoice {
        options: Vec<String>,
        /// Extra free-text spellings, each mapped to one of `options`.
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        aliases: Vec<(String, String)>,
    },
}

/// Show a question only when an earlier answer equals `equals`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisibilityRule {
    pub key: String,
    pub equals: String,
}

impl VisibilityRule {
    pub fn holds(&self, answers: &AnswerSet) -> bool {
        answers
            .get(&self.key)
            .and_then(AnswerValue::as_str)
            .is_some_and(|v| v == self.equals)
    }
}

/// One question of the questionnaire. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionDefinition {
    pub key: String,
    pub section: Section,
    pub prompt: String,
    pub kind: QuestionKind,
    #[serde(default)]
    pub optional: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility: Option<VisibilityRule>,
}

impl QuestionDefinition {
    fn build(key: &str, section: Section, prompt: &str, kind: QuestionKind) -> Self {
        Self {
            key: key.to_string(),
            section,
            prompt: prompt.to_string(),
            kind,
            optional: false,
            visibility: None,
        }
    }

    pub fn text(key: &str, section: Section, prompt: &str) -> Self {
        Self::build(key, section, prompt, QuestionKind::Text)
    }

    pub fn number(key: &str, section: Section, prompt: &str, min: f64, max: f64) -> Self {
        Self::build(
            key,
            section,
            prompt,
            QuestionKind::Number {
                min: Some(min),
                max: Some(max),
            },
        )
    }

    pub fn choice(key: &str, section: Section, prompt: &str, options: &[&str]) -> Self {
        Self::build(
            key,
            section,
            prompt,
            QuestionKind::SingleChoice {
                options: options.iter().map(|o| o.to_string()).collect(),
                aliases: Vec::new(),
            },
        )
    }

    /// Accept an empty text reply.
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn shown_if(mut self, key: &str, equals: &str) -> Self {
        self.visibility = Some(VisibilityRule {
            key: key.to_string(),
            equals: equals.to_string(),
        });
        self
    }

    /// Map extra free-text spellings onto `option`. No-op for non-choice questions.
    pub fn with_aliases(mut self, option: &str, spellings: &[&str]) -> Self {
        if let QuestionKind::SingleChoice { aliases, .. } = &mut self.kind {
            aliases.extend(
                spellings
                    .iter()
                    .map(|s| (s.to_string(), option.to_string())),
            );
        }
        self
    }

    /// Options of a single-choice question, empty otherwise.
    pub fn options(&self) -> &[String] {
        match &self.kind {
            QuestionKind::SingleChoice { options, .. } => options,
            _ => &[],
        }
    }

    pub fn is_visible(&self, answers: &AnswerSet) -> bool {
        self.visibility.as_ref().is_none_or(|rule| rule.holds(answers))
    }
}

/// A recorded answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum AnswerValue {
    Text(String),
    Number(f64),
    Choice(String),
    /// An optional question answered with nothing.
    Null,
}

impl AnswerValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) | Self::Choice(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Plain JSON form used in model prompts.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Text(s) | Self::Choice(s) => serde_json::Value::String(s.clone()),
            Self::Number(n) => serde_json::json!(n),
            Self::Null => serde_json::Value::Null,
        }
    }
}

/// Answers collected so far, keyed by question key.
///
/// There is no removal API: a session's answers only grow.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnswerSet(BTreeMap<String, AnswerValue>);

impl AnswerSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: AnswerValue) {
        self.0.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&AnswerValue> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(AnswerValue::as_str)
    }

    pub fn number(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(AnswerValue::as_f64)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &AnswerValue)> {
        self.0.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

/// A reply as it arrived from the chat platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawInput {
    /// Free-form typed text.
    Text(String),
    /// An option picked from offered buttons, carried verbatim.
    Selection(String),
}

impl RawInput {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Text(s) | Self::Selection(s) => s,
        }
    }
}
