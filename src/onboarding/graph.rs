//! Question graph — the ordered questionnaire and its branching rules.
//!
//! `next_visible` is the only place that decides which question comes next.

use std::collections::HashMap;

use crate::error::GraphError;

use super::question::{AnswerSet, QuestionDefinition, QuestionKind};

/// Immutable, validated questionnaire.
#[derive(Debug, Clone)]
pub struct QuestionGraph {
    questions: Vec<QuestionDefinition>,
    positions: HashMap<String, usize>,
}

impl QuestionGraph {
    /// Build a graph, rejecting definitions that cannot be traversed safely.
    ///
    /// Visibility rules must point at a question declared earlier, which
    /// guarantees that a visible question stays visible once reached.
    pub fn new(questions: Vec<QuestionDefinition>) -> Result<Self, GraphError> {
        let mut positions = HashMap::with_capacity(questions.len());

        for (index, q) in questions.iter().enumerate() {
            match &q.kind {
                QuestionKind::SingleChoice { options, .. } if options.is_empty() => {
                    return Err(GraphError::NoOptions(q.key.clone()));
                }
                QuestionKind::Number {
                    min: Some(min),
                    max: Some(max),
                } if min > max => {
                    return Err(GraphError::InvertedBounds {
                        key: q.key.clone(),
                        min: *min,
                        max: *max,
                    });
                }
                _ => {}
            }

            if let Some(rule) = &q.visibility
                && !positions.contains_key(&rule.key)
            {
                return Err(GraphError::ForwardReference {
                    key: q.key.clone(),
                    depends_on: rule.key.clone(),
                });
            }

            if positions.insert(q.key.clone(), index).is_some() {
                return Err(GraphError::DuplicateKey(q.key.clone()));
            }
        }

        Ok(Self {
            questions,
            positions,
        })
    }

    /// First index at or after `index` whose question is visible under
    /// `answers`, or `None` when the questionnaire is exhausted.
    pub fn next_visible(&self, index: usize, answers: &AnswerSet) -> Option<usize> {
        self.questions
            .iter()
            .enumerate()
            .skip(index)
            .find(|(_, q)| q.is_visible(answers))
            .map(|(i, _)| i)
    }

    pub fn get(&self, index: usize) -> Option<&QuestionDefinition> {
        self.questions.get(index)
    }

    pub fn position(&self, key: &str) -> Option<usize> {
        self.positions.get(key).copied()
    }

    pub fn questions(&self) -> &[QuestionDefinition] {
        &self.questions
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }
}
