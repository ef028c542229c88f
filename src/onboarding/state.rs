//! Onboarding state machine — one session per conversation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

use super::graph::QuestionGraph;
use super::question::{AnswerSet, QuestionDefinition, RawInput};
use super::validator;

/// Lifecycle of an interview.
///
/// Progresses linearly: NotStarted → InProgress → Completed. Only `begin`
/// and `finish` move it, and a completed session takes no more replies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OnboardingPhase {
    #[default]
    NotStarted,
    InProgress,
    Completed,
}

impl std::fmt::Display for OnboardingPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::NotStarted => "not_started",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
        };
        write!(f, "{s}")
    }
}

/// A question about to be asked.
#[derive(Debug, Clone, PartialEq)]
pub struct Prompt {
    pub question: QuestionDefinition,
    /// The question starts a block the user has not seen yet.
    pub opens_section: bool,
}

/// What happens after a session moves forward.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    NextQuestion(Prompt),
    Finished(AnswerSet),
}

/// Per-conversation interview state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OnboardingSession {
    pub phase: OnboardingPhase,
    /// Index of the question being waited on. Never rests on a hidden question.
    pub cursor: usize,
    pub answers: AnswerSet,
    pub started_at: DateTime<Utc>,
}

impl OnboardingSession {
    /// Open a session positioned at the first visible question.
    ///
    /// A questionnaire with nothing to ask yields an already completed session.
    pub fn begin(graph: &QuestionGraph, now: DateTime<Utc>) -> (Self, Step) {
        let answers = AnswerSet::new();
        let first = graph
            .next_visible(0, &answers)
            .and_then(|i| graph.get(i).map(|q| (i, q.clone())));

        match first {
            Some((cursor, question)) => (
                Self {
                    phase: OnboardingPhase::InProgress,
                    cursor,
                    answers,
                    started_at: now,
                },
                Step::NextQuestion(Prompt {
                    question,
                    opens_section: true,
                }),
            ),
            None => {
                let step = Step::Finished(answers.clone());
                (
                    Self {
                        phase: OnboardingPhase::Completed,
                        cursor: graph.len(),
                        answers,
                        started_at: now,
                    },
                    step,
                )
            }
        }
    }

    /// The question the session is waiting on.
    pub fn current<'g>(&self, graph: &'g QuestionGraph) -> Option<&'g QuestionDefinition> {
        if self.phase != OnboardingPhase::InProgress {
            return None;
        }
        graph.get(self.cursor)
    }

    /// Validate and record one reply, then move the cursor.
    ///
    /// On a validation failure nothing changes.
    pub fn submit(
        &mut self,
        graph: &QuestionGraph,
        input: &RawInput,
    ) -> Result<Step, ValidationError> {
        let Some(question) = self.current(graph) else {
            return Ok(Step::Finished(self.answers.clone()));
        };

        let value = validator::validate(question, input)?;
        self.answers.insert(question.key.clone(), value);

        let previous_section = question.section;
        let next = graph
            .next_visible(self.cursor + 1, &self.answers)
            .and_then(|i| graph.get(i).map(|q| (i, q)));

        match next {
            Some((index, next_question)) => {
                self.cursor = index;
                Ok(Step::NextQuestion(Prompt {
                    opens_section: next_question.section != previous_section,
                    question: next_question.clone(),
                }))
            }
            None => Ok(self.finish(graph)),
        }
    }

    fn finish(&mut self, graph: &QuestionGraph) -> Step {
        self.phase = OnboardingPhase::Completed;
        self.cursor = graph.len();
        Step::Finished(self.answers.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::onboarding::question::{AnswerValue, QuestionDefinition as Q, Section};

    fn graph() -> QuestionGraph {
        QuestionGraph::new(vec![
            Q::text("name", Section::Identity, "Имя?"),
            Q::number("age", Section::Identity, "Возраст?", 14.0, 90.0),
            Q::choice("flag", Section::Screening, "Проблемы?", &["Нет", "Да"]),
            Q::text("details", Section::Screening, "Подробнее?").shown_if("flag", "Да"),
            Q::text("notes", Section::Goals, "Заметки?").optional(),
        ])
        .unwrap()
    }

    fn text(s: &str) -> RawInput {
        RawInput::Text(s.to_string())
    }

    fn expect_question(step: Step) -> Prompt {
        match step {
            Step::NextQuestion(prompt) => prompt,
            Step::Finished(_) => panic!("expected a question"),
        }
    }

    #[test]
    fn display_matches_serde() {
        use OnboardingPhase::*;
        for phase in [NotStarted, InProgress, Completed] {
            let json = serde_json::to_string(&phase).unwrap();
            assert_eq!(format!("\"{phase}\""), json);
        }
    }

    #[test]
    fn begin_points_at_first_question() {
        let g = graph();
        let (session, step) = OnboardingSession::begin(&g, Utc::now());
        assert_eq!(session.phase, OnboardingPhase::InProgress);
        assert_eq!(session.cursor, 0);
        let prompt = expect_question(step);
        assert_eq!(prompt.question.key, "name");
        assert!(prompt.opens_section);
    }

    #[test]
    fn invalid_reply_changes_nothing() {
        let g = graph();
        let (mut session, _) = OnboardingSession::begin(&g, Utc::now());
        session.submit(&g, &text("Аня")).unwrap();

        let before_cursor = session.cursor;
        let before_answers = session.answers.clone();
        for bad in ["abc", "13", "91", ""] {
            assert!(session.submit(&g, &text(bad)).is_err());
            assert_eq!(session.cursor, before_cursor);
            assert_eq!(session.answers, before_answers);
        }
    }

    #[test]
    fn skipped_branch_never_recorded() {
        let g = graph();
        let (mut session, _) = OnboardingSession::begin(&g, Utc::now());
        session.submit(&g, &text("Аня")).unwrap();
        let prompt = expect_question(session.submit(&g, &text("30")).unwrap());
        assert_eq!(prompt.question.key, "flag");
        assert!(prompt.opens_section);

        let prompt = expect_question(session.submit(&g, &RawInput::Selection("Нет".into())).unwrap());
        assert_eq!(prompt.question.key, "notes");

        match session.submit(&g, &text("")).unwrap() {
            Step::Finished(answers) => {
                assert!(!answers.contains_key("details"));
                assert_eq!(answers.get("notes"), Some(&AnswerValue::Null));
                assert_eq!(answers.len(), 4);
            }
            other => panic!("expected finish, got {other:?}"),
        }
        assert_eq!(session.phase, OnboardingPhase::Completed);
    }

    #[test]
    fn followup_asked_when_rule_holds() {
        let g = graph();
        let (mut session, _) = OnboardingSession::begin(&g, Utc::now());
        session.submit(&g, &text("Аня")).unwrap();
        session.submit(&g, &text("30")).unwrap();
        let prompt = expect_question(session.submit(&g, &text("да")).unwrap());
        assert_eq!(prompt.question.key, "details");
        assert!(!prompt.opens_section);
        assert_eq!(session.answers.str("flag"), Some("Да"));
    }

    #[test]
    fn cursor_never_decreases() {
        let g = graph();
        let (mut session, _) = OnboardingSession::begin(&g, Utc::now());
        let mut last = session.cursor;
        for reply in ["Аня", "x", "30", "Да", "боли в колене", "—"] {
            let _ = session.submit(&g, &text(reply));
            assert!(session.cursor >= last);
            last = session.cursor;
        }
        assert_eq!(session.phase, OnboardingPhase::Completed);
    }

    #[test]
    fn completed_session_takes_no_replies() {
        let g = QuestionGraph::new(vec![Q::text("name", Section::Identity, "Имя?")]).unwrap();
        let (mut session, _) = OnboardingSession::begin(&g, Utc::now());
        session.submit(&g, &text("Аня")).unwrap();
        assert_eq!(session.phase, OnboardingPhase::Completed);

        let step = session.submit(&g, &text("Оля")).unwrap();
        assert!(matches!(step, Step::Finished(_)));
        assert_eq!(session.answers.str("name"), Some("Аня"));
        assert!(session.current(&g).is_none());
    }

    #[test]
    fn empty_questionnaire_completes_immediately() {
        let g = QuestionGraph::new(vec![]).unwrap();
        let (session, step) = OnboardingSession::begin(&g, Utc::now());
        assert_eq!(session.phase, OnboardingPhase::Completed);
        assert_eq!(step, Step::Finished(AnswerSet::new()));
    }
}
