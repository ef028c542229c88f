//! Onboarding — the structured interview a new user goes through.
//!
//! A static question catalog is walked by a per-conversation state machine.
//! Replies are validated against each question's type; follow-ups appear only
//! when the answer they depend on matches. The finished answer set feeds the
//! plan calculator.

pub mod catalog;
pub mod graph;
pub mod manager;
pub mod model;
pub mod prompts;
pub mod question;
pub mod state;
pub mod validator;

pub use graph::QuestionGraph;
pub use manager::{OnboardingManager, Submission};
pub use model::CoachProfile;
pub use question::{
    AnswerSet, AnswerValue, QuestionDefinition, QuestionKind, RawInput, Section, VisibilityRule,
};
pub use state::{OnboardingPhase, OnboardingSession, Prompt, Step};
