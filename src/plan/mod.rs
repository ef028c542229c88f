//! Plans — calculated targets and model-written monthly plans.

pub mod calculator;
pub mod extractor;
pub mod generator;
pub mod model;
pub mod prompts;

pub use generator::PlanGenerator;
pub use model::{ActivePlan, Goal, ModelPlan, PlanPeriod, PlanTargets};
