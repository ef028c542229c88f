//! Plan generator — calculated baseline, optionally superseded by a model plan.
//!
//! The model plan is used only when the call succeeds in time, the reply
//! contains a JSON object, and its calorie target is within tolerance of the
//! calculated one. Otherwise the calculated plan is used. The two are never
//! merged.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::config::PlanConfig;
use crate::error::LlmError;
use crate::llm::{ChatMessage, CompletionRequest, LlmProvider};
use crate::onboarding::question::AnswerSet;

use super::calculator;
use super::extractor;
use super::model::{ActivePlan, ModelPlan, PlanTargets};
use super::prompts::{plan_system_prompt, plan_user_prompt};

pub struct PlanGenerator {
    llm: Option<Arc<dyn LlmProvider>>,
    config: PlanConfig,
}

impl PlanGenerator {
    pub fn new(llm: Option<Arc<dyn LlmProvider>>, config: PlanConfig) -> Self {
        Self { llm, config }
    }

    /// Calculator only.
    pub fn offline(config: PlanConfig) -> Self {
        Self::new(None, config)
    }

    pub async fn generate(&self, answers: &AnswerSet) -> ActivePlan {
        self.generate_at(answers, Utc::now()).await
    }

    pub async fn generate_at(&self, answers: &AnswerSet, now: DateTime<Utc>) -> ActivePlan {
        let (targets, period) = calculator::plan_at(answers, now, self.config.period_days);

        match self.model_plan(answers, &targets).await {
            Some(plan) => ActivePlan::ModelEnriched {
                plan,
                baseline: targets,
                period,
            },
            None => ActivePlan::Calculated { targets, period },
        }
    }

    async fn model_plan(&self, answers: &AnswerSet, baseline: &PlanTargets) -> Option<ModelPlan> {
        let llm = self.llm.as_ref()?;

        let text = match self.ask(llm.as_ref(), answers, baseline).await {
            Ok(text) => text,
            Err(e) => {
                warn!(model = llm.model_name(), error = %e, "Plan model call failed, using calculated plan");
                return None;
            }
        };

        let Some(value) = extractor::extract(&text) else {
            warn!(model = llm.model_name(), "No JSON plan in model reply, using calculated plan");
            return None;
        };

        let plan = ModelPlan(value);
        if !self.within_tolerance(&plan, baseline) {
            warn!(
                model = llm.model_name(),
                model_kcal = plan.target_kcal(),
                baseline_kcal = baseline.target_kcal,
                "Model calorie target out of range, using calculated plan"
            );
            return None;
        }

        info!(model = llm.model_name(), "Model plan accepted");
        Some(plan)
    }

    async fn ask(
        &self,
        llm: &dyn LlmProvider,
        answers: &AnswerSet,
        baseline: &PlanTargets,
    ) -> Result<String, LlmError> {
        let request = CompletionRequest::new(vec![
            ChatMessage::system(plan_system_prompt()),
            ChatMessage::user(plan_user_prompt(answers, baseline)),
        ])
        .with_max_tokens(self.config.max_tokens)
        .with_temperature(self.config.temperature);

        let response = tokio::time::timeout(self.config.llm_timeout, llm.complete(request))
            .await
            .map_err(|_| LlmError::Timeout(self.config.llm_timeout))??;
        Ok(response.content)
    }

    fn within_tolerance(&self, plan: &ModelPlan, baseline: &PlanTargets) -> bool {
        let Some(kcal) = plan.target_kcal() else {
            return false;
        };
        let reference = baseline.target_kcal as f64;
        reference > 0.0 && ((kcal - reference).abs() / reference) <= self.config.kcal_tolerance
    }
}
