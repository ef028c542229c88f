//! Coach router — turns inbound events into interview steps, plans and
//! reports.
//!
//! Events are serialized per conversation through a lane, so one user's
//! messages are handled strictly one after another while other users are
//! served concurrently. Button presses are acknowledged and deduplicated
//! before they enter the lane.

use std::sync::{Arc, LazyLock};
use std::time::Duration;

use chrono::Utc;
use futures::{FutureExt, StreamExt};
use regex::Regex;
use tracing::{debug, error, info, warn};

use crate::channels::{Channel, EventKind, InboundEvent};
use crate::config::ReportConfig;
use crate::conversation::ConversationId;
use crate::delivery::{DeliveryTask, InteractionAck, OutboundMessage, OutboundQueue, parse_pick};
use crate::error::{ChannelError, Result, SessionError};
use crate::lanes::{LaneHandler, Lanes};
use crate::onboarding::{
    AnswerSet, CoachProfile, OnboardingManager, Prompt, RawInput, Step, Submission,
};
use crate::plan::PlanGenerator;
use crate::store::ProfileStore;

use super::render::{self, BUILD_PLAN};
use super::reports::ReportOutcome;

/// Menu commands recognized in free text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Onboarding,
    Cancel,
    ShowPlan,
    Report,
    Home,
}

static COMMANDS: LazyLock<Vec<(Regex, Command)>> = LazyLock::new(|| {
    [
        (r"^(?:/start|старт)$", Command::Start),
        (r"^(?:/onboarding|/anketa|анкета|🧭\s*анкета)$", Command::Onboarding),
        (r"^/cancel$", Command::Cancel),
        (r"^(?:📅\s*план|план|/plan)$", Command::ShowPlan),
        (r"^(?:📝\s*отч[её]т|отч[её]т|/report)$", Command::Report),
        (r"^(?:🏠\s*главное\s*меню|главное\s*меню|меню|/menu)$", Command::Home),
    ]
    .into_iter()
    .filter_map(|(pattern, command)| {
        Regex::new(&format!("(?i){pattern}"))
            .map(|re| (re, command))
            .map_err(|e| error!(pattern, error = %e, "Invalid command pattern"))
            .ok()
    })
    .collect()
});

impl Command {
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        // Telegram appends the bot name in groups: /start@my_bot
        let text = match text.split_once('@') {
            Some((command, _)) if command.starts_with('/') => command,
            _ => text,
        };
        COMMANDS
            .iter()
            .find(|(re, _)| re.is_match(text))
            .map(|(_, command)| *command)
    }
}

/// Handles one event at a time for a conversation.
pub struct Coach {
    onboarding: Arc<OnboardingManager>,
    profiles: Arc<dyn ProfileStore>,
    outbound: Arc<OutboundQueue>,
    plans: PlanGenerator,
    reports: ReportConfig,
}

impl Coach {
    pub fn new(
        onboarding: Arc<OnboardingManager>,
        profiles: Arc<dyn ProfileStore>,
        outbound: Arc<OutboundQueue>,
        plans: PlanGenerator,
        reports: ReportConfig,
    ) -> Self {
        Self {
            onboarding,
            profiles,
            outbound,
            plans,
            reports,
        }
    }

    pub fn outbound(&self) -> &Arc<OutboundQueue> {
        &self.outbound
    }

    /// Process one event. Failures are logged and reported to the user.
    pub async fn handle(&self, event: InboundEvent) {
        let conversation = event.conversation.clone();
        if let Err(e) = self.route(event).await {
            error!(conversation = %conversation, error = %e, "Event handling failed");
            self.reply(&conversation, [render::internal_error()]);
        }
    }

    async fn route(&self, event: InboundEvent) -> Result<()> {
        let conversation = event.conversation;
        match event.kind {
            EventKind::Text(text) => match Command::parse(&text) {
                Some(command) => {
                    debug!(conversation = %conversation, ?command, "Command");
                    self.command(&conversation, command).await
                }
                None => self.free_text(&conversation, text).await,
            },
            EventKind::Interaction { data, .. } => self.interaction(&conversation, &data).await,
        }
    }

    async fn command(&self, conversation: &ConversationId, command: Command) -> Result<()> {
        match command {
            Command::Start => {
                let profile = self.profile(conversation).await?;
                self.reply(conversation, [render::welcome(profile.display_name())]);
            }
            Command::Onboarding => self.start_onboarding(conversation).await?,
            Command::Cancel => {
                let existed = self.onboarding.cancel(conversation).await?;
                self.reply(conversation, [render::cancelled(existed)]);
            }
            Command::ShowPlan => {
                let profile = self.profile(conversation).await?;
                let mut messages = Vec::with_capacity(2);
                match (&profile.plan, &profile.answers) {
                    (Some(plan), _) => {
                        messages.push(render::plan(plan));
                        if !plan.period().contains(Utc::now()) {
                            messages.push(render::plan_expired());
                        }
                    }
                    (None, Some(_)) => messages.push(render::onboarding_done()),
                    (None, None) => messages.push(render::needs_onboarding()),
                }
                self.reply(conversation, messages);
            }
            Command::Report => self.open_report(conversation).await?,
            Command::Home => {
                let mut profile = self.profile(conversation).await?;
                if profile.awaiting_report {
                    profile.awaiting_report = false;
                    self.profiles.put_profile(conversation, profile.clone()).await?;
                }
                self.reply(conversation, [render::home(profile.has_plan())]);
            }
        }
        Ok(())
    }

    async fn free_text(&self, conversation: &ConversationId, text: String) -> Result<()> {
        if self.onboarding.is_active(conversation).await? {
            let submission = self
                .onboarding
                .submit_answer(conversation, RawInput::Text(text))
                .await?;
            return self.after_submission(conversation, submission).await;
        }

        let profile = self.profile(conversation).await?;
        if profile.awaiting_report {
            return self.record_report(conversation, profile, text).await;
        }

        self.reply(conversation, [render::not_understood()]);
        Ok(())
    }

    async fn interaction(&self, conversation: &ConversationId, data: &str) -> Result<()> {
        if data == BUILD_PLAN {
            return self.build_plan(conversation).await;
        }

        let Some((key, index)) = parse_pick(data) else {
            debug!(conversation = %conversation, data, "Unknown interaction ignored");
            return Ok(());
        };

        match self.onboarding.submit_selection(conversation, key, index).await {
            Ok(submission) => self.after_submission(conversation, submission).await,
            Err(SessionError::StaleSelection { .. } | SessionError::NoActiveSession(_)) => {
                debug!(conversation = %conversation, key, "Stale selection");
                self.reply(conversation, [render::stale_selection()]);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn start_onboarding(&self, conversation: &ConversationId) -> Result<()> {
        match self.onboarding.start(conversation).await {
            Ok(step) => self.present(conversation, step).await,
            Err(SessionError::AlreadyInProgress(_)) => {
                let mut messages = vec![render::onboarding_already_running()];
                if let Some(question) = self.onboarding.current_question(conversation).await? {
                    messages.extend(render::question(&Prompt {
                        question,
                        opens_section: false,
                    }));
                }
                self.reply(conversation, messages);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn after_submission(
        &self,
        conversation: &ConversationId,
        submission: Submission,
    ) -> Result<()> {
        match submission {
            Submission::Accepted(step) => self.present(conversation, step).await,
            Submission::Rejected { error, question } => {
                self.reply(conversation, render::rejected(&error, &question));
                Ok(())
            }
        }
    }

    async fn present(&self, conversation: &ConversationId, step: Step) -> Result<()> {
        match step {
            Step::NextQuestion(prompt) => {
                self.reply(conversation, render::question(&prompt));
                Ok(())
            }
            Step::Finished(answers) => self.finish_onboarding(conversation, answers).await,
        }
    }

    async fn finish_onboarding(&self, conversation: &ConversationId, answers: AnswerSet) -> Result<()> {
        let mut profile = self.profile(conversation).await?;
        profile.complete_onboarding(answers, Utc::now());
        self.profiles.put_profile(conversation, profile).await?;
        self.reply(conversation, [render::onboarding_done()]);
        Ok(())
    }

    async fn build_plan(&self, conversation: &ConversationId) -> Result<()> {
        let mut profile = self.profile(conversation).await?;
        let Some(answers) = profile.answers.clone() else {
            self.reply(conversation, [render::needs_onboarding()]);
            return Ok(());
        };

        self.reply_once(conversation, &format!("{BUILD_PLAN}:notice"), render::building_plan());
        let plan = self.plans.generate(&answers).await;
        info!(
            conversation = %conversation,
            model_enriched = plan.is_model_enriched(),
            "Plan ready"
        );

        let message = render::plan(&plan);
        profile.plan = Some(plan);
        self.profiles.put_profile(conversation, profile).await?;
        self.reply_once(conversation, &format!("{BUILD_PLAN}:plan"), message);
        Ok(())
    }

    async fn open_report(&self, conversation: &ConversationId) -> Result<()> {
        let mut profile = self.profile(conversation).await?;
        if profile.answers.is_none() {
            self.reply(conversation, [render::needs_onboarding()]);
            return Ok(());
        }

        let limit = self.reports.daily_limit;
        let remaining = profile.reports.remaining(Utc::now().date_naive(), limit);
        if remaining == 0 {
            self.reply(conversation, [render::report_limit_reached(limit)]);
            return Ok(());
        }

        profile.awaiting_report = true;
        self.profiles.put_profile(conversation, profile).await?;
        self.reply(conversation, [render::report_prompt(remaining, limit)]);
        Ok(())
    }

    async fn record_report(
        &self,
        conversation: &ConversationId,
        mut profile: CoachProfile,
        text: String,
    ) -> Result<()> {
        let limit = self.reports.daily_limit;
        profile.awaiting_report = false;
        let message = match profile.reports.record(text, Utc::now(), limit) {
            ReportOutcome::Recorded { remaining } => {
                info!(conversation = %conversation, remaining, "Workout report saved");
                render::report_saved(remaining, limit)
            }
            ReportOutcome::LimitReached => render::report_limit_reached(limit),
        };
        self.profiles.put_profile(conversation, profile).await?;
        self.reply(conversation, [message]);
        Ok(())
    }

    async fn profile(&self, conversation: &ConversationId) -> Result<CoachProfile> {
        Ok(self
            .profiles
            .get_profile(conversation)
            .await?
            .unwrap_or_default())
    }

    fn reply(&self, conversation: &ConversationId, messages: impl IntoIterator<Item = OutboundMessage>) {
        for message in messages {
            // Failures are logged by the queue.
            let _ = self.outbound.send(conversation, message);
        }
    }

    /// Send `message` unless the same tag went out within the dedup window.
    fn reply_once(&self, conversation: &ConversationId, tag: &str, message: OutboundMessage) {
        let task = DeliveryTask::new(conversation.clone(), message).tagged(tag);
        let _ = self.outbound.enqueue(task);
    }
}

/// Fans inbound events out to per-conversation lanes.
pub struct CoachRouter {
    coach: Arc<Coach>,
    lanes: Lanes<ConversationId, InboundEvent>,
}

impl CoachRouter {
    pub fn new(coach: Arc<Coach>, idle_timeout: Duration) -> Self {
        let worker = Arc::clone(&coach);
        let handler: LaneHandler<ConversationId, InboundEvent> = Arc::new(move |_, event| {
            let coach = Arc::clone(&worker);
            async move { coach.handle(event).await }.boxed()
        });

        Self {
            coach,
            lanes: Lanes::new(idle_timeout, handler),
        }
    }

    /// Accept one event. Button presses are acknowledged here; repeats of a
    /// press inside the dedup window go no further.
    pub async fn dispatch(&self, event: InboundEvent) {
        if let EventKind::Interaction {
            interaction_id,
            data,
        } = &event.kind
        {
            let ack = InteractionAck {
                interaction_id: interaction_id.clone(),
                text: None,
            };
            if self
                .coach
                .outbound()
                .acknowledge_interaction(&event.conversation, data, &ack)
                .await
            {
                return;
            }
        }

        self.lanes.submit(event.conversation.clone(), event);
    }
}

/// Pump a channel's events into the router until the stream ends.
pub async fn run(channel: Arc<dyn Channel>, router: Arc<CoachRouter>) -> std::result::Result<(), ChannelError> {
    channel.health_check().await?;
    let mut events = channel.start().await?;
    info!(channel = channel.name(), "Channel started");

    while let Some(event) = events.next().await {
        router.dispatch(event).await;
    }

    warn!(channel = channel.name(), "Channel stream ended");
    channel.shutdown().await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands_are_case_insensitive() {
        assert_eq!(Command::parse("/start"), Some(Command::Start));
        assert_eq!(Command::parse("Старт"), Some(Command::Start));
        assert_eq!(Command::parse("АНКЕТА"), Some(Command::Onboarding));
        assert_eq!(Command::parse("🧭 Анкета"), Some(Command::Onboarding));
        assert_eq!(Command::parse(" /cancel "), Some(Command::Cancel));
    }

    #[test]
    fn menu_buttons_are_commands() {
        assert_eq!(Command::parse(render::MENU_PLAN), Some(Command::ShowPlan));
        assert_eq!(Command::parse(render::MENU_REPORT), Some(Command::Report));
        assert_eq!(Command::parse(render::MENU_HOME), Some(Command::Home));
        assert_eq!(Command::parse("отчет"), Some(Command::Report));
    }

    #[test]
    fn bot_suffix_is_ignored() {
        assert_eq!(Command::parse("/start@fit_coach_bot"), Some(Command::Start));
    }

    #[test]
    fn answers_are_not_commands() {
        for text in ["Аня", "82,5", "план на неделю", "Да", "-"] {
            assert_eq!(Command::parse(text), None, "{text}");
        }
    }
}
