//! End-to-end: events in through the coach, messages out through a
//! recording transport.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use fit_coach::channels::InboundEvent;
use fit_coach::coach::render::BUILD_PLAN;
use fit_coach::coach::{Coach, CoachRouter};
use fit_coach::config::{PlanConfig, QueueConfig, ReportConfig};
use fit_coach::conversation::ConversationId;
use fit_coach::delivery::{
    InteractionAck, OutboundMessage, OutboundQueue, ReplyControls, Transport, pick_data,
};
use fit_coach::error::{LlmError, TransportError};
use fit_coach::llm::{CompletionRequest, CompletionResponse, FinishReason, LlmProvider};
use fit_coach::onboarding::catalog::{goals, keys};
use fit_coach::onboarding::{
    AnswerSet, AnswerValue, CoachProfile, OnboardingManager, QuestionDefinition, QuestionGraph,
    QuestionKind, catalog,
};
use fit_coach::plan::{ActivePlan, PlanGenerator};
use fit_coach::store::{MemoryStore, ProfileStore};

#[derive(Default)]
struct RecordingTransport {
    messages: Mutex<Vec<OutboundMessage>>,
    acks: Mutex<Vec<InteractionAck>>,
}

impl RecordingTransport {
    fn texts(&self) -> Vec<String> {
        self.messages
            .lock()
            .unwrap()
            .iter()
            .map(|m| m.text.clone())
            .collect()
    }

    fn last(&self) -> Option<OutboundMessage> {
        self.messages.lock().unwrap().last().cloned()
    }

    fn clear(&self) {
        self.messages.lock().unwrap().clear();
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn send(
        &self,
        _conversation: &ConversationId,
        message: &OutboundMessage,
    ) -> Result<(), TransportError> {
        self.messages.lock().unwrap().push(message.clone());
        Ok(())
    }

    async fn acknowledge(&self, ack: &InteractionAck) -> Result<(), TransportError> {
        self.acks.lock().unwrap().push(ack.clone());
        Ok(())
    }
}

struct CannedLlm(String);

#[async_trait]
impl LlmProvider for CannedLlm {
    fn model_name(&self) -> &str {
        "canned"
    }

    async fn complete(&self, _request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        Ok(CompletionResponse {
            content: self.0.clone(),
            input_tokens: 0,
            output_tokens: 0,
            finish_reason: FinishReason::Stop,
        })
    }
}

struct Harness {
    coach: Arc<Coach>,
    transport: Arc<RecordingTransport>,
    store: Arc<MemoryStore>,
    onboarding: Arc<OnboardingManager>,
    queue: QueueConfig,
}

fn harness(llm_reply: Option<&str>, reports: ReportConfig) -> Harness {
    let transport = Arc::new(RecordingTransport::default());
    let store = Arc::new(MemoryStore::new());
    let graph = QuestionGraph::new(catalog::default_questions()).unwrap();
    let onboarding = Arc::new(OnboardingManager::new(Arc::new(graph), store.clone()));

    let queue = QueueConfig {
        min_interval: Duration::ZERO,
        rate_limit_margin: Duration::ZERO,
        max_attempts: 3,
        dedup_window: Duration::from_millis(800),
        lane_idle_timeout: Duration::from_secs(1),
    };
    let outbound = Arc::new(OutboundQueue::new(transport.clone(), &queue));

    let llm = llm_reply.map(|r| Arc::new(CannedLlm(r.to_string())) as Arc<dyn LlmProvider>);
    let plans = PlanGenerator::new(llm, PlanConfig::default());

    let coach = Arc::new(Coach::new(
        onboarding.clone(),
        store.clone(),
        outbound,
        plans,
        reports,
    ));

    Harness {
        coach,
        transport,
        store,
        onboarding,
        queue,
    }
}

fn conv() -> ConversationId {
    ConversationId::from("1001")
}

fn text(s: &str) -> InboundEvent {
    InboundEvent::text(conv(), "ira", s)
}

fn press(data: String) -> InboundEvent {
    InboundEvent::interaction(conv(), "ira", uuid::Uuid::new_v4().to_string(), data)
}

/// Wait until the transport has seen a message satisfying `pred`.
async fn wait_for(transport: &RecordingTransport, pred: impl Fn(&[String]) -> bool) {
    for _ in 0..400 {
        if pred(&transport.texts()) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("expected message never arrived; got {:?}", transport.texts());
}

/// The event a user following the happy path would send for `question`.
fn reply_to(question: &QuestionDefinition) -> InboundEvent {
    let typed = match question.key.as_str() {
        keys::NAME => Some("Ира"),
        keys::AGE => Some("30"),
        keys::HEIGHT_CM => Some("180"),
        keys::WEIGHT_KG => Some("82,0"),
        keys::WEIGHT_LOSS_MONTH_KG => Some("2"),
        keys::DAYS_PER_WEEK => Some("3"),
        keys::EQUIPMENT => Some("зал"),
        keys::REMINDER_MODE => Some("off"),
        _ => None,
    };
    if let Some(typed) = typed {
        return text(typed);
    }

    match &question.kind {
        QuestionKind::SingleChoice { options, .. } => {
            let wanted = match question.key.as_str() {
                keys::GOAL => goals::LOSS,
                keys::STEPS_LEVEL => "5–8k",
                _ => options[0].as_str(),
            };
            let index = options.iter().position(|o| o == wanted).unwrap();
            press(pick_data(&question.key, index))
        }
        QuestionKind::Number { min, .. } => text(&min.unwrap_or(1.0).to_string()),
        QuestionKind::Text => text("-"),
    }
}

async fn complete_interview(h: &Harness) {
    h.coach.handle(text("/onboarding")).await;
    let mut steps = 0;
    while let Some(question) = h.onboarding.current_question(&conv()).await.unwrap() {
        h.coach.handle(reply_to(&question)).await;
        steps += 1;
        assert!(steps < 100, "interview does not terminate");
    }
}

async fn stored_profile(h: &Harness) -> CoachProfile {
    h.store.get_profile(&conv()).await.unwrap().unwrap()
}

#[tokio::test]
async fn interview_then_model_plan() {
    let reply = r#"Вот план:
{"nutrition": {"target_kcal": 2150},
 "training": {"days_per_week": 3},
 "rich_text": {"week_overview_html": "<b>Неделя 1</b><br>Пн: верх"}}"#;
    let h = harness(Some(reply), ReportConfig::default());

    complete_interview(&h).await;

    let profile = stored_profile(&h).await;
    let answers = profile.answers.as_ref().unwrap();
    assert_eq!(answers.number(keys::WEIGHT_KG), Some(82.0));
    assert_eq!(answers.str(keys::SEX), Some("М"));
    assert!(!answers.contains_key(keys::MEDICAL_DETAILS));
    assert!(!answers.contains_key(keys::PREGNANCY_STATUS));
    assert_eq!(answers.get(keys::INJURY_NOTES), Some(&AnswerValue::Null));
    assert_eq!(profile.reminder_mode.as_deref(), Some("Выключено"));

    wait_for(&h.transport, |t| t.iter().any(|m| m.starts_with("Анкета заполнена"))).await;
    match h.transport.last().unwrap().controls {
        ReplyControls::Actions(actions) => assert_eq!(actions[0].1, BUILD_PLAN),
        other => panic!("expected build button, got {other:?}"),
    }

    h.coach.handle(press(BUILD_PLAN.to_string())).await;
    wait_for(&h.transport, |t| t.iter().any(|m| m.contains("Неделя 1"))).await;

    let plan = stored_profile(&h).await.plan.unwrap();
    match plan {
        ActivePlan::ModelEnriched { plan, baseline, .. } => {
            assert_eq!(plan.target_kcal(), Some(2150.0));
            assert_eq!(baseline.target_kcal, 2097);
        }
        other => panic!("expected model plan, got {other:?}"),
    }
    assert!(h.transport.texts().iter().any(|m| m.contains("<b>Неделя 1</b>\nПн: верх")));
}

#[tokio::test]
async fn implausible_model_plan_is_discarded() {
    let h = harness(
        Some(r#"{"nutrition": {"target_kcal": 5200}}"#),
        ReportConfig::default(),
    );
    complete_interview(&h).await;

    h.coach.handle(press(BUILD_PLAN.to_string())).await;
    wait_for(&h.transport, |t| t.iter().any(|m| m.contains("Твой план"))).await;

    match stored_profile(&h).await.plan.unwrap() {
        ActivePlan::Calculated { targets, .. } => {
            assert_eq!(targets.resting_kcal, 1800);
            assert_eq!(targets.total_kcal, 2610);
            assert_eq!(targets.target_kcal, 2097);
            assert_eq!(targets.workout_template, vec!["Upper", "Lower", "Full"]);
        }
        other => panic!("expected calculated plan, got {other:?}"),
    }
}

#[tokio::test]
async fn invalid_number_asks_again() {
    let h = harness(None, ReportConfig::default());
    h.coach.handle(text("/onboarding")).await;
    h.coach.handle(text("Ира")).await;
    h.coach.handle(press(pick_data(keys::SEX, 0))).await;
    h.coach.handle(press(pick_data(keys::TIMEZONE, 0))).await;
    wait_for(&h.transport, |t| t.iter().any(|m| m == "Возраст (лет):")).await;

    h.transport.clear();
    h.coach.handle(text("тридцать")).await;
    wait_for(&h.transport, |t| t.len() >= 2).await;

    let texts = h.transport.texts();
    assert!(texts[0].contains("Нужно число от 14 до 90"), "{texts:?}");
    assert_eq!(texts[1], "Возраст (лет):");
    let current = h.onboarding.current_question(&conv()).await.unwrap().unwrap();
    assert_eq!(current.key, keys::AGE);

    h.coach.handle(text("12")).await;
    wait_for(&h.transport, |t| t.iter().any(|m| m.contains("минимум 14"))).await;
}

#[tokio::test]
async fn stale_button_press_changes_nothing() {
    let h = harness(None, ReportConfig::default());
    h.coach.handle(text("/onboarding")).await;
    h.coach.handle(text("Ира")).await;
    h.coach.handle(press(pick_data(keys::SEX, 1))).await;
    wait_for(&h.transport, |t| t.iter().any(|m| m.starts_with("Часовой пояс"))).await;

    h.transport.clear();
    h.coach.handle(press(pick_data(keys::SEX, 0))).await;
    wait_for(&h.transport, |t| t.iter().any(|m| m.contains("уже пройден"))).await;

    let session = h.onboarding.session(&conv()).await.unwrap().unwrap();
    assert_eq!(session.answers.str(keys::SEX), Some("Ж"));
    assert_eq!(session.answers.len(), 2);
}

#[tokio::test]
async fn second_start_keeps_progress() {
    let h = harness(None, ReportConfig::default());
    h.coach.handle(text("/onboarding")).await;
    h.coach.handle(text("Ира")).await;
    wait_for(&h.transport, |t| t.iter().any(|m| m == "Пол:")).await;

    h.transport.clear();
    h.coach.handle(text("анкета")).await;
    wait_for(&h.transport, |t| t.iter().any(|m| m == "Пол:")).await;
    assert!(h.transport.texts()[0].starts_with("Анкета уже идёт"));

    h.coach.handle(text("/cancel")).await;
    assert!(!h.onboarding.is_active(&conv()).await.unwrap());
    wait_for(&h.transport, |t| t.iter().any(|m| m.starts_with("Анкета отменена"))).await;
}

#[tokio::test]
async fn plan_before_onboarding_asks_for_it() {
    let h = harness(None, ReportConfig::default());
    h.coach.handle(text("📅 План")).await;
    wait_for(&h.transport, |t| t.iter().any(|m| m.starts_with("Сначала пройди анкету"))).await;

    h.coach.handle(press(BUILD_PLAN.to_string())).await;
    wait_for(&h.transport, |t| {
        t.iter().filter(|m| m.starts_with("Сначала пройди анкету")).count() == 2
    })
    .await;
}

#[tokio::test]
async fn reports_are_capped_per_day() {
    let h = harness(None, ReportConfig { daily_limit: 1 });
    let mut answers = AnswerSet::new();
    answers.insert(keys::NAME, AnswerValue::Text("Ира".into()));
    let mut profile = CoachProfile::default();
    profile.complete_onboarding(answers, Utc::now());
    h.store.put_profile(&conv(), profile).await.unwrap();

    h.coach.handle(text("📝 Отчёт")).await;
    wait_for(&h.transport, |t| t.iter().any(|m| m.contains("Осталось отчётов сегодня: 1/1"))).await;

    h.coach.handle(text("Присед 5x5 по 80, всё ок")).await;
    wait_for(&h.transport, |t| t.iter().any(|m| m.starts_with("Отчёт сохранён"))).await;

    let profile = stored_profile(&h).await;
    assert_eq!(profile.reports.entries.len(), 1);
    assert!(!profile.awaiting_report);

    h.coach.handle(text("отчет")).await;
    wait_for(&h.transport, |t| t.iter().any(|m| m.contains("лимит отчётов исчерпан"))).await;
    assert!(!stored_profile(&h).await.awaiting_report);
}

#[tokio::test]
async fn router_drops_repeated_press() {
    let h = harness(None, ReportConfig::default());
    let router = CoachRouter::new(h.coach.clone(), h.queue.lane_idle_timeout);

    router.dispatch(text("/onboarding")).await;
    router.dispatch(text("Ира")).await;
    wait_for(&h.transport, |t| t.iter().any(|m| m == "Пол:")).await;

    router.dispatch(press(pick_data(keys::SEX, 0))).await;
    router.dispatch(press(pick_data(keys::SEX, 0))).await;
    wait_for(&h.transport, |t| t.iter().any(|m| m.starts_with("Часовой пояс"))).await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(h.transport.acks.lock().unwrap().len(), 2);
    assert!(!h.transport.texts().iter().any(|m| m.contains("уже пройден")));
    let current = h.onboarding.current_question(&conv()).await.unwrap().unwrap();
    assert_eq!(current.key, keys::TIMEZONE);
}

#[tokio::test]
async fn expired_plan_offers_rebuild() {
    let h = harness(None, ReportConfig::default());
    let mut answers = AnswerSet::new();
    answers.insert(keys::WEIGHT_KG, AnswerValue::Number(70.0));
    let started = Utc::now() - chrono::Duration::days(45);
    let (targets, period) = fit_coach::plan::calculator::plan_at(&answers, started, 30);

    let mut profile = CoachProfile::default();
    profile.complete_onboarding(answers, started);
    profile.plan = Some(ActivePlan::Calculated { targets, period });
    h.store.put_profile(&conv(), profile).await.unwrap();

    h.coach.handle(text("план")).await;
    wait_for(&h.transport, |t| t.iter().any(|m| m.starts_with("Период этого плана закончился"))).await;
    assert!(h.transport.texts()[0].contains("Твой план"));
}

#[tokio::test]
async fn repeated_build_sends_plan_once() {
    let h = harness(None, ReportConfig::default());
    complete_interview(&h).await;
    wait_for(&h.transport, |t| t.iter().any(|m| m.starts_with("Анкета заполнена"))).await;
    h.transport.clear();

    // Straight into the coach, past the router's press dedup.
    h.coach.handle(press(BUILD_PLAN.to_string())).await;
    h.coach.handle(press(BUILD_PLAN.to_string())).await;
    wait_for(&h.transport, |t| t.iter().any(|m| m.contains("Твой план"))).await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    let texts = h.transport.texts();
    assert_eq!(texts.iter().filter(|m| m.starts_with("Собираю план")).count(), 1);
    assert_eq!(texts.iter().filter(|m| m.contains("Твой план")).count(), 1);
    assert!(stored_profile(&h).await.plan.is_some());
}
