use std::sync::Arc;

use anyhow::Context;
use tower_http::trace::TraceLayer;

use fit_coach::channels::{Channel, CliChannel, TelegramChannel};
use fit_coach::coach::{self, Coach, CoachRouter, StatusState, status_routes};
use fit_coach::config::{
    LlmConfig, PlanConfig, QueueConfig, ReportConfig, StatusServerConfig, TelegramConfig,
};
use fit_coach::delivery::{OutboundQueue, Transport};
use fit_coach::llm::create_provider;
use fit_coach::onboarding::{OnboardingManager, QuestionGraph, catalog};
use fit_coach::plan::PlanGenerator;
use fit_coach::store::MemoryStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let queue_config = QueueConfig::from_env();
    let plan_config = PlanConfig::from_env();
    let report_config = ReportConfig::from_env();

    eprintln!("🏋️ Fit Coach v{}", env!("CARGO_PKG_VERSION"));

    // ── Language model ───────────────────────────────────────────────────
    let llm = LlmConfig::from_env().map(|config| {
        eprintln!("   Plan model: {}", config.model);
        create_provider(&config)
    });
    if llm.is_none() {
        eprintln!("   Plan model: none (OPENAI_API_KEY not set), calculated plans only");
    }

    // ── Channel ──────────────────────────────────────────────────────────
    let (channel, transport): (Arc<dyn Channel>, Arc<dyn Transport>) =
        match TelegramConfig::from_env() {
            Some(config) => {
                eprintln!(
                    "   Telegram: enabled (allowed: {})",
                    if config.allowed_users.iter().any(|u| u == "*") {
                        "everyone".to_string()
                    } else {
                        config.allowed_users.join(", ")
                    }
                );
                let telegram = Arc::new(TelegramChannel::from_config(&config));
                (telegram.clone() as Arc<dyn Channel>, telegram as Arc<dyn Transport>)
            }
            None => {
                eprintln!("   Channel: cli (set TELEGRAM_BOT_TOKEN for Telegram)");
                eprintln!("   Type /start and press Enter. Numbers press buttons.\n");
                let cli = Arc::new(CliChannel::new());
                (cli.clone() as Arc<dyn Channel>, cli as Arc<dyn Transport>)
            }
        };

    // ── Core ─────────────────────────────────────────────────────────────
    let store = Arc::new(MemoryStore::new());
    let graph = QuestionGraph::new(catalog::default_questions())
        .context("built-in questionnaire is inconsistent")?;
    eprintln!("   Questionnaire: {} questions", graph.len());

    let onboarding = Arc::new(OnboardingManager::new(Arc::new(graph), store.clone()));
    let outbound = Arc::new(OutboundQueue::new(transport, &queue_config));
    let coach = Arc::new(Coach::new(
        onboarding.clone(),
        store.clone(),
        outbound,
        PlanGenerator::new(llm, plan_config),
        report_config,
    ));
    let router = Arc::new(CoachRouter::new(coach, queue_config.lane_idle_timeout));

    // ── Status server ────────────────────────────────────────────────────
    if let Some(status) = StatusServerConfig::from_env()? {
        let app = status_routes(StatusState {
            onboarding,
            profiles: store,
        })
        .layer(TraceLayer::new_for_http());
        let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", status.port))
            .await
            .with_context(|| format!("failed to bind status port {}", status.port))?;
        eprintln!("   Status API: http://0.0.0.0:{}/healthz", status.port);
        tokio::spawn(async move {
            tracing::info!(port = status.port, "Status server started");
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!(error = %e, "Status server stopped");
            }
        });
    }

    coach::run(channel, router).await?;

    Ok(())
}
