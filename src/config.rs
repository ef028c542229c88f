//! Configuration types.
//!
//! Every struct has a `Default` matching production behavior and a
//! `from_env()` constructor that overrides individual fields.

use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.trim().parse().ok())
}

/// Outbound delivery pacing and retry policy.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Pause after every successful send to the same conversation.
    pub min_interval: Duration,
    /// Added on top of the platform's retry-after hint.
    pub rate_limit_margin: Duration,
    /// Total send attempts per message while rate limited.
    pub max_attempts: u32,
    /// Repeated taps of the same button inside this window are duplicates.
    pub dedup_window: Duration,
    /// A conversation lane with no work for this long is torn down.
    pub lane_idle_timeout: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            min_interval: Duration::from_millis(1300),
            rate_limit_margin: Duration::from_millis(300),
            max_attempts: 3,
            dedup_window: Duration::from_millis(800),
            lane_idle_timeout: Duration::from_secs(300),
        }
    }
}

impl QueueConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            min_interval: env_parse("COACH_SEND_INTERVAL_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.min_interval),
            rate_limit_margin: env_parse("COACH_RATE_LIMIT_MARGIN_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.rate_limit_margin),
            max_attempts: env_parse("COACH_SEND_MAX_ATTEMPTS")
                .filter(|n: &u32| *n > 0)
                .unwrap_or(defaults.max_attempts),
            dedup_window: env_parse("COACH_DEDUP_WINDOW_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.dedup_window),
            lane_idle_timeout: env_parse("COACH_LANE_IDLE_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.lane_idle_timeout),
        }
    }
}

/// Plan generation policy.
#[derive(Debug, Clone)]
pub struct PlanConfig {
    /// Upper bound on a single language-model call.
    pub llm_timeout: Duration,
    /// Allowed relative deviation of the model's calorie target from the
    /// calculated one before the model plan is discarded.
    pub kcal_tolerance: f64,
    /// Length of the plan period.
    pub period_days: i64,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for PlanConfig {
    fn default() -> Self {
        Self {
            llm_timeout: Duration::from_secs(60),
            kcal_tolerance: 0.25,
            period_days: 30,
            temperature: 0.3,
            max_tokens: 4096,
        }
    }
}

/// Longest plan period accepted from the environment.
pub const MAX_PLAN_DAYS: i64 = 366;

fn valid_period_days(days: &i64) -> bool {
    (1..=MAX_PLAN_DAYS).contains(days)
}

impl PlanConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            llm_timeout: env_parse("COACH_LLM_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.llm_timeout),
            kcal_tolerance: env_parse("COACH_KCAL_TOLERANCE")
                .filter(|t: &f64| *t >= 0.0)
                .unwrap_or(defaults.kcal_tolerance),
            period_days: env_parse("COACH_PLAN_DAYS")
                .filter(valid_period_days)
                .unwrap_or(defaults.period_days),
            ..defaults
        }
    }
}

/// Language-model connection settings. Absent key means no model is used.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: SecretString,
    pub model: String,
    pub base_url: String,
}

impl LlmConfig {
    pub fn from_env() -> Option<Self> {
        let api_key = std::env::var("OPENAI_API_KEY").ok().filter(|k| !k.is_empty())?;
        Some(Self {
            api_key: SecretString::from(api_key),
            model: std::env::var("OPENAI_MODEL_PLAN").unwrap_or_else(|_| "gpt-4o".to_string()),
            base_url: std::env::var("OPENAI_BASE_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
        })
    }
}

/// Telegram bot settings.
#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub allowed_users: Vec<String>,
}

impl TelegramConfig {
    pub fn from_env() -> Option<Self> {
        let bot_token = std::env::var("TELEGRAM_BOT_TOKEN")
            .or_else(|_| std::env::var("BOT_TOKEN"))
            .ok()
            .filter(|t| !t.is_empty())?;

        let allowed_users: Vec<String> = std::env::var("TELEGRAM_ALLOWED_USERS")
            .unwrap_or_else(|_| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Some(Self {
            bot_token,
            allowed_users,
        })
    }
}

/// Workout report limits.
#[derive(Debug, Clone)]
pub struct ReportConfig {
    pub daily_limit: u32,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self { daily_limit: 10 }
    }
}

impl ReportConfig {
    pub fn from_env() -> Self {
        Self {
            daily_limit: env_parse("COACH_DAILY_REPORT_LIMIT").unwrap_or(10),
        }
    }
}

/// Local HTTP status server.
#[derive(Debug, Clone)]
pub struct StatusServerConfig {
    pub port: u16,
}

impl StatusServerConfig {
    pub fn from_env() -> Result<Option<Self>, ConfigError> {
        match std::env::var("COACH_STATUS_PORT") {
            Ok(raw) => raw
                .trim()
                .parse()
                .map(|port| Some(Self { port }))
                .map_err(|_| ConfigError::InvalidValue {
                    key: "COACH_STATUS_PORT".to_string(),
                    message: format!("'{raw}' is not a port number"),
                }),
            Err(_) => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queue_defaults_match_platform_limits() {
        let cfg = QueueConfig::default();
        assert_eq!(cfg.min_interval, Duration::from_millis(1300));
        assert_eq!(cfg.rate_limit_margin, Duration::from_millis(300));
        assert_eq!(cfg.max_attempts, 3);
        assert_eq!(cfg.dedup_window, Duration::from_millis(800));
    }

    #[test]
    fn plan_defaults() {
        let cfg = PlanConfig::default();
        assert_eq!(cfg.period_days, 30);
        assert!((cfg.kcal_tolerance - 0.25).abs() < f64::EPSILON);
    }

    #[test]
    fn plan_days_are_bounded() {
        assert!(valid_period_days(&1));
        assert!(valid_period_days(&MAX_PLAN_DAYS));
        assert!(!valid_period_days(&0));
        assert!(!valid_period_days(&-7));
        assert!(!valid_period_days(&(MAX_PLAN_DAYS + 1)));
        assert!(!valid_period_days(&i64::MAX));
    }

    #[test]
    fn report_default_limit() {
        assert_eq!(ReportConfig::default().daily_limit, 10);
    }
}
