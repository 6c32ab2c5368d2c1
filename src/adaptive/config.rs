use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrustrationWeights {
    pub error: f64,
    pub hint: f64,
    pub retry: f64,
    pub latency: f64,
    pub perseveration: f64,
}

impl Default for FrustrationWeights {
    fn default() -> Self {
        Self {
            error: 0.35,
            hint: 0.20,
            retry: 0.15,
            latency: 0.20,
            perseveration: 0.10,
        }
    }
}

impl FrustrationWeights {
    pub fn total(&self) -> f64 {
        self.error + self.hint + self.retry + self.latency + self.perseveration
    }
}

/// Divisors that map raw trial signals onto [0, 1].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrustrationNorms {
    pub max_errors: f64,
    pub max_hints: f64,
    pub max_retries: f64,
    pub latency_floor_secs: f64,
    pub latency_span_secs: f64,
    pub max_perseveration: f64,
}

impl Default for FrustrationNorms {
    fn default() -> Self {
        Self {
            max_errors: 3.0,
            max_hints: 2.0,
            max_retries: 2.0,
            latency_floor_secs: 3.0,
            latency_span_secs: 9.0,
            max_perseveration: 2.0,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FrustrationParams {
    pub weights: FrustrationWeights,
    pub norms: FrustrationNorms,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyThresholds {
    pub support: f64,
    pub ease: f64,
    pub ease_streak: u32,
    pub levelup_streak: u32,
}

impl Default for PolicyThresholds {
    fn default() -> Self {
        Self {
            support: 0.35,
            ease: 0.65,
            ease_streak: 2,
            levelup_streak: 3,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub service_url: Option<String>,
    pub timeout: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            service_url: None,
            timeout: Duration::from_millis(800),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SessionTiming {
    pub feedback_delay: Duration,
    pub highlight_clear_delay: Duration,
}

impl Default for SessionTiming {
    fn default() -> Self {
        Self {
            feedback_delay: Duration::from_millis(700),
            highlight_clear_delay: Duration::from_millis(700),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AttemptLogConfig {
    pub capacity: usize,
    pub store_dir: PathBuf,
}

impl Default for AttemptLogConfig {
    fn default() -> Self {
        Self {
            capacity: 100,
            store_dir: PathBuf::from("./data"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub frustration: FrustrationParams,
    pub policy: PolicyThresholds,
    pub gateway: GatewayConfig,
    pub timing: SessionTiming,
    pub attempt_log: AttemptLogConfig,
    pub content_path: Option<PathBuf>,
    /// Serve the local policy over HTTP as a decision service.
    pub decision_endpoint: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            frustration: FrustrationParams::default(),
            policy: PolicyThresholds::default(),
            gateway: GatewayConfig::default(),
            timing: SessionTiming::default(),
            attempt_log: AttemptLogConfig::default(),
            content_path: None,
            decision_endpoint: true,
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        config.gateway.service_url = env_string("DECISION_SERVICE_URL");
        if let Some(ms) = env_u64("DECISION_TIMEOUT_MS") {
            config.gateway.timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = env_u64("FEEDBACK_DELAY_MS") {
            config.timing.feedback_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = env_u64("HIGHLIGHT_CLEAR_MS") {
            config.timing.highlight_clear_delay = Duration::from_millis(ms);
        }
        if let Some(cap) = env_u64("ATTEMPT_LOG_CAP").filter(|v| *v > 0) {
            config.attempt_log.capacity = cap as usize;
        }
        if let Some(dir) = env_string("STORE_DIR") {
            config.attempt_log.store_dir = PathBuf::from(dir);
        }
        config.content_path = env_string("CONTENT_PATH").map(PathBuf::from);
        if let Some(enabled) = env_bool("ENABLE_DECISION_SERVICE") {
            config.decision_endpoint = enabled;
        }

        config
    }
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_u64(key: &str) -> Option<u64> {
    env_string(key)?.trim().parse().ok()
}

fn env_bool(key: &str) -> Option<bool> {
    parse_bool(&env_string(key)?)
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
