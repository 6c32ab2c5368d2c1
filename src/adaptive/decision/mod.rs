pub mod gateway;
pub mod policy;
pub mod remote;

use async_trait::async_trait;
use thiserror::Error;

use crate::adaptive::types::{Decision, DecisionInput};

pub use gateway::{DecisionGateway, GatewayStats};
pub use policy::LocalPolicy;
pub use remote::RemoteDecisionClient;

#[derive(Debug, Error)]
pub enum DecisionError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("HTTP {status}: {body}")]
    HttpStatus {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("JSON decode failed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("malformed decision: {0}")]
    Malformed(String),
    #[error("timed out after {0}ms")]
    Timeout(u64),
}

/// Anything that can evaluate the decision policy for one trial.
#[async_trait]
pub trait DecisionSource: Send + Sync {
    async fn decide(&self, input: &DecisionInput) -> Result<Decision, DecisionError>;

    fn name(&self) -> &'static str;
}
