use std::time::Duration;

use async_trait::async_trait;

use crate::adaptive::decision::{DecisionError, DecisionSource};
use crate::adaptive::types::{Decision, DecisionInput};

/// HTTP adapter for an external decision service speaking the same contract
/// as `LocalPolicy`.
#[derive(Clone)]
pub struct RemoteDecisionClient {
    endpoint: String,
    client: reqwest::Client,
}

impl RemoteDecisionClient {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|err| {
                tracing::warn!(error = %err, "failed to build decision client, using defaults");
                reqwest::Client::new()
            });

        Self {
            endpoint: endpoint.into().trim().to_string(),
            client,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl DecisionSource for RemoteDecisionClient {
    async fn decide(&self, input: &DecisionInput) -> Result<Decision, DecisionError> {
        let resp = self.client.post(&self.endpoint).json(input).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(DecisionError::HttpStatus { status, body });
        }

        let bytes = resp.bytes().await?;
        let decision: Decision = serde_json::from_slice(&bytes)?;
        validate(&decision)?;
        Ok(decision)
    }

    fn name(&self) -> &'static str {
        "remote"
    }
}

fn validate(decision: &Decision) -> Result<(), DecisionError> {
    if !(0.0..=1.0).contains(&decision.frustration) {
        return Err(DecisionError::Malformed(format!(
            "frustration {} outside [0, 1]",
            decision.frustration
        )));
    }
    if !decision.frustration_components.in_unit_range() {
        return Err(DecisionError::Malformed(
            "frustration component outside [0, 1]".to_string(),
        ));
    }
    Ok(())
}
