use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use serde::Serialize;

use crate::adaptive::config::EngineConfig;
use crate::adaptive::decision::{DecisionError, DecisionSource, LocalPolicy, RemoteDecisionClient};
use crate::adaptive::types::{Decision, DecisionInput, DecisionResult, Provenance};

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayStats {
    pub remote: u64,
    pub local: u64,
    pub fallbacks: u64,
    pub last_provenance: Option<Provenance>,
}

/// Bounded-latency remote evaluation with a mandatory local fallback.
pub struct DecisionGateway {
    remote: Option<Arc<dyn DecisionSource>>,
    local: LocalPolicy,
    timeout: Duration,
    remote_count: AtomicU64,
    local_count: AtomicU64,
    fallback_count: AtomicU64,
    last_provenance: RwLock<Option<Provenance>>,
}

impl DecisionGateway {
    pub fn new(remote: Option<Arc<dyn DecisionSource>>, local: LocalPolicy, timeout: Duration) -> Self {
        Self {
            remote,
            local,
            timeout,
            remote_count: AtomicU64::new(0),
            local_count: AtomicU64::new(0),
            fallback_count: AtomicU64::new(0),
            last_provenance: RwLock::new(None),
        }
    }

    pub fn local_only(local: LocalPolicy) -> Self {
        Self::new(None, local, Duration::ZERO)
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        let local = LocalPolicy::new(config.frustration.clone(), config.policy.clone());
        let remote = config.gateway.service_url.as_ref().map(|url| {
            Arc::new(RemoteDecisionClient::new(url.clone(), config.gateway.timeout))
                as Arc<dyn DecisionSource>
        });
        Self::new(remote, local, config.gateway.timeout)
    }

    pub fn has_remote(&self) -> bool {
        self.remote.is_some()
    }

    /// Always yields a result; remote failures degrade to the local policy.
    pub async fn decide(&self, input: &DecisionInput) -> DecisionResult {
        if let Some(remote) = &self.remote {
            let started = Instant::now();
            match self.call_remote(remote.as_ref(), input).await {
                Ok(decision) => {
                    self.record(Provenance::Remote);
                    return DecisionResult {
                        decision,
                        provenance: Provenance::Remote,
                    };
                }
                Err(err) => {
                    self.fallback_count.fetch_add(1, Ordering::Relaxed);
                    tracing::warn!(
                        source = remote.name(),
                        error = %err,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "remote decision unavailable, using local policy"
                    );
                }
            }
        }

        self.record(Provenance::Local);
        DecisionResult {
            decision: self.local.evaluate(input),
            provenance: Provenance::Local,
        }
    }

    async fn call_remote(
        &self,
        remote: &dyn DecisionSource,
        input: &DecisionInput,
    ) -> Result<Decision, DecisionError> {
        match tokio::time::timeout(self.timeout, remote.decide(input)).await {
            Ok(result) => result,
            Err(_) => Err(DecisionError::Timeout(self.timeout.as_millis() as u64)),
        }
    }

    fn record(&self, provenance: Provenance) {
        match provenance {
            Provenance::Remote => self.remote_count.fetch_add(1, Ordering::Relaxed),
            Provenance::Local => self.local_count.fetch_add(1, Ordering::Relaxed),
        };
        *self.last_provenance.write() = Some(provenance);
    }

    pub fn last_provenance(&self) -> Option<Provenance> {
        *self.last_provenance.read()
    }

    pub fn stats(&self) -> GatewayStats {
        GatewayStats {
            remote: self.remote_count.load(Ordering::Relaxed),
            local: self.local_count.load(Ordering::Relaxed),
            fallbacks: self.fallback_count.load(Ordering::Relaxed),
            last_provenance: self.last_provenance(),
        }
    }
}
