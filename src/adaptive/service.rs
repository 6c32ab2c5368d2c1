use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::adaptive::attempt_log::AttemptLog;
use crate::adaptive::config::EngineConfig;
use crate::adaptive::decision::{DecisionGateway, GatewayStats};
use crate::adaptive::engine::{Advance, ChoiceOutcome, SessionEngine, SessionError, SessionSnapshot};
use crate::adaptive::export::{build_export, ExportDocument};
use crate::adaptive::persistence::AttemptLogRepository;
use crate::adaptive::rounds::{ContentTable, RoundGenerator};
use crate::adaptive::types::AttemptRecord;

/// Async shell around one `SessionEngine`.
///
/// Choices are serialized by the engine mutex; the attempt log lives outside
/// it so exports never wait on a decision in flight. Saves happen while the
/// mutex is held, so the stored slot follows the same order as the log.
pub struct SessionService {
    engine: Mutex<SessionEngine>,
    gateway: Arc<DecisionGateway>,
    log: Arc<AttemptLog>,
    repository: AttemptLogRepository,
}

impl SessionService {
    pub fn new(
        config: &EngineConfig,
        content: ContentTable,
        gateway: Arc<DecisionGateway>,
        repository: AttemptLogRepository,
    ) -> Arc<Self> {
        let capacity = config.attempt_log.capacity;
        let restored = repository.load(capacity);
        if !restored.is_empty() {
            tracing::info!(attempts = restored.len(), "attempt log restored");
        }
        let log = Arc::new(AttemptLog::with_records(capacity, restored));
        let engine = SessionEngine::with_os_rng(
            RoundGenerator::new(content),
            config.timing.clone(),
            Arc::clone(&log),
            Utc::now(),
        );

        Arc::new(Self {
            engine: Mutex::new(engine),
            gateway,
            log,
            repository,
        })
    }

    pub fn gateway(&self) -> &Arc<DecisionGateway> {
        &self.gateway
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        self.engine.lock().await.snapshot()
    }

    pub async fn choose(self: &Arc<Self>, option_id: Uuid) -> Result<ChoiceOutcome, SessionError> {
        let outcome = {
            let mut engine = self.engine.lock().await;
            let outcome = engine.choose(&self.gateway, option_id, Utc::now()).await?;
            self.persist().await;
            outcome
        };

        match outcome.advance {
            Advance::AwaitFeedback { delay_ms, ticket } => {
                let service = Arc::clone(self);
                tokio::spawn(async move {
                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                    service.engine.lock().await.complete_feedback(ticket, Utc::now());
                });
            }
            Advance::Retry {
                clear_highlight_ms,
                ticket,
            } => {
                let service = Arc::clone(self);
                tokio::spawn(async move {
                    tokio::time::sleep(Duration::from_millis(clear_highlight_ms)).await;
                    service.engine.lock().await.clear_highlight(ticket);
                });
            }
            Advance::NextTrial => {}
        }

        Ok(outcome)
    }

    pub async fn use_hint(&self) -> Result<u32, SessionError> {
        self.engine.lock().await.use_hint()
    }

    pub async fn reset(&self) -> SessionSnapshot {
        let mut engine = self.engine.lock().await;
        engine.reset(Utc::now());
        self.persist().await;
        engine.snapshot()
    }

    pub fn attempts(&self) -> Vec<AttemptRecord> {
        self.log.to_vec()
    }

    pub fn export(&self) -> ExportDocument {
        build_export(self.log.to_vec(), Utc::now())
    }

    pub fn gateway_stats(&self) -> GatewayStats {
        self.gateway.stats()
    }

    async fn persist(&self) {
        let repository = self.repository.clone();
        let attempts = self.log.to_vec();
        match tokio::task::spawn_blocking(move || repository.save(&attempts)).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => tracing::warn!(error = %err, "failed to save attempt log"),
            Err(err) => tracing::warn!(error = %err, "attempt log save task failed"),
        }
    }
}
