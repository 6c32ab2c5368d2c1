use std::sync::Arc;
use std::time::{Instant, SystemTime};

use crate::adaptive::decision::{DecisionGateway, LocalPolicy};
use crate::adaptive::persistence::{AttemptLogRepository, FileStore, KeyValueStore};
use crate::adaptive::rounds::ContentTable;
use crate::adaptive::{EngineConfig, SessionService};

#[derive(Clone)]
pub struct AppState {
    started_at: Instant,
    started_at_system: SystemTime,
    session: Arc<SessionService>,
    policy: Arc<LocalPolicy>,
    decision_endpoint: bool,
}

impl AppState {
    pub fn new(
        session: Arc<SessionService>,
        policy: Arc<LocalPolicy>,
        decision_endpoint: bool,
    ) -> Self {
        Self {
            started_at: Instant::now(),
            started_at_system: SystemTime::now(),
            session,
            policy,
            decision_endpoint,
        }
    }

    /// Wires the session against `store`, loading content from
    /// `CONTENT_PATH` when configured.
    pub fn from_config(config: &EngineConfig, store: Arc<dyn KeyValueStore>) -> Self {
        let content = match &config.content_path {
            Some(path) => match ContentTable::load(path) {
                Ok(table) => table,
                Err(err) => {
                    tracing::warn!(path = %path.display(), error = %err, "invalid content table, using reference palette");
                    ContentTable::reference()
                }
            },
            None => ContentTable::reference(),
        };

        let gateway = Arc::new(DecisionGateway::from_config(config));
        let session = SessionService::new(
            config,
            content,
            gateway,
            AttemptLogRepository::new(store),
        );
        let policy = Arc::new(LocalPolicy::new(
            config.frustration.clone(),
            config.policy.clone(),
        ));
        Self::new(session, policy, config.decision_endpoint)
    }

    pub fn from_env_config(config: &EngineConfig) -> Self {
        let store: Arc<dyn KeyValueStore> =
            Arc::new(FileStore::new(config.attempt_log.store_dir.clone()));
        Self::from_config(config, store)
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }

    pub fn started_at_system(&self) -> SystemTime {
        self.started_at_system
    }

    pub fn session(&self) -> Arc<SessionService> {
        Arc::clone(&self.session)
    }

    pub fn policy(&self) -> Arc<LocalPolicy> {
        Arc::clone(&self.policy)
    }

    /// Whether `/api/decision` is mounted.
    pub fn decision_endpoint(&self) -> bool {
        self.decision_endpoint
    }
}
