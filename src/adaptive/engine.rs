use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::adaptive::attempt_log::AttemptLog;
use crate::adaptive::config::SessionTiming;
use crate::adaptive::decision::DecisionGateway;
use crate::adaptive::rounds::RoundGenerator;
use crate::adaptive::types::*;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("option {0} is not part of the current trial")]
    UnknownOption(Uuid),
    #[error("current trial is already solved and awaiting feedback")]
    AwaitingFeedback,
}

/// What the caller should do after a choice has been applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Advance {
    /// A new trial is already in place.
    NextTrial,
    /// Show feedback, then call `complete_feedback(ticket)` after `delay_ms`.
    #[serde(rename_all = "camelCase")]
    AwaitFeedback { delay_ms: u64, ticket: u64 },
    /// Same trial again; call `clear_highlight(ticket)` after `clear_highlight_ms`.
    #[serde(rename_all = "camelCase")]
    Retry { clear_highlight_ms: u64, ticket: u64 },
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChoiceOutcome {
    pub correct: bool,
    pub record: AttemptRecord,
    pub decision: DecisionResult,
    pub advance: Advance,
}

/// Signal snapshot taken when an option is chosen, before the decision.
#[derive(Debug, Clone)]
pub struct PendingChoice {
    trial_id: Uuid,
    target: Category,
    chosen: Category,
    correct: bool,
    latency_seconds: f64,
    hints_used: u32,
    level_before: DifficultyLevel,
    timestamp: DateTime<Utc>,
    pub input: DecisionInput,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub level: DifficultyLevel,
    pub trial: Trial,
    pub counters: SessionCounters,
    pub highlight: bool,
    pub awaiting_feedback: bool,
    pub attempts: usize,
}

pub struct SessionEngine<R = StdRng> {
    generator: RoundGenerator,
    timing: SessionTiming,
    log: Arc<AttemptLog>,
    rng: R,
    level: DifficultyLevel,
    counters: SessionCounters,
    trial: Trial,
    highlight: bool,
    feedback_ticket: Option<u64>,
    epoch: u64,
}

impl SessionEngine<StdRng> {
    pub fn with_os_rng(
        generator: RoundGenerator,
        timing: SessionTiming,
        log: Arc<AttemptLog>,
        now: DateTime<Utc>,
    ) -> Self {
        Self::new(generator, timing, log, StdRng::from_os_rng(), now)
    }
}

impl<R: Rng> SessionEngine<R> {
    pub fn new(
        generator: RoundGenerator,
        timing: SessionTiming,
        log: Arc<AttemptLog>,
        mut rng: R,
        now: DateTime<Utc>,
    ) -> Self {
        let level = DifficultyLevel::lowest();
        let trial = generator.generate(&mut rng, None, level, now);
        Self {
            generator,
            timing,
            log,
            rng,
            level,
            counters: SessionCounters::default(),
            trial,
            highlight: false,
            feedback_ticket: None,
            epoch: 0,
        }
    }

    pub fn level(&self) -> DifficultyLevel {
        self.level
    }

    pub fn counters(&self) -> &SessionCounters {
        &self.counters
    }

    pub fn trial(&self) -> &Trial {
        &self.trial
    }

    pub fn highlight(&self) -> bool {
        self.highlight
    }

    pub fn awaiting_feedback(&self) -> bool {
        self.feedback_ticket.is_some()
    }

    pub fn log(&self) -> &Arc<AttemptLog> {
        &self.log
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            level: self.level,
            trial: self.trial.clone(),
            counters: self.counters.clone(),
            highlight: self.highlight,
            awaiting_feedback: self.awaiting_feedback(),
            attempts: self.log.len(),
        }
    }

    /// Full "option chosen" transition.
    pub async fn choose(
        &mut self,
        gateway: &DecisionGateway,
        option_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<ChoiceOutcome, SessionError> {
        let pending = self.begin_choice(option_id, now)?;
        let result = gateway.decide(&pending.input).await;
        Ok(self.apply_decision(pending, result, now))
    }

    /// Scores the choice against the current trial and updates the per-trial
    /// counters. The returned input is what the decision gateway evaluates.
    pub fn begin_choice(
        &mut self,
        option_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<PendingChoice, SessionError> {
        if self.awaiting_feedback() {
            return Err(SessionError::AwaitingFeedback);
        }
        let option = self
            .trial
            .option(option_id)
            .ok_or(SessionError::UnknownOption(option_id))?
            .clone();

        let elapsed_ms = (now - self.trial.started_at).num_milliseconds().max(0);
        let latency_seconds = elapsed_ms as f64 / 1000.0;
        let correct = option.category == self.trial.target;

        if correct {
            self.counters.record_correct();
        } else {
            self.counters.record_wrong(option.id);
        }
        self.epoch += 1;

        let input = DecisionInput {
            level: self.level,
            errors_consecutive: self.counters.consecutive_errors,
            hints_used: self.counters.hints_used_this_trial,
            retries_same_round: self.counters.retries_this_trial,
            latency_sec: latency_seconds,
            perseveration: self.counters.perseveration_count,
            high_frustration_streak: self.counters.high_frustration_streak,
            success_streak: self.counters.success_streak,
            correct,
        };

        Ok(PendingChoice {
            trial_id: self.trial.id,
            target: self.trial.target.clone(),
            chosen: option.category,
            correct,
            latency_seconds,
            hints_used: self.counters.hints_used_this_trial,
            level_before: self.level,
            timestamp: now,
            input,
        })
    }

    /// Applies a decision to the state, logs the attempt and advances.
    pub fn apply_decision(
        &mut self,
        pending: PendingChoice,
        result: DecisionResult,
        now: DateTime<Utc>,
    ) -> ChoiceOutcome {
        let decision = &result.decision;
        self.counters.success_streak = decision.next_success_streak;
        self.counters.high_frustration_streak = decision.next_high_frustration_streak;

        let level_before = pending.level_before;
        let level_after = decision.suggested_level;
        if level_after != self.level {
            tracing::info!(from = %self.level, to = %level_after, action = decision.action.as_str(), "difficulty level changed");
            self.level = level_after;
        }

        let record = AttemptRecord {
            trial_id: pending.trial_id,
            target: pending.target,
            chosen_category: pending.chosen,
            correct: pending.correct,
            hints_used: pending.hints_used,
            timestamp: pending.timestamp,
            latency_seconds: pending.latency_seconds,
            frustration_value: decision.frustration,
            frustration_components: decision.frustration_components,
            action: decision.action,
            provenance: result.provenance,
            level_before,
            level_after,
            applied_rule: AppliedRule::derive(decision.action, level_before, level_after),
        };
        self.log.append(record.clone());

        tracing::debug!(
            frustration = decision.frustration,
            action = decision.action.as_str(),
            provenance = result.provenance.as_str(),
            correct = pending.correct,
            level_before = %level_before,
            level_after = %level_after,
            "decision applied"
        );

        let advance = if decision.action == DecisionAction::Ease {
            self.next_trial(now);
            Advance::NextTrial
        } else if pending.correct {
            self.feedback_ticket = Some(self.epoch);
            Advance::AwaitFeedback {
                delay_ms: self.timing.feedback_delay.as_millis() as u64,
                ticket: self.epoch,
            }
        } else {
            Advance::Retry {
                clear_highlight_ms: self.timing.highlight_clear_delay.as_millis() as u64,
                ticket: self.epoch,
            }
        };

        ChoiceOutcome {
            correct: pending.correct,
            record,
            decision: result,
            advance,
        }
    }

    /// Moves past a solved trial once its feedback has been shown. Stale
    /// tickets are ignored.
    pub fn complete_feedback(&mut self, ticket: u64, now: DateTime<Utc>) -> bool {
        if self.feedback_ticket != Some(ticket) {
            return false;
        }
        self.next_trial(now);
        true
    }

    pub fn clear_highlight(&mut self, ticket: u64) -> bool {
        if ticket != self.epoch || !self.highlight {
            return false;
        }
        self.highlight = false;
        true
    }

    pub fn use_hint(&mut self) -> Result<u32, SessionError> {
        if self.awaiting_feedback() {
            return Err(SessionError::AwaitingFeedback);
        }
        self.highlight = true;
        self.counters.hints_used_this_trial += 1;
        self.epoch += 1;
        Ok(self.counters.hints_used_this_trial)
    }

    /// Back to the initial state; the attempt log is cleared too.
    pub fn reset(&mut self, now: DateTime<Utc>) {
        self.level = DifficultyLevel::lowest();
        self.counters = SessionCounters::default();
        self.highlight = false;
        self.feedback_ticket = None;
        self.epoch += 1;
        self.trial = self.generator.generate(&mut self.rng, None, self.level, now);
        self.log.clear();
        tracing::info!("session reset");
    }

    fn next_trial(&mut self, now: DateTime<Utc>) {
        let previous = self.trial.target.clone();
        self.trial = self
            .generator
            .generate(&mut self.rng, Some(&previous), self.level, now);
        self.counters.reset_trial();
        self.highlight = false;
        self.feedback_ticket = None;
        self.epoch += 1;
    }
}
