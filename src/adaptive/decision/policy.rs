use async_trait::async_trait;

use crate::adaptive::config::{FrustrationParams, PolicyThresholds};
use crate::adaptive::decision::{DecisionError, DecisionSource};
use crate::adaptive::frustration::{FrustrationScorer, FrustrationSignals};
use crate::adaptive::types::{Decision, DecisionAction, DecisionInput, DifficultyLevel};

/// Streak and level state the policy reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PolicyState {
    pub level: DifficultyLevel,
    pub high_frustration_streak: u32,
    pub success_streak: u32,
    pub correct: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PolicyOutcome {
    pub action: DecisionAction,
    pub suggested_level: DifficultyLevel,
    pub next_high_frustration_streak: u32,
    pub next_success_streak: u32,
}

/// Maps a frustration value and the current streaks to an action and level.
pub fn apply(thresholds: &PolicyThresholds, frustration: f64, state: PolicyState) -> PolicyOutcome {
    let (action, next_high_frustration_streak) = if frustration < thresholds.support {
        (DecisionAction::Keep, 0)
    } else if frustration < thresholds.ease {
        (DecisionAction::Support, 0)
    } else {
        let candidate = state.high_frustration_streak.saturating_add(1);
        if candidate >= thresholds.ease_streak {
            (DecisionAction::Ease, 0)
        } else {
            (DecisionAction::Support, candidate)
        }
    };

    let success_streak = if state.correct {
        state.success_streak.saturating_add(1)
    } else {
        0
    };

    let (suggested_level, next_success_streak) = if action == DecisionAction::Ease {
        (state.level.easier(), 0)
    } else if success_streak >= thresholds.levelup_streak {
        (state.level.harder(), 0)
    } else {
        (state.level, success_streak)
    };

    PolicyOutcome {
        action,
        suggested_level,
        next_high_frustration_streak,
        next_success_streak,
    }
}

/// In-process evaluation of the scorer plus policy.
pub struct LocalPolicy {
    scorer: FrustrationScorer,
    thresholds: PolicyThresholds,
}

impl LocalPolicy {
    pub fn new(frustration: FrustrationParams, thresholds: PolicyThresholds) -> Self {
        Self {
            scorer: FrustrationScorer::new(frustration),
            thresholds,
        }
    }

    pub fn evaluate(&self, input: &DecisionInput) -> Decision {
        let score = self.scorer.score(&FrustrationSignals {
            consecutive_errors: input.errors_consecutive,
            hints_used: input.hints_used,
            retries: input.retries_same_round,
            latency_secs: input.latency_sec,
            perseveration: input.perseveration,
        });

        let outcome = apply(
            &self.thresholds,
            score.value,
            PolicyState {
                level: input.level,
                high_frustration_streak: input.high_frustration_streak,
                success_streak: input.success_streak,
                correct: input.correct,
            },
        );

        Decision {
            frustration: score.value,
            frustration_components: score.components,
            action: outcome.action,
            suggested_level: outcome.suggested_level,
            next_high_frustration_streak: outcome.next_high_frustration_streak,
            next_success_streak: outcome.next_success_streak,
        }
    }
}

impl Default for LocalPolicy {
    fn default() -> Self {
        Self::new(FrustrationParams::default(), PolicyThresholds::default())
    }
}

#[async_trait]
impl DecisionSource for LocalPolicy {
    async fn decide(&self, input: &DecisionInput) -> Result<Decision, DecisionError> {
        Ok(self.evaluate(input))
    }

    fn name(&self) -> &'static str {
        "local"
    }
}
