use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::adaptive::frustration::round2;
use crate::adaptive::persistence::ATTEMPT_LOG_VERSION;
use crate::adaptive::types::{
    AppliedRule, AttemptRecord, DecisionAction, DifficultyLevel, Provenance,
};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ActionCounts {
    pub keep: usize,
    pub support: usize,
    pub ease: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProvenanceCounts {
    pub remote: usize,
    pub local: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleCounts {
    pub none: usize,
    pub support_by_frustration: usize,
    pub ease_by_frustration: usize,
    pub levelup_by_streak: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportSummary {
    pub total: usize,
    pub correct: usize,
    pub incorrect: usize,
    pub accuracy: f64,
    pub hints_used: u64,
    pub actions: ActionCounts,
    pub provenance: ProvenanceCounts,
    pub rules: RuleCounts,
    pub final_level: Option<DifficultyLevel>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    pub exported_at: DateTime<Utc>,
    pub version: u32,
    pub summary: ExportSummary,
    pub attempts: Vec<AttemptRecord>,
}

pub fn summarize<'a, I>(attempts: I) -> ExportSummary
where
    I: IntoIterator<Item = &'a AttemptRecord>,
{
    let mut summary = ExportSummary {
        total: 0,
        correct: 0,
        incorrect: 0,
        accuracy: 0.0,
        hints_used: 0,
        actions: ActionCounts::default(),
        provenance: ProvenanceCounts::default(),
        rules: RuleCounts::default(),
        final_level: None,
    };

    for attempt in attempts {
        summary.total += 1;
        if attempt.correct {
            summary.correct += 1;
        } else {
            summary.incorrect += 1;
        }
        summary.hints_used += u64::from(attempt.hints_used);

        match attempt.action {
            DecisionAction::Keep => summary.actions.keep += 1,
            DecisionAction::Support => summary.actions.support += 1,
            DecisionAction::Ease => summary.actions.ease += 1,
        }
        match attempt.provenance {
            Provenance::Remote => summary.provenance.remote += 1,
            Provenance::Local => summary.provenance.local += 1,
        }
        match attempt.applied_rule {
            AppliedRule::None => summary.rules.none += 1,
            AppliedRule::SupportByFrustration => summary.rules.support_by_frustration += 1,
            AppliedRule::EaseByFrustration => summary.rules.ease_by_frustration += 1,
            AppliedRule::LevelupByStreak => summary.rules.levelup_by_streak += 1,
        }
        summary.final_level = Some(attempt.level_after);
    }

    if summary.total > 0 {
        summary.accuracy = round2(summary.correct as f64 / summary.total as f64);
    }
    summary
}

pub fn build_export(attempts: Vec<AttemptRecord>, now: DateTime<Utc>) -> ExportDocument {
    ExportDocument {
        exported_at: now,
        version: ATTEMPT_LOG_VERSION,
        summary: summarize(&attempts),
        attempts,
    }
}
