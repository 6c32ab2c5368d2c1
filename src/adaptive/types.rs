use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DifficultyLevel {
    #[default]
    Easy,
    Medium,
    Hard,
}

impl DifficultyLevel {
    pub const ALL: [DifficultyLevel; 3] = [Self::Easy, Self::Medium, Self::Hard];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Easy => "easy",
            Self::Medium => "medium",
            Self::Hard => "hard",
        }
    }

    pub fn harder(&self) -> Self {
        match self {
            Self::Easy => Self::Medium,
            _ => Self::Hard,
        }
    }

    pub fn easier(&self) -> Self {
        match self {
            Self::Hard => Self::Medium,
            _ => Self::Easy,
        }
    }

    pub fn lowest() -> Self {
        Self::Easy
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "easy" => Some(Self::Easy),
            "medium" | "mid" => Some(Self::Medium),
            "hard" => Some(Self::Hard),
            _ => None,
        }
    }
}

impl fmt::Display for DifficultyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Target class, identified by its symbolic name rather than by how it renders.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Category(String);

impl Category {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VariantId(String);

impl VariantId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerOption {
    pub id: Uuid,
    pub category: Category,
    pub variant: VariantId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trial {
    pub id: Uuid,
    pub target: Category,
    pub level: DifficultyLevel,
    pub options: Vec<AnswerOption>,
    pub started_at: DateTime<Utc>,
}

impl Trial {
    pub fn option(&self, option_id: Uuid) -> Option<&AnswerOption> {
        self.options.iter().find(|o| o.id == option_id)
    }

    pub fn correct_option(&self) -> Option<&AnswerOption> {
        self.options.iter().find(|o| o.category == self.target)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionCounters {
    pub consecutive_errors: u32,
    pub retries_this_trial: u32,
    pub perseveration_count: u32,
    pub last_wrong_option_id: Option<Uuid>,
    pub hints_used_this_trial: u32,
    pub success_streak: u32,
    pub high_frustration_streak: u32,
}

impl SessionCounters {
    /// Clears everything scoped to a single trial; streaks carry over.
    pub fn reset_trial(&mut self) {
        self.consecutive_errors = 0;
        self.retries_this_trial = 0;
        self.perseveration_count = 0;
        self.last_wrong_option_id = None;
        self.hints_used_this_trial = 0;
    }

    pub fn record_correct(&mut self) {
        self.consecutive_errors = 0;
        self.retries_this_trial = 0;
        self.perseveration_count = 0;
        self.last_wrong_option_id = None;
    }

    pub fn record_wrong(&mut self, option_id: Uuid) {
        self.consecutive_errors += 1;
        self.retries_this_trial += 1;
        if self.last_wrong_option_id == Some(option_id) {
            self.perseveration_count += 1;
        } else {
            self.last_wrong_option_id = Some(option_id);
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FrustrationComponents {
    pub error: f64,
    pub hint: f64,
    pub retry: f64,
    pub latency: f64,
    pub perseveration: f64,
}

impl FrustrationComponents {
    pub fn iter(&self) -> impl Iterator<Item = f64> {
        [
            self.error,
            self.hint,
            self.retry,
            self.latency,
            self.perseveration,
        ]
        .into_iter()
    }

    pub fn in_unit_range(&self) -> bool {
        self.iter().all(|v| (0.0..=1.0).contains(&v))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecisionAction {
    Keep,
    Support,
    Ease,
}

impl DecisionAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Keep => "keep",
            Self::Support => "support",
            Self::Ease => "ease",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    Remote,
    Local,
}

impl Provenance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Remote => "remote",
            Self::Local => "local",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppliedRule {
    None,
    SupportByFrustration,
    EaseByFrustration,
    LevelupByStreak,
}

impl AppliedRule {
    pub fn derive(
        action: DecisionAction,
        level_before: DifficultyLevel,
        level_after: DifficultyLevel,
    ) -> Self {
        match action {
            DecisionAction::Support => Self::SupportByFrustration,
            DecisionAction::Ease => Self::EaseByFrustration,
            DecisionAction::Keep if level_after != level_before => Self::LevelupByStreak,
            DecisionAction::Keep => Self::None,
        }
    }
}

/// Request body of the decision service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionInput {
    pub level: DifficultyLevel,
    pub errors_consecutive: u32,
    pub hints_used: u32,
    pub retries_same_round: u32,
    pub latency_sec: f64,
    pub perseveration: u32,
    pub high_frustration_streak: u32,
    pub success_streak: u32,
    pub correct: bool,
}

/// Policy output, also the response body of the decision service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Decision {
    pub frustration: f64,
    pub frustration_components: FrustrationComponents,
    pub action: DecisionAction,
    pub suggested_level: DifficultyLevel,
    pub next_high_frustration_streak: u32,
    pub next_success_streak: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionResult {
    #[serde(flatten)]
    pub decision: Decision,
    pub provenance: Provenance,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptRecord {
    pub trial_id: Uuid,
    pub target: Category,
    pub chosen_category: Category,
    pub correct: bool,
    pub hints_used: u32,
    pub timestamp: DateTime<Utc>,
    pub latency_seconds: f64,
    pub frustration_value: f64,
    pub frustration_components: FrustrationComponents,
    pub action: DecisionAction,
    pub provenance: Provenance,
    pub level_before: DifficultyLevel,
    pub level_after: DifficultyLevel,
    pub applied_rule: AppliedRule,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_steps_clamp_at_both_ends() {
        assert_eq!(DifficultyLevel::Hard.harder(), DifficultyLevel::Hard);
        assert_eq!(DifficultyLevel::Easy.easier(), DifficultyLevel::Easy);
        assert_eq!(DifficultyLevel::Easy.harder(), DifficultyLevel::Medium);
        assert_eq!(DifficultyLevel::Hard.easier(), DifficultyLevel::Medium);
        assert!(DifficultyLevel::Easy < DifficultyLevel::Medium);
        assert!(DifficultyLevel::Medium < DifficultyLevel::Hard);
    }

    #[test]
    fn perseveration_counts_identical_wrong_picks_only() {
        let mut counters = SessionCounters::default();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        counters.record_wrong(a);
        assert_eq!(counters.perseveration_count, 0);
        counters.record_wrong(b);
        assert_eq!(counters.perseveration_count, 0);
        counters.record_wrong(b);
        assert_eq!(counters.perseveration_count, 1);
        assert_eq!(counters.consecutive_errors, 3);
        assert_eq!(counters.retries_this_trial, 3);

        counters.record_correct();
        assert_eq!(counters.consecutive_errors, 0);
        assert_eq!(counters.last_wrong_option_id, None);
    }

    #[test]
    fn applied_rule_prefers_action_over_level_change() {
        use DifficultyLevel::*;
        assert_eq!(
            AppliedRule::derive(DecisionAction::Ease, Medium, Easy),
            AppliedRule::EaseByFrustration
        );
        assert_eq!(
            AppliedRule::derive(DecisionAction::Keep, Easy, Medium),
            AppliedRule::LevelupByStreak
        );
        assert_eq!(AppliedRule::derive(DecisionAction::Keep, Hard, Hard), AppliedRule::None);
    }

    #[test]
    fn decision_result_serializes_flat() {
        let result = DecisionResult {
            decision: Decision {
                frustration: 0.5,
                frustration_components: FrustrationComponents::default(),
                action: DecisionAction::Support,
                suggested_level: DifficultyLevel::Medium,
                next_high_frustration_streak: 0,
                next_success_streak: 0,
            },
            provenance: Provenance::Local,
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["action"], "support");
        assert_eq!(json["suggestedLevel"], "medium");
        assert_eq!(json["provenance"], "local");
        assert!(json.get("decision").is_none());
    }
}
