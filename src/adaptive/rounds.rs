//! Trial generation over a declarative content table.
//!
//! The table lists, per category, a canonical variant and pools of visually
//! similar variants for the harder levels. Only the correct option is drawn
//! from those pools; distractors always render canonically.

use std::collections::HashSet;
use std::path::Path;

use chrono::{DateTime, Utc};
use rand::seq::{IndexedRandom, SliceRandom};
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::adaptive::types::{AnswerOption, Category, DifficultyLevel, Trial, VariantId};

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("content needs at least 2 categories, got {0}")]
    TooFewCategories(usize),
    #[error("duplicate category: {0}")]
    DuplicateCategory(String),
    #[error("failed to read content: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse content: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LevelPools {
    #[serde(default)]
    pub medium: Vec<VariantId>,
    #[serde(default)]
    pub hard: Vec<VariantId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryContent {
    pub category: Category,
    pub canonical: VariantId,
    #[serde(default)]
    pub pools: LevelPools,
}

impl CategoryContent {
    /// Variants the correct option may take at `level`. An empty pool falls
    /// back to the canonical variant.
    fn pool(&self, level: DifficultyLevel) -> &[VariantId] {
        match level {
            DifficultyLevel::Easy => &[],
            DifficultyLevel::Medium => &self.pools.medium,
            DifficultyLevel::Hard => &self.pools.hard,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ContentTable {
    categories: Vec<CategoryContent>,
}

impl ContentTable {
    pub fn new(categories: Vec<CategoryContent>) -> Result<Self, ContentError> {
        if categories.len() < 2 {
            return Err(ContentError::TooFewCategories(categories.len()));
        }
        let mut seen = HashSet::new();
        for entry in &categories {
            if !seen.insert(entry.category.clone()) {
                return Err(ContentError::DuplicateCategory(entry.category.to_string()));
            }
        }
        Ok(Self { categories })
    }

    pub fn from_json(raw: &str) -> Result<Self, ContentError> {
        let categories: Vec<CategoryContent> = serde_json::from_str(raw)?;
        Self::new(categories)
    }

    pub fn load(path: &Path) -> Result<Self, ContentError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    /// Built-in three-colour palette.
    pub fn reference() -> Self {
        fn entry(name: &str, medium: &[&str], hard: &[&str]) -> CategoryContent {
            CategoryContent {
                category: Category::new(name),
                canonical: VariantId::new(format!("{name}-base")),
                pools: LevelPools {
                    medium: medium.iter().map(|v| VariantId::new(*v)).collect(),
                    hard: hard.iter().map(|v| VariantId::new(*v)).collect(),
                },
            }
        }

        Self {
            categories: vec![
                entry(
                    "red",
                    &["red-crimson", "red-scarlet", "red-brick"],
                    &["red-coral", "red-rust", "red-rose"],
                ),
                entry(
                    "blue",
                    &["blue-navy", "blue-sky", "blue-cobalt"],
                    &["blue-teal", "blue-periwinkle", "blue-slate"],
                ),
                entry(
                    "yellow",
                    &["yellow-lemon", "yellow-gold", "yellow-canary"],
                    &["yellow-amber", "yellow-khaki", "yellow-chartreuse"],
                ),
            ],
        }
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    pub fn categories(&self) -> impl Iterator<Item = &Category> {
        self.categories.iter().map(|c| &c.category)
    }

    pub fn canonical(&self, category: &Category) -> Option<&VariantId> {
        self.entry(category).map(|c| &c.canonical)
    }

    fn entry(&self, category: &Category) -> Option<&CategoryContent> {
        self.categories.iter().find(|c| &c.category == category)
    }
}

impl Default for ContentTable {
    fn default() -> Self {
        Self::reference()
    }
}

pub struct RoundGenerator {
    content: ContentTable,
}

impl RoundGenerator {
    pub fn new(content: ContentTable) -> Self {
        Self { content }
    }

    pub fn content(&self) -> &ContentTable {
        &self.content
    }

    pub fn generate<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        previous: Option<&Category>,
        level: DifficultyLevel,
        now: DateTime<Utc>,
    ) -> Trial {
        let eligible: Vec<&CategoryContent> = self
            .content
            .categories
            .iter()
            .filter(|c| Some(&c.category) != previous)
            .collect();
        // never empty: the table holds at least two categories
        let target = eligible
            .choose(rng)
            .copied()
            .unwrap_or(&self.content.categories[0]);

        let variant = target
            .pool(level)
            .choose(rng)
            .unwrap_or(&target.canonical)
            .clone();

        let mut options = Vec::with_capacity(self.content.len());
        options.push(AnswerOption {
            id: random_uuid(rng),
            category: target.category.clone(),
            variant,
        });
        for other in self.content.categories.iter().filter(|c| c.category != target.category) {
            options.push(AnswerOption {
                id: random_uuid(rng),
                category: other.category.clone(),
                variant: other.canonical.clone(),
            });
        }
        options.shuffle(rng);

        Trial {
            id: random_uuid(rng),
            target: target.category.clone(),
            level,
            options,
            started_at: now,
        }
    }
}

fn random_uuid<R: Rng + ?Sized>(rng: &mut R) -> Uuid {
    let mut bytes = [0u8; 16];
    rng.fill(&mut bytes);
    uuid::Builder::from_random_bytes(bytes).into_uuid()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn generator() -> RoundGenerator {
        RoundGenerator::new(ContentTable::reference())
    }

    #[test]
    fn never_repeats_previous_target() {
        let gen = generator();
        let mut rng = StdRng::seed_from_u64(7);
        let mut previous: Option<Category> = None;
        for _ in 0..200 {
            let trial = gen.generate(&mut rng, previous.as_ref(), DifficultyLevel::Medium, Utc::now());
            if let Some(prev) = &previous {
                assert_ne!(&trial.target, prev);
            }
            previous = Some(trial.target);
        }
    }

    #[test]
    fn exactly_one_option_matches_target() {
        let gen = generator();
        let mut rng = StdRng::seed_from_u64(11);
        for level in DifficultyLevel::ALL {
            let trial = gen.generate(&mut rng, None, level, Utc::now());
            assert_eq!(trial.options.len(), 3);
            let matching = trial.options.iter().filter(|o| o.category == trial.target).count();
            assert_eq!(matching, 1);
        }
    }

    #[test]
    fn easy_level_uses_canonical_variants_only() {
        let gen = generator();
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..50 {
            let trial = gen.generate(&mut rng, None, DifficultyLevel::Easy, Utc::now());
            for option in &trial.options {
                assert_eq!(Some(&option.variant), gen.content().canonical(&option.category));
            }
        }
    }

    #[test]
    fn harder_levels_only_vary_the_correct_option() {
        let gen = generator();
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..50 {
            let trial = gen.generate(&mut rng, None, DifficultyLevel::Hard, Utc::now());
            let correct = trial.correct_option().unwrap();
            assert_ne!(Some(&correct.variant), gen.content().canonical(&correct.category));
            for option in trial.options.iter().filter(|o| o.category != trial.target) {
                assert_eq!(Some(&option.variant), gen.content().canonical(&option.category));
            }
        }
    }

    #[test]
    fn option_ids_are_fresh_every_trial() {
        let gen = generator();
        let mut rng = StdRng::seed_from_u64(9);
        let mut seen = HashSet::new();
        for _ in 0..30 {
            let trial = gen.generate(&mut rng, None, DifficultyLevel::Easy, Utc::now());
            for option in trial.options {
                assert!(seen.insert(option.id));
            }
        }
    }

    #[test]
    fn same_seed_replays_same_trials() {
        let gen = generator();
        let now = Utc::now();
        let a = gen.generate(&mut StdRng::seed_from_u64(42), None, DifficultyLevel::Medium, now);
        let b = gen.generate(&mut StdRng::seed_from_u64(42), None, DifficultyLevel::Medium, now);
        assert_eq!(a, b);
    }

    #[test]
    fn empty_pool_falls_back_to_canonical() {
        let table = ContentTable::new(vec![
            CategoryContent {
                category: Category::new("a"),
                canonical: VariantId::new("a-base"),
                pools: LevelPools::default(),
            },
            CategoryContent {
                category: Category::new("b"),
                canonical: VariantId::new("b-base"),
                pools: LevelPools::default(),
            },
        ])
        .unwrap();
        let gen = RoundGenerator::new(table);
        let mut rng = StdRng::seed_from_u64(1);
        let trial = gen.generate(&mut rng, Some(&Category::new("a")), DifficultyLevel::Hard, Utc::now());
        assert_eq!(trial.target, Category::new("b"));
        assert_eq!(trial.correct_option().unwrap().variant, VariantId::new("b-base"));
    }

    #[test]
    fn rejects_degenerate_tables() {
        let single = vec![CategoryContent {
            category: Category::new("a"),
            canonical: VariantId::new("a-base"),
            pools: LevelPools::default(),
        }];
        assert!(matches!(
            ContentTable::new(single.clone()),
            Err(ContentError::TooFewCategories(1))
        ));
        let mut dup = single.clone();
        dup.extend(single);
        assert!(matches!(
            ContentTable::new(dup),
            Err(ContentError::DuplicateCategory(_))
        ));
    }

    #[test]
    fn parses_json_content() {
        let table = ContentTable::from_json(
            r#"[
                {"category": "cat", "canonical": "cat-base", "pools": {"medium": ["cat-grey"]}},
                {"category": "dog", "canonical": "dog-base"}
            ]"#,
        )
        .unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.canonical(&Category::new("dog")), Some(&VariantId::new("dog-base")));
    }
}
