//! Ability score derivation

use crate::entity::raw_number;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use services_effects::EffectEngine;

/// The six ability names, in sheet order
pub const ABILITIES: [&str; 6] = [
    "strength",
    "dexterity",
    "constitution",
    "intelligence",
    "wisdom",
    "charisma",
];

/// Score used when an entity stores none
pub const DEFAULT_SCORE: i64 = 10;

/// A resolved ability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbilityScore {
    pub base: i64,
    pub bonus: i64,
    pub total: i64,
    pub modifier: i64,
}

impl AbilityScore {
    /// Resolves `name` for an entity document against its effects
    ///
    /// Effects target `ability.{name}`.
    pub fn resolve(doc: &Value, engine: &EffectEngine, name: &str) -> Self {
        let base = raw_number(doc, name).unwrap_or(DEFAULT_SCORE);
        let total = engine
            .apply_numeric_effects(&format!("ability.{}", name), Some(base))
            .total;
        Self {
            base,
            bonus: total.saturating_sub(base),
            total,
            modifier: modifier(total),
        }
    }
}

/// `floor((score - 10) / 2)`
pub fn modifier(score: i64) -> i64 {
    score.saturating_sub(10).div_euclid(2)
}

/// True for one of [`ABILITIES`]
pub fn is_ability(name: &str) -> bool {
    ABILITIES.contains(&name)
}
