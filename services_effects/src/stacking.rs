//! Numeric bonus stacking

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// Source name of the synthetic base contribution
pub const BASE_SOURCE: &str = "Base";

/// One numeric contribution handed to a stacking policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BonusEntry {
    pub source: String,
    pub value: i64,
    #[serde(rename = "type")]
    pub bonus_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<i32>,
}

impl BonusEntry {
    pub fn new(source: impl Into<String>, value: i64, bonus_type: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            value,
            bonus_type: bonus_type.into(),
            priority: None,
        }
    }
}

/// Outcome of stacking: the total and the entries that counted toward it
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StackingResult {
    pub total: i64,
    pub modifiers: Vec<BonusEntry>,
}

/// Sums `values`, clamping at the ends of the `i64` range
pub fn saturating_sum(values: impl IntoIterator<Item = i64>) -> i64 {
    values.into_iter().fold(0, i64::saturating_add)
}

/// Rule for combining typed numeric contributions
pub trait StackingPolicy {
    fn stack(&self, entries: &[BonusEntry]) -> StackingResult;
}

/// Default stacking rule
///
/// Types in the additive set stack with each other. Every other type keeps
/// only its largest bonus, the earliest entry winning ties. Penalties always
/// stack regardless of type.
#[derive(Debug, Clone)]
pub struct TypedStacking {
    additive: BTreeSet<String>,
}

impl TypedStacking {
    pub fn new<I, S>(additive: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            additive: additive.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_additive(&self, bonus_type: &str) -> bool {
        self.additive.contains(bonus_type)
    }
}

impl Default for TypedStacking {
    fn default() -> Self {
        Self::new(["untyped", "dodge", "circumstance", "base"])
    }
}

impl StackingPolicy for TypedStacking {
    fn stack(&self, entries: &[BonusEntry]) -> StackingResult {
        // Index of the winning entry per non-additive type.
        let mut best: HashMap<&str, usize> = HashMap::new();
        for (index, entry) in entries.iter().enumerate() {
            if entry.value < 0 || self.is_additive(&entry.bonus_type) {
                continue;
            }
            let slot = best.entry(entry.bonus_type.as_str()).or_insert(index);
            if entry.value > entries[*slot].value {
                *slot = index;
            }
        }

        let modifiers: Vec<BonusEntry> = entries
            .iter()
            .enumerate()
            .filter(|(index, entry)| {
                entry.value < 0
                    || self.is_additive(&entry.bonus_type)
                    || best.get(entry.bonus_type.as_str()) == Some(index)
            })
            .map(|(_, entry)| entry.clone())
            .collect();

        StackingResult {
            total: saturating_sum(modifiers.iter().map(|entry| entry.value)),
            modifiers,
        }
    }
}
