//! Effect records

use serde::{Deserialize, Serialize};
use std::fmt;

/// Suffix marking a target as a prefix match (`saving_throw.*`)
pub const WILDCARD_SUFFIX: &str = ".*";

/// Bonus type used when none is given
pub const UNTYPED: &str = "untyped";

/// Value carried by an effect
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EffectValue {
    Number(i64),
    Boolean(bool),
    Text(String),
}

impl EffectValue {
    pub fn as_number(&self) -> Option<i64> {
        match self {
            EffectValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            EffectValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            EffectValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for EffectValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EffectValue::Number(n) => write!(f, "{}", n),
            EffectValue::Boolean(b) => write!(f, "{}", b),
            EffectValue::Text(s) => write!(f, "{}", s),
        }
    }
}

/// A named, typed, prioritized contribution toward a target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Effect {
    pub id: String,
    pub source: String,
    /// Bonus type (`enhancement`, `dodge`, ...)
    #[serde(rename = "type", default = "untyped")]
    pub bonus_type: String,
    /// Dotted key, optionally ending in [`WILDCARD_SUFFIX`]
    pub target: String,
    pub value: EffectValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<i32>,
}

fn untyped() -> String {
    UNTYPED.to_string()
}

impl Effect {
    pub fn new(
        id: impl Into<String>,
        source: impl Into<String>,
        target: impl Into<String>,
        value: EffectValue,
    ) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            bonus_type: untyped(),
            target: target.into(),
            value,
            condition: None,
            priority: None,
        }
    }

    pub fn with_type(mut self, bonus_type: impl Into<String>) -> Self {
        self.bonus_type = bonus_type.into();
        self
    }

    pub fn with_condition(mut self, condition: impl Into<String>) -> Self {
        self.condition = Some(condition.into());
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Priority used for ordering; absent priorities sort lowest
    pub fn effective_priority(&self) -> i32 {
        self.priority.unwrap_or(0)
    }

    /// True if this effect contributes to `target`
    ///
    /// A registered `a.b.*` matches every key starting with `a.b.`; the
    /// wildcard itself is never a query key.
    pub fn applies_to(&self, target: &str) -> bool {
        if self.target == target {
            return true;
        }
        match self.target.strip_suffix(WILDCARD_SUFFIX) {
            Some(prefix) => target
                .strip_prefix(prefix)
                .map(|rest| rest.starts_with('.') && rest.len() > 1)
                .unwrap_or(false),
            None => false,
        }
    }
}

/// Deterministic id for an effect registered without one
///
/// Repeated registration from the same source toward the same target of the
/// same entity yields the same id, so it replaces rather than accumulates.
pub fn derive_effect_id(entity_id: &str, target: &str, source: &str) -> String {
    format!("{}:{}:{}", entity_id, target, source)
}
