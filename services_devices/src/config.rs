//! Device configuration

use serde::{Deserialize, Serialize};

/// Inputs to combat derivation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct CombatConfig {
    /// Base attack bonus used when a request does not carry one
    pub base_attack_bonus: i64,
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            base_attack_bonus: 0,
        }
    }
}
