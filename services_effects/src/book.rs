//! Per-entity effect engines

use crate::engine::EffectEngine;
use std::collections::BTreeMap;

/// One [`EffectEngine`] per entity id
///
/// Engines are created on first mutable access; read access to an entity
/// with no effects sees an empty engine.
#[derive(Debug, Default)]
pub struct EffectBook {
    engines: BTreeMap<String, EffectEngine>,
    empty: EffectEngine,
}

impl EffectBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn engine(&self, entity_id: &str) -> &EffectEngine {
        self.engines.get(entity_id).unwrap_or(&self.empty)
    }

    pub fn engine_mut(&mut self, entity_id: &str) -> &mut EffectEngine {
        self.engines.entry(entity_id.to_string()).or_default()
    }

    /// Drops every effect held for an entity
    pub fn forget(&mut self, entity_id: &str) -> bool {
        self.engines.remove(entity_id).is_some()
    }

    pub fn entities(&self) -> impl Iterator<Item = &str> {
        self.engines.keys().map(String::as_str)
    }
}
