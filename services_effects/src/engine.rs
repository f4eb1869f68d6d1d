//! Effect registry and resolution

use crate::effect::{derive_effect_id, Effect, EffectValue, UNTYPED};
use crate::stacking::{BonusEntry, StackingPolicy, StackingResult, TypedStacking, BASE_SOURCE};
use serde::{Deserialize, Serialize};

/// Winner of a conditional override lookup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionalOverride {
    pub value: String,
    pub source: String,
}

/// Registry of effects for one entity
///
/// Registration order is preserved and breaks priority ties.
pub struct EffectEngine {
    effects: Vec<Effect>,
    stacking: Box<dyn StackingPolicy>,
}

impl EffectEngine {
    /// Creates an engine using [`TypedStacking`]
    pub fn new() -> Self {
        Self::with_stacking(Box::new(TypedStacking::default()))
    }

    pub fn with_stacking(stacking: Box<dyn StackingPolicy>) -> Self {
        Self {
            effects: Vec::new(),
            stacking,
        }
    }

    /// Adds an effect, replacing any existing effect with the same id
    ///
    /// A replaced effect moves to the end of the registration order.
    pub fn add_effect(&mut self, effect: Effect) {
        self.remove_effect(&effect.id);
        self.effects.push(effect);
    }

    /// Removes an effect by id, returning whether one existed
    pub fn remove_effect(&mut self, id: &str) -> bool {
        let before = self.effects.len();
        self.effects.retain(|e| e.id != id);
        self.effects.len() != before
    }

    /// Removes every effect from exactly `source`
    pub fn remove_effects_by_source(&mut self, source: &str) -> usize {
        self.remove_where(|e| e.source == source)
    }

    /// Removes every effect whose source starts with `prefix`
    pub fn remove_effects_by_source_prefix(&mut self, prefix: &str) -> usize {
        self.remove_where(|e| e.source.starts_with(prefix))
    }

    pub fn clear_all_effects(&mut self) {
        self.effects.clear();
    }

    fn remove_where(&mut self, predicate: impl Fn(&Effect) -> bool) -> usize {
        let before = self.effects.len();
        self.effects.retain(|e| !predicate(e));
        before - self.effects.len()
    }

    pub fn get_effect(&self, id: &str) -> Option<&Effect> {
        self.effects.iter().find(|e| e.id == id)
    }

    /// All effects contributing to `target`, in registration order
    pub fn get_effects_for_target(&self, target: &str) -> Vec<&Effect> {
        self.effects.iter().filter(|e| e.applies_to(target)).collect()
    }

    fn unconditional<'a>(&'a self, target: &'a str) -> impl Iterator<Item = &'a Effect> + 'a {
        self.effects
            .iter()
            .filter(move |e| e.condition.is_none() && e.applies_to(target))
    }

    /// Resolves numeric effects through the stacking policy
    ///
    /// When `base` is given it is seeded as a `Base` entry of type `base`
    /// with the highest possible priority.
    pub fn apply_numeric_effects(&self, target: &str, base: Option<i64>) -> StackingResult {
        let mut entries = Vec::new();
        if let Some(value) = base {
            entries.push(BonusEntry {
                source: BASE_SOURCE.to_string(),
                value,
                bonus_type: "base".to_string(),
                priority: Some(i32::MAX),
            });
        }
        entries.extend(self.unconditional(target).filter_map(|e| {
            e.value.as_number().map(|value| BonusEntry {
                source: e.source.clone(),
                value,
                bonus_type: e.bonus_type.clone(),
                priority: e.priority,
            })
        }));
        self.stacking.stack(&entries)
    }

    /// Logical OR of boolean effects over `base`
    pub fn apply_boolean_effects(&self, target: &str, base: bool) -> bool {
        base || self
            .unconditional(target)
            .any(|e| e.value.as_bool() == Some(true))
    }

    /// Highest-priority string effect, else `base`
    pub fn apply_override_effects(&self, target: &str, base: &str) -> String {
        highest(self.unconditional(target))
            .and_then(|e| e.value.as_text().map(str::to_string))
            .unwrap_or_else(|| base.to_string())
    }

    /// Highest-priority string effect registered under `condition`
    pub fn get_conditional_override(
        &self,
        target: &str,
        condition: &str,
    ) -> Option<ConditionalOverride> {
        let candidates = self
            .effects
            .iter()
            .filter(|e| e.condition.as_deref() == Some(condition) && e.applies_to(target));
        highest(candidates).and_then(|e| {
            e.value.as_text().map(|value| ConditionalOverride {
                value: value.to_string(),
                source: e.source.clone(),
            })
        })
    }

    /// Registers a numeric effect, deriving its id if none is given
    pub fn register_numeric_effect(
        &mut self,
        entity_id: &str,
        target: &str,
        source: &str,
        value: i64,
        bonus_type: Option<&str>,
        id: Option<&str>,
    ) -> String {
        let effect = Effect::new(
            resolve_id(id, entity_id, target, source),
            source,
            target,
            EffectValue::Number(value),
        )
        .with_type(bonus_type.unwrap_or(UNTYPED));
        self.insert(effect)
    }

    /// Registers a boolean effect, deriving its id if none is given
    pub fn register_boolean_effect(
        &mut self,
        entity_id: &str,
        target: &str,
        source: &str,
        value: bool,
        id: Option<&str>,
    ) -> String {
        let effect = Effect::new(
            resolve_id(id, entity_id, target, source),
            source,
            target,
            EffectValue::Boolean(value),
        );
        self.insert(effect)
    }

    /// Registers a string override, deriving its id if none is given
    pub fn register_override_effect(
        &mut self,
        entity_id: &str,
        target: &str,
        source: &str,
        value: &str,
        priority: i32,
        id: Option<&str>,
    ) -> String {
        let effect = Effect::new(
            resolve_id(id, entity_id, target, source),
            source,
            target,
            EffectValue::Text(value.to_string()),
        )
        .with_priority(priority);
        self.insert(effect)
    }

    fn insert(&mut self, effect: Effect) -> String {
        let id = effect.id.clone();
        self.add_effect(effect);
        id
    }

    pub fn effects(&self) -> &[Effect] {
        &self.effects
    }

    pub fn len(&self) -> usize {
        self.effects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }
}

impl Default for EffectEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EffectEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectEngine")
            .field("effects", &self.effects)
            .finish()
    }
}

fn resolve_id(id: Option<&str>, entity_id: &str, target: &str, source: &str) -> String {
    match id {
        Some(id) => id.to_string(),
        None => derive_effect_id(entity_id, target, source),
    }
}

/// Picks the text effect with the highest priority; ties keep the earliest
fn highest<'a>(effects: impl Iterator<Item = &'a Effect>) -> Option<&'a Effect> {
    let mut texts: Vec<&Effect> = effects.filter(|e| e.value.as_text().is_some()).collect();
    // Stable sort, so equal priorities stay in registration order.
    texts.sort_by(|a, b| b.effective_priority().cmp(&a.effective_priority()));
    texts.into_iter().next()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_replaces_same_id() {
        let mut engine = EffectEngine::new();
        engine.add_effect(Effect::new("x", "a", "ac", EffectValue::Number(1)));
        engine.add_effect(Effect::new("x", "b", "ac", EffectValue::Number(4)));
        assert_eq!(engine.len(), 1);
        assert_eq!(engine.get_effect("x").unwrap().source, "b");
    }

    #[test]
    fn test_derived_registration_is_idempotent() {
        let mut engine = EffectEngine::new();
        let first = engine.register_numeric_effect("7", "ac", "feat:dodge", 1, Some("dodge"), None);
        let second = engine.register_numeric_effect("7", "ac", "feat:dodge", 2, Some("dodge"), None);
        assert_eq!(first, second);
        assert_eq!(engine.len(), 1);
        assert_eq!(engine.apply_numeric_effects("ac", None).total, 2);
    }

    #[test]
    fn test_removal_primitives() {
        let mut engine = EffectEngine::new();
        engine.add_effect(Effect::new("1", "feat:a:0", "ac", EffectValue::Number(1)));
        engine.add_effect(Effect::new("2", "feat:a:1", "hp", EffectValue::Number(1)));
        engine.add_effect(Effect::new("3", "trait:b", "hp", EffectValue::Number(1)));
        engine.add_effect(Effect::new("4", "trait:b", "ac", EffectValue::Number(1)));

        assert!(engine.remove_effect("1"));
        assert!(!engine.remove_effect("1"));
        assert_eq!(engine.remove_effects_by_source_prefix("feat:a:"), 1);
        assert_eq!(engine.remove_effects_by_source("trait:b"), 2);
        assert!(engine.is_empty());

        engine.add_effect(Effect::new("5", "x", "ac", EffectValue::Number(1)));
        engine.clear_all_effects();
        assert!(engine.is_empty());
    }

    #[test]
    fn test_wildcard_query() {
        let mut engine = EffectEngine::new();
        engine.register_numeric_effect("7", "saving_throw.*", "trait:lucky", 1, Some("luck"), None);
        assert_eq!(engine.get_effects_for_target("saving_throw.will").len(), 1);
        assert_eq!(engine.get_effects_for_target("saving_throw.reflex").len(), 1);
        assert!(engine.get_effects_for_target("attack.melee").is_empty());
    }

    #[test]
    fn test_numeric_seeds_base() {
        let mut engine = EffectEngine::new();
        engine.register_numeric_effect("7", "ability.strength", "belt", 2, Some("enhancement"), None);
        engine.register_numeric_effect("7", "ability.strength", "bulls", 4, Some("enhancement"), None);
        let result = engine.apply_numeric_effects("ability.strength", Some(16));
        assert_eq!(result.total, 20);
        assert_eq!(result.modifiers[0].source, BASE_SOURCE);
        assert_eq!(result.modifiers[0].priority, Some(i32::MAX));
        assert_eq!(result.modifiers.len(), 2);
    }

    #[test]
    fn test_boolean_is_or() {
        let mut engine = EffectEngine::new();
        assert!(!engine.apply_boolean_effects("condition.prone", false));
        engine.register_boolean_effect("7", "condition.prone", "trip", false, None);
        assert!(!engine.apply_boolean_effects("condition.prone", false));
        engine.register_boolean_effect("7", "condition.prone", "grease", true, None);
        assert!(engine.apply_boolean_effects("condition.prone", false));
        assert!(engine.apply_boolean_effects("condition.other", true));
    }

    #[test]
    fn test_override_priority_beats_order() {
        let mut engine = EffectEngine::new();
        engine.register_override_effect("7", "size", "enlarge", "large", 50, None);
        engine.register_override_effect("7", "size", "reduce", "small", 20, None);
        assert_eq!(engine.apply_override_effects("size", "medium"), "large");

        let mut reversed = EffectEngine::new();
        reversed.register_override_effect("7", "size", "reduce", "small", 20, None);
        reversed.register_override_effect("7", "size", "enlarge", "large", 50, None);
        assert_eq!(reversed.apply_override_effects("size", "medium"), "large");

        assert_eq!(EffectEngine::new().apply_override_effects("size", "medium"), "medium");
    }

    #[test]
    fn test_override_ties_keep_registration_order() {
        let mut engine = EffectEngine::new();
        engine.register_override_effect("7", "size", "a", "large", 10, None);
        engine.register_override_effect("7", "size", "b", "huge", 10, None);
        assert_eq!(engine.apply_override_effects("size", "medium"), "large");
    }

    #[test]
    fn test_conditional_override() {
        let mut engine = EffectEngine::new();
        engine.add_effect(
            Effect::new("c1", "rage", "attack.melee.damage_type", EffectValue::Text("fire".into()))
                .with_condition("raging")
                .with_priority(5),
        );
        engine.add_effect(
            Effect::new("c2", "bless", "attack.melee.damage_type", EffectValue::Text("holy".into()))
                .with_condition("raging")
                .with_priority(9),
        );
        let winner = engine
            .get_conditional_override("attack.melee.damage_type", "raging")
            .unwrap();
        assert_eq!(winner.value, "holy");
        assert_eq!(winner.source, "bless");
        assert!(engine
            .get_conditional_override("attack.melee.damage_type", "flanking")
            .is_none());
        // Conditional effects stay out of unconditional resolution.
        assert_eq!(
            engine.apply_override_effects("attack.melee.damage_type", "slashing"),
            "slashing"
        );
    }
}
