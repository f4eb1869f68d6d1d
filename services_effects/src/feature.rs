//! Data-driven feature application
//!
//! A feat, trait or similar feature is a named list of effect templates.
//! Applying it registers one effect per template for an entity; unapplying
//! tears all of them down by source prefix.

use crate::effect::{derive_effect_id, Effect, EffectValue, UNTYPED};
use crate::engine::EffectEngine;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of feature an effect came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureKind {
    Feat,
    Trait,
    ClassFeature,
    Corruption,
    Buff,
}

impl fmt::Display for FeatureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FeatureKind::Feat => "feat",
            FeatureKind::Trait => "trait",
            FeatureKind::ClassFeature => "class_feature",
            FeatureKind::Corruption => "corruption",
            FeatureKind::Buff => "buff",
        };
        write!(f, "{}", name)
    }
}

/// One effect a feature grants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectTemplate {
    pub target: String,
    pub value: EffectValue,
    #[serde(rename = "type", default = "untyped")]
    pub bonus_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<i32>,
}

fn untyped() -> String {
    UNTYPED.to_string()
}

/// A feature definition as loaded from game data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureDefinition {
    pub id: String,
    pub kind: FeatureKind,
    pub name: String,
    #[serde(default)]
    pub effects: Vec<EffectTemplate>,
}

impl FeatureDefinition {
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Source shared by every effect this feature registers
    pub fn source(&self) -> String {
        format!("{}:{}", self.kind, self.id)
    }

    /// Source of the effect registered for template `index`
    pub fn template_source(&self, index: usize) -> String {
        format!("{}:{}", self.source(), index)
    }
}

impl EffectEngine {
    /// Registers every effect of `feature` for `entity_id`
    ///
    /// Ids are derived, so applying the same feature twice replaces its
    /// effects rather than doubling them.
    pub fn apply_feature(&mut self, entity_id: &str, feature: &FeatureDefinition) -> Vec<String> {
        feature
            .effects
            .iter()
            .enumerate()
            .map(|(index, template)| {
                let source = feature.template_source(index);
                let mut effect = Effect::new(
                    derive_effect_id(entity_id, &template.target, &source),
                    source,
                    template.target.clone(),
                    template.value.clone(),
                )
                .with_type(template.bonus_type.clone());
                effect.condition = template.condition.clone();
                effect.priority = template.priority;
                let id = effect.id.clone();
                self.add_effect(effect);
                id
            })
            .collect()
    }

    /// Removes every effect `feature` registered
    pub fn unapply_feature(&mut self, feature: &FeatureDefinition) -> usize {
        self.remove_effects_by_source_prefix(&format!("{}:", feature.source()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WEAPON_FOCUS: &str = r#"{
        "id": "weapon_focus",
        "kind": "feat",
        "name": "Weapon Focus",
        "effects": [
            { "target": "attack.melee", "value": 1 },
            { "target": "attack.ranged", "value": 1 }
        ]
    }"#;

    #[test]
    fn test_parse_definition() {
        let feature = FeatureDefinition::from_json(WEAPON_FOCUS).unwrap();
        assert_eq!(feature.kind, FeatureKind::Feat);
        assert_eq!(feature.effects.len(), 2);
        assert_eq!(feature.effects[0].bonus_type, "untyped");
        assert_eq!(feature.source(), "feat:weapon_focus");
        assert_eq!(feature.template_source(1), "feat:weapon_focus:1");
    }

    #[test]
    fn test_apply_is_idempotent_and_unapply_tears_down() {
        let feature = FeatureDefinition::from_json(WEAPON_FOCUS).unwrap();
        let mut engine = EffectEngine::new();
        engine.register_numeric_effect("7", "attack.melee", "feat:weapon_focus_greater", 1, None, None);

        engine.apply_feature("7", &feature);
        engine.apply_feature("7", &feature);
        assert_eq!(engine.len(), 3);
        assert_eq!(engine.apply_numeric_effects("attack.melee", None).total, 2);

        assert_eq!(engine.unapply_feature(&feature), 2);
        assert_eq!(engine.len(), 1);
        assert_eq!(engine.effects()[0].source, "feat:weapon_focus_greater");
    }

    #[test]
    fn test_kind_display_matches_serde() {
        let json = serde_json::to_string(&FeatureKind::ClassFeature).unwrap();
        assert_eq!(json, format!("\"{}\"", FeatureKind::ClassFeature));
    }
}
