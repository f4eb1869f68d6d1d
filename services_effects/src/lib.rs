//! # Effects Service
//!
//! This crate composes many named contributions toward a stat into a single
//! resolved value.
//!
//! ## Philosophy
//!
//! **Effects are data, resolution is policy.** An [`Effect`] says "this
//! source adds +2 of type `morale` to `attack.melee`". The [`EffectEngine`]
//! stores and queries effects; how typed numeric bonuses combine is a
//! [`StackingPolicy`] the engine is handed.
//!
//! ## Resolution
//!
//! - Numeric: collected, optionally seeded with a base, then stacked
//! - Boolean: logical OR over the base value
//! - Override: highest priority wins, ties keep registration order
//!
//! Effects carrying a `condition` are situational: they are only seen by
//! [`EffectEngine::get_conditional_override`] and by direct target queries.

pub mod book;
pub mod effect;
pub mod engine;
pub mod feature;
pub mod stacking;

pub use book::EffectBook;
pub use effect::{derive_effect_id, Effect, EffectValue, WILDCARD_SUFFIX};
pub use engine::{ConditionalOverride, EffectEngine};
pub use feature::{EffectTemplate, FeatureDefinition, FeatureKind};
pub use stacking::{
    saturating_sum, BonusEntry, StackingPolicy, StackingResult, TypedStacking, BASE_SOURCE,
};
