//! # Devices
//!
//! This crate provides the built-in game devices mounted under `/dev`.
//!
//! ## Philosophy
//!
//! **Subsystems are devices, not APIs.** Abilities, combat, character
//! identity and persistence each answer the kernel's read/write/ioctl calls.
//! Requests name their entity with an `entityPath` (any kernel path holding
//! an entity document), or rely on the one selected with `SET_CHARACTER`.
//!
//! ## Devices
//!
//! - [`AbilityDevice`]: ability scores and skills
//! - [`CombatDevice`]: AC, initiative, attacks, saves and conditions
//! - [`CharacterDevice`]: status records and partial property updates
//! - [`DbDevice`]: buffered bridge to the persistence driver
//!
//! Derived values consult a shared [`EffectBook`](services_effects::EffectBook).

pub mod abilities;
pub mod ability;
pub mod character;
pub mod combat;
pub mod config;
pub mod db;
mod entity;

pub use abilities::{AbilityScore, ABILITIES};
pub use ability::AbilityDevice;
pub use character::CharacterDevice;
pub use combat::CombatDevice;
pub use config::CombatConfig;
pub use db::DbDevice;

/// Argument keys shared by device requests
pub mod keys {
    pub const ENTITY_PATH: &str = "entityPath";
    pub const ENTITY_ID: &str = "entityId";
    pub const PROPERTIES: &str = "properties";
}
