//! Boot configuration

use serde::{Deserialize, Serialize};
use services_devices::CombatConfig;
use thiserror::Error;
use vfs_kernel::KernelConfig;

/// Errors loading a configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse boot configuration: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("unsupported boot configuration version: {0}")]
    UnsupportedVersion(u32),
}

/// Which capabilities boot mounts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct MountConfig {
    /// Handler-chain roots (`/v_entity`, `/v_character`, `/v_schema`,
    /// `/proc/character`)
    pub resources: bool,
    pub ability: bool,
    pub combat: bool,
    pub character: bool,
    pub db: bool,
}

impl Default for MountConfig {
    fn default() -> Self {
        Self {
            resources: true,
            ability: true,
            combat: true,
            character: true,
            db: true,
        }
    }
}

/// Complete boot configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct BootConfig {
    /// Version of the configuration format
    pub version: u32,
    #[serde(default)]
    pub kernel: KernelConfig,
    #[serde(default)]
    pub combat: CombatConfig,
    #[serde(default)]
    pub mounts: MountConfig,
}

impl BootConfig {
    /// Current version of the configuration format
    pub const CURRENT_VERSION: u32 = 1;

    /// Parses and version-checks a JSON configuration
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: BootConfig = serde_json::from_str(json)?;
        if config.version != Self::CURRENT_VERSION {
            return Err(ConfigError::UnsupportedVersion(config.version));
        }
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl Default for BootConfig {
    fn default() -> Self {
        Self {
            version: Self::CURRENT_VERSION,
            kernel: KernelConfig::default(),
            combat: CombatConfig::default(),
            mounts: MountConfig::default(),
        }
    }
}
