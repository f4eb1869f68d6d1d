//! Kernel configuration

use serde::{Deserialize, Serialize};

/// Kernel configuration
///
/// Missing fields take their defaults, so `{}` is a valid configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct KernelConfig {
    /// Emit `debug!` traces for every kernel operation
    pub debug: bool,
    /// Create the fixed root directories and event pipes at construction
    pub standard_roots: bool,
    /// Most values a pipe holds before writes fail with `EAGAIN`
    pub pipe_capacity: usize,
}

/// Pipe capacity when the configuration does not set one
pub const DEFAULT_PIPE_CAPACITY: usize = 256;

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            debug: false,
            standard_roots: true,
            pipe_capacity: DEFAULT_PIPE_CAPACITY,
        }
    }
}
