//! Fixed namespace roots
//!
//! Path handlers pattern-match on these literals; they are part of the
//! external contract.

/// Device root
pub const DEV: &str = "/dev";
/// Process/runtime root
pub const PROC: &str = "/proc";
/// Process-style character resources (`list` and numeric ids)
pub const PROC_CHARACTER: &str = "/proc/character";
/// Entity-data root, typed as `/entity/{kind}/{id}`
pub const ENTITY: &str = "/entity";
/// Configuration root
pub const ETC: &str = "/etc";
/// Schema definitions
pub const ETC_SCHEMA: &str = "/etc/schema";
/// Plugin registration
pub const ETC_PLUGINS: &str = "/etc/plugins";
/// Variable-data root
pub const VAR: &str = "/var";
/// Logs
pub const VAR_LOG: &str = "/var/log";
/// Run state
pub const VAR_RUN: &str = "/var/run";
/// Named-pipe root
pub const PIPES: &str = "/pipes";

/// Event channels created under [`PIPES`]
pub const PIPE_CHANNELS: [&str; 4] = ["system", "game", "entity", "feature"];

/// Resource roots served by the path-handler chain
pub const V_ENTITY: &str = "/v_entity";
pub const V_CHARACTER: &str = "/v_character";
pub const V_SCHEMA: &str = "/v_schema";

/// Device mount points
pub const DEV_ABILITY: &str = "/dev/ability";
pub const DEV_COMBAT: &str = "/dev/combat";
pub const DEV_CHARACTER: &str = "/dev/character";
pub const DEV_DB: &str = "/dev/db";

/// Directories created when a kernel boots with standard roots
pub const STANDARD_DIRECTORIES: [&str; 11] = [
    DEV, PROC, ENTITY, ETC, ETC_SCHEMA, ETC_PLUGINS, VAR, VAR_LOG, VAR_RUN, PIPES,
    "/entity/character",
];
