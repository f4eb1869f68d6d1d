//! # Path Handlers
//!
//! This crate translates hierarchical resource paths into structured driver
//! operations.
//!
//! ## Philosophy
//!
//! The kernel knows nothing about entity shapes. A path such as
//! `/v_character/7/skills/stealth` reaches a [`ResourceCapability`], which
//! asks its [`HandlerChain`] who owns the path. Each [`PathHandler`] either
//! answers definitively (success or error) or says it is not its path.
//!
//! ## Handlers
//!
//! - [`EntityPathHandler`]: `/root/{id}[/{subResource}[/{subId}]]`
//! - [`ProcessResourceHandler`]: `/proc/character/list` and numeric items

pub mod capability;
pub mod chain;
pub mod entity;
pub mod handler;
pub mod process;

pub use capability::ResourceCapability;
pub use chain::HandlerChain;
pub use entity::{EntityPath, EntityPathHandler};
pub use handler::{HandlerOutcome, PathHandler};
pub use process::ProcessResourceHandler;

use core_types::{DriverOp, Errno, KResult};
use kernel_api::IoRequest;
use log::error;
use serde_json::Value;
use services_persistence::{Driver, DriverRequest};

/// Argument keys injected into driver calls
pub const ENTITY_ID: &str = "entityId";
pub const SUB_RESOURCE: &str = "subResource";
pub const SUB_ID: &str = "subId";
pub const KIND: &str = "kind";
pub const DATA: &str = "data";

/// Issues a driver ioctl, logging I/O failures
pub(crate) fn driver_ioctl(
    driver: &dyn Driver,
    request: &IoRequest,
    op: DriverOp,
    arg: Value,
) -> KResult<Value> {
    let result = driver.ioctl(&driver_request(request), op, arg);
    if let Err(Errno::EIO) = result {
        error!("driver {} on {} failed: {}", op, request.path, Errno::EIO);
    }
    result
}

pub(crate) fn driver_request(request: &IoRequest) -> DriverRequest {
    DriverRequest::new(request.fd, request.path.clone())
}

/// Splits `path` into the segments below `root`, or `None` if `path` is not
/// under `root`
pub(crate) fn segments_under<'a>(path: &'a str, root: &str) -> Option<Vec<&'a str>> {
    let mut segments = path.split('/').filter(|s| !s.is_empty());
    for expected in root.split('/').filter(|s| !s.is_empty()) {
        if segments.next() != Some(expected) {
            return None;
        }
    }
    Some(segments.collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segments_under() {
        assert_eq!(
            segments_under("/v_entity/7/skills", "/v_entity"),
            Some(vec!["7", "skills"])
        );
        assert_eq!(segments_under("/v_entity", "/v_entity"), Some(vec![]));
        assert_eq!(segments_under("/v_entityx/7", "/v_entity"), None);
        assert_eq!(
            segments_under("/proc/character/list", "/proc/character"),
            Some(vec!["list"])
        );
    }
}
