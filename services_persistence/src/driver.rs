//! The persistence driver contract

use core_types::{DriverOp, Errno, Fd, KResult};
use serde_json::Value;

/// Addressing information for a driver call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverRequest {
    /// Descriptor the originating kernel call arrived on
    pub fd: Fd,
    /// Full path the descriptor was opened with
    pub path: String,
}

impl DriverRequest {
    pub fn new(fd: Fd, path: impl Into<String>) -> Self {
        Self {
            fd,
            path: path.into(),
        }
    }
}

/// The persistence collaborator
///
/// `ioctl` carries structured CRUD intents. Arguments are JSON objects using
/// the keys `entityId`, `kind`, `data`, `subResource`, `subId` and `where`.
/// An `UPDATE` or `DELETE` naming a `subResource` only touches
/// `properties[subResource]`, or `properties[subResource][subId]` when a
/// `subId` is also given; the rest of the entity is kept.
///
/// `read` and `write` address path-keyed projections; backends without
/// projections keep the `EINVAL` defaults.
pub trait Driver {
    fn read(&self, _request: &DriverRequest) -> KResult<Value> {
        Err(Errno::EINVAL)
    }

    fn write(&self, _request: &DriverRequest, _data: Value) -> KResult<()> {
        Err(Errno::EINVAL)
    }

    fn ioctl(&self, request: &DriverRequest, op: DriverOp, arg: Value) -> KResult<Value>;
}
