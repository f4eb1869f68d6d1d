//! Capability (device) trait
//!
//! A capability is a pluggable unit serving every path at or below its
//! mount point.
//!
//! ## Lifecycle
//!
//! 1. **Constructed**: The kernel calls a factory with a [`KernelRef`](crate::KernelRef);
//!    a capability can never exist without one.
//! 2. **Mounted**: The kernel calls [`Capability::on_mount`]. Failure aborts
//!    the mount and the instance is dropped.
//! 3. **Active**: `read` / `write` / `ioctl` are dispatched to it.
//! 4. **Unmounted**: [`Capability::on_unmount`] runs, the kernel reference is
//!    detached, and no further calls arrive.
//!
//! Operations a capability does not serve keep the default body, which
//! fails with `EINVAL`.

use core_types::{Errno, Fd, KResult};
use serde_json::Value;

/// Addressing information handed to a capability for every call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IoRequest {
    /// Descriptor the call arrived on
    pub fd: Fd,
    /// Original full (normalized) path the descriptor was opened with
    pub path: String,
    /// Path of the mount point that resolved it
    pub mount_path: String,
    /// Segments below the mount point, untouched by the kernel
    pub sub_path: Vec<String>,
}

impl IoRequest {
    /// Creates a request
    pub fn new(fd: Fd, path: impl Into<String>, mount_path: impl Into<String>, sub_path: Vec<String>) -> Self {
        Self {
            fd,
            path: path.into(),
            mount_path: mount_path.into(),
            sub_path,
        }
    }

    /// True if the descriptor addresses the mount point itself
    pub fn is_mount_root(&self) -> bool {
        self.sub_path.is_empty()
    }

    /// Returns the sub-path segment at `index`
    pub fn segment(&self, index: usize) -> Option<&str> {
        self.sub_path.get(index).map(String::as_str)
    }
}

/// A mountable capability
pub trait Capability {
    /// Stable identifier
    fn id(&self) -> &str;

    /// Version string
    fn version(&self) -> &str;

    /// Activates the capability
    ///
    /// Must be idempotent with respect to the namespace: supporting
    /// directories that already exist are left alone.
    fn on_mount(&self) -> KResult<()>;

    /// Called once before the capability is detached
    fn on_unmount(&self) {}

    /// Called once a descriptor opened at or below the mount is closed
    ///
    /// Per-descriptor state must be released here; the descriptor number
    /// never comes back.
    fn on_close(&self, _request: &IoRequest) {}

    fn read(&self, _request: &IoRequest) -> KResult<Value> {
        Err(Errno::EINVAL)
    }

    fn write(&self, _request: &IoRequest, _data: Value) -> KResult<()> {
        Err(Errno::EINVAL)
    }

    fn ioctl(&self, _request: &IoRequest, _code: u32, _arg: Value) -> KResult<Value> {
        Err(Errno::EINVAL)
    }
}
