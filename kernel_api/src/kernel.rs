//! Kernel API trait

use crate::Instant;
use core_types::{Errno, Fd, KResult, OpenMode};
use serde_json::Value;

/// The kernel API trait
///
/// This defines the uniform surface every caller and every capability uses.
/// All methods take `&self`: one kernel instance is shared by the code that
/// drives it and by the capabilities mounted into it, and capability dispatch
/// re-enters the kernel.
///
/// # Design Principles
///
/// **Synchronous boundary**: Every call resolves to exactly one terminal
/// result before returning.
///
/// **Descriptor discipline**: Every successful `open` must be paired with a
/// `close`. [`OpenFile`](crate::OpenFile) does this automatically.
///
/// **Mount precedence**: Paths at or below a mount point are served by the
/// capability mounted there, never by plain namespace nodes.
///
/// # Example
///
/// ```ignore
/// use core_types::OpenMode;
/// use kernel_api::KernelApi;
///
/// fn read_status(kernel: &dyn KernelApi) -> core_types::KResult<serde_json::Value> {
///     let fd = kernel.open("/var/run/status", OpenMode::Read)?;
///     let result = kernel.read(fd);
///     kernel.close(fd)?;
///     result
/// }
/// ```
pub trait KernelApi {
    /// Opens a path
    ///
    /// Fails with `ENOENT` if nothing exists at the path and `EINVAL` if the
    /// mode is not supported for the node kind.
    fn open(&self, path: &str, mode: OpenMode) -> KResult<Fd>;

    /// Reads through a descriptor
    ///
    /// Mounted capabilities receive the original full path; plain data nodes
    /// are copied out whole.
    fn read(&self, fd: Fd) -> KResult<Value>;

    /// Writes through a descriptor
    ///
    /// Mounted capabilities own interpretation of `data`; plain data nodes
    /// are replaced by it.
    fn write(&self, fd: Fd, data: Value) -> KResult<()>;

    /// Issues a request to the capability mounted at or above the
    /// descriptor's path
    ///
    /// Fails with `EINVAL` if no capability is mounted or none handles the
    /// request.
    fn ioctl(&self, fd: Fd, request: u32, arg: Value) -> KResult<Value>;

    /// Releases a descriptor
    ///
    /// Closing an already-closed descriptor fails with `EBADF` and leaves the
    /// table untouched.
    fn close(&self, fd: Fd) -> KResult<()>;

    /// Creates a directory whose parent already exists
    fn mkdir(&self, path: &str) -> KResult<()>;

    /// Creates a data node holding `data`
    fn create(&self, path: &str, data: Value) -> KResult<()>;

    /// Returns true if `open` on this path would find something
    fn exists(&self, path: &str) -> bool;

    /// Removes a data node, pipe or empty directory
    fn unlink(&self, path: &str) -> KResult<()>;

    /// Creates a named pipe
    fn mkfifo(&self, path: &str) -> KResult<()>;

    /// Returns the kernel's current time
    fn now(&self) -> Instant;
}

/// Creates every missing directory along `path`
///
/// Each prefix is checked with `exists` before `mkdir`, so calling this on
/// an already-initialized subtree changes nothing.
pub fn ensure_dir_all(kernel: &dyn KernelApi, path: &str) -> KResult<()> {
    let mut current = String::new();
    for segment in path.split('/').filter(|s| !s.is_empty()) {
        current.push('/');
        current.push_str(segment);
        if kernel.exists(&current) {
            continue;
        }
        match kernel.mkdir(&current) {
            Ok(()) | Err(Errno::EEXIST) => {}
            Err(errno) => return Err(errno),
        }
    }
    Ok(())
}
