//! Error codes returned by every kernel, device and driver operation.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type used at every boundary of the namespace.
///
/// `Ok` is the `SUCCESS` (0) code; `Err` carries one of the fixed
/// POSIX-styled codes.
pub type KResult<T> = Result<T, Errno>;

/// Numeric code for success.
pub const SUCCESS: i32 = 0;

/// POSIX-styled error taxonomy
///
/// The discriminants are part of the external contract and must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error, Serialize, Deserialize)]
#[repr(i32)]
pub enum Errno {
    /// Operation not permitted
    #[error("operation not permitted")]
    EPERM = 1,

    /// No such file, directory, entity or sub-resource
    #[error("no such entry")]
    ENOENT = 2,

    /// Driver or persistence failure
    #[error("I/O failure")]
    EIO = 5,

    /// Descriptor is closed, unknown, or opened with the wrong mode
    #[error("bad descriptor")]
    EBADF = 9,

    /// Nothing available right now (empty pipe)
    #[error("resource temporarily unavailable")]
    EAGAIN = 11,

    /// Permission denied
    #[error("permission denied")]
    EACCES = 13,

    /// Path is owned by a mounted capability
    #[error("resource busy")]
    EBUSY = 16,

    /// Entry already exists
    #[error("entry exists")]
    EEXIST = 17,

    /// Capability has been unmounted
    #[error("no such device")]
    ENODEV = 19,

    /// A path segment is not a directory
    #[error("not a directory")]
    ENOTDIR = 20,

    /// Data operation attempted on a directory
    #[error("is a directory")]
    EISDIR = 21,

    /// Missing field, unsupported mode, or unhandled request
    #[error("invalid argument")]
    EINVAL = 22,
}

impl Errno {
    /// Returns the stable numeric code
    pub fn code(self) -> i32 {
        self as i32
    }

    /// Maps a numeric code back to an error
    ///
    /// Returns `None` for `SUCCESS` and for codes outside the taxonomy.
    pub fn from_code(code: i32) -> Option<Self> {
        let errno = match code {
            1 => Errno::EPERM,
            2 => Errno::ENOENT,
            5 => Errno::EIO,
            9 => Errno::EBADF,
            11 => Errno::EAGAIN,
            13 => Errno::EACCES,
            16 => Errno::EBUSY,
            17 => Errno::EEXIST,
            19 => Errno::ENODEV,
            20 => Errno::ENOTDIR,
            21 => Errno::EISDIR,
            22 => Errno::EINVAL,
            _ => return None,
        };
        Some(errno)
    }
}

/// Terminal numeric code of a call: 0 on success, the errno otherwise.
pub fn code_of<T>(result: &KResult<T>) -> i32 {
    match result {
        Ok(_) => SUCCESS,
        Err(errno) => errno.code(),
    }
}
