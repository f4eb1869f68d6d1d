//! Descriptor handles and access modes

use serde::{Deserialize, Serialize};
use std::fmt;

/// An open descriptor handle
///
/// Unique among the descriptors currently open on one kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Fd(u32);

impl Fd {
    /// Wraps a raw descriptor number
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Returns the raw descriptor number
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for Fd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fd:{}", self.0)
    }
}

/// Access mode a descriptor was opened with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpenMode {
    Read,
    Write,
    ReadWrite,
}

impl OpenMode {
    /// True if reads are permitted
    pub fn can_read(self) -> bool {
        matches!(self, OpenMode::Read | OpenMode::ReadWrite)
    }

    /// True if writes are permitted
    pub fn can_write(self) -> bool {
        matches!(self, OpenMode::Write | OpenMode::ReadWrite)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_permissions() {
        assert!(OpenMode::Read.can_read());
        assert!(!OpenMode::Read.can_write());
        assert!(OpenMode::Write.can_write());
        assert!(!OpenMode::Write.can_read());
        assert!(OpenMode::ReadWrite.can_read() && OpenMode::ReadWrite.can_write());
    }

    #[test]
    fn test_fd_display() {
        assert_eq!(Fd::new(7).to_string(), "fd:7");
    }
}
