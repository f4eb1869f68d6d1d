//! Open descriptor table

use core_types::{Errno, Fd, KResult, MountId, OpenMode};
use std::collections::HashMap;

/// First descriptor number handed out
pub const FIRST_FD: u32 = 3;

/// What a descriptor was resolved to at open time
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// A plain namespace node, re-resolved by path on every call
    Node,
    /// A mounted capability
    Mount {
        mount_id: MountId,
        mount_path: String,
        sub_path: Vec<String>,
    },
}

/// One open descriptor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Descriptor {
    pub fd: Fd,
    /// Normalized path given to `open`
    pub path: String,
    pub mode: OpenMode,
    pub target: Target,
}

/// Maps open descriptors to (path, mode, target)
///
/// Descriptor numbers grow monotonically and are never reused, so a stale
/// handle can never alias a newer one.
#[derive(Debug)]
pub struct DescriptorTable {
    entries: HashMap<Fd, Descriptor>,
    next: u32,
}

impl DescriptorTable {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            next: FIRST_FD,
        }
    }

    /// Allocates a descriptor
    pub fn allocate(&mut self, path: String, mode: OpenMode, target: Target) -> Fd {
        let fd = Fd::new(self.next);
        self.next += 1;
        self.entries.insert(
            fd,
            Descriptor {
                fd,
                path,
                mode,
                target,
            },
        );
        fd
    }

    /// Looks up an open descriptor, failing with `EBADF`
    pub fn get(&self, fd: Fd) -> KResult<&Descriptor> {
        self.entries.get(&fd).ok_or(Errno::EBADF)
    }

    /// Releases a descriptor, failing with `EBADF` if it is not open
    pub fn release(&mut self, fd: Fd) -> KResult<Descriptor> {
        self.entries.remove(&fd).ok_or(Errno::EBADF)
    }

    /// Number of open descriptors
    pub fn count(&self) -> usize {
        self.entries.len()
    }
}

impl Default for DescriptorTable {
    fn default() -> Self {
        Self::new()
    }
}
