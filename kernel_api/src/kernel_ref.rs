//! Kernel reference handed to capabilities at construction

use crate::{KernelApi, OpenFile};
use core_types::{Errno, KResult, OpenMode};
use std::cell::Cell;
use std::rc::{Rc, Weak};

/// A capability's reference to the kernel that mounted it
///
/// The reference is weak: a capability never keeps its kernel alive. It is
/// also detachable: once the kernel unmounts the capability, every clone of
/// the reference stops resolving.
#[derive(Clone)]
pub struct KernelRef {
    kernel: Weak<dyn KernelApi>,
    attached: Rc<Cell<bool>>,
}

impl KernelRef {
    /// Creates an attached reference
    pub fn new(kernel: Weak<dyn KernelApi>) -> Self {
        Self {
            kernel,
            attached: Rc::new(Cell::new(true)),
        }
    }

    /// Resolves the kernel
    ///
    /// Fails with `ENODEV` after detach or once the kernel is gone.
    pub fn get(&self) -> KResult<Rc<dyn KernelApi>> {
        if !self.attached.get() {
            return Err(Errno::ENODEV);
        }
        self.kernel.upgrade().ok_or(Errno::ENODEV)
    }

    /// Opens a scoped descriptor through the kernel
    pub fn open(&self, path: &str, mode: OpenMode) -> KResult<OpenFile> {
        OpenFile::open(self.get()?, path, mode)
    }

    /// Detaches this reference and every clone of it
    pub fn detach(&self) {
        self.attached.set(false);
    }

    /// True until [`KernelRef::detach`] is called
    pub fn is_attached(&self) -> bool {
        self.attached.get()
    }
}

impl std::fmt::Debug for KernelRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KernelRef")
            .field("attached", &self.attached.get())
            .finish()
    }
}
