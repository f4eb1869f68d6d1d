//! Scoped descriptors

use crate::KernelApi;
use core_types::{Fd, KResult, OpenMode};
use serde_json::Value;
use std::rc::Rc;

/// An open descriptor that is closed when dropped
///
/// Leaked descriptors are a correctness bug, so devices and handlers hold
/// descriptors through this type on every path, including early returns.
pub struct OpenFile {
    kernel: Rc<dyn KernelApi>,
    fd: Fd,
    path: String,
}

impl OpenFile {
    /// Opens `path` on `kernel`
    pub fn open(kernel: Rc<dyn KernelApi>, path: &str, mode: OpenMode) -> KResult<Self> {
        let fd = kernel.open(path, mode)?;
        Ok(Self {
            kernel,
            fd,
            path: path.to_string(),
        })
    }

    pub fn fd(&self) -> Fd {
        self.fd
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn read(&self) -> KResult<Value> {
        self.kernel.read(self.fd)
    }

    pub fn write(&self, data: Value) -> KResult<()> {
        self.kernel.write(self.fd, data)
    }

    pub fn ioctl(&self, request: u32, arg: Value) -> KResult<Value> {
        self.kernel.ioctl(self.fd, request, arg)
    }
}

impl Drop for OpenFile {
    fn drop(&mut self) {
        let _ = self.kernel.close(self.fd);
    }
}

impl std::fmt::Debug for OpenFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenFile")
            .field("fd", &self.fd)
            .field("path", &self.path)
            .finish()
    }
}
