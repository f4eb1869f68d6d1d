//! # Failing Driver
//!
//! A Driver wrapper that can simulate persistence failures.
//! Useful for checking that handlers and devices propagate I/O errors
//! unchanged instead of swallowing them.

use crate::driver::{Driver, DriverRequest};
use core_types::{DriverOp, Errno, KResult};
use serde_json::Value;
use std::cell::{Cell, RefCell};

/// Policy for when failures should occur
#[derive(Debug, Clone)]
pub enum FailurePolicy {
    /// Never fail (passthrough)
    Never,
    /// Fail every call after N successful ones
    AfterCalls(usize),
    /// Fail these ioctl operations
    OnOps(Vec<DriverOp>),
}

/// Wrapper around a Driver that can simulate failures
pub struct FailingDriver<D: Driver> {
    inner: D,
    policy: RefCell<FailurePolicy>,
    call_count: Cell<usize>,
}

impl<D: Driver> FailingDriver<D> {
    /// Create a new failing driver with the given policy
    pub fn new(inner: D, policy: FailurePolicy) -> Self {
        Self {
            inner,
            policy: RefCell::new(policy),
            call_count: Cell::new(0),
        }
    }

    /// Get the underlying driver (for inspection)
    pub fn inner(&self) -> &D {
        &self.inner
    }

    /// Get the number of calls that have occurred
    pub fn call_count(&self) -> usize {
        self.call_count.get()
    }

    /// Reset the failure policy
    pub fn set_policy(&self, policy: FailurePolicy) {
        *self.policy.borrow_mut() = policy;
        self.call_count.set(0);
    }

    fn check(&self, op: Option<DriverOp>) -> KResult<()> {
        let count = self.call_count.get();
        self.call_count.set(count + 1);
        let fail = match &*self.policy.borrow() {
            FailurePolicy::Never => false,
            FailurePolicy::AfterCalls(n) => count >= *n,
            FailurePolicy::OnOps(ops) => op.map(|op| ops.contains(&op)).unwrap_or(false),
        };
        if fail {
            Err(Errno::EIO)
        } else {
            Ok(())
        }
    }
}

impl<D: Driver> Driver for FailingDriver<D> {
    fn read(&self, request: &DriverRequest) -> KResult<Value> {
        self.check(None)?;
        self.inner.read(request)
    }

    fn write(&self, request: &DriverRequest, data: Value) -> KResult<()> {
        self.check(None)?;
        self.inner.write(request, data)
    }

    fn ioctl(&self, request: &DriverRequest, op: DriverOp, arg: Value) -> KResult<Value> {
        self.check(Some(op))?;
        self.inner.ioctl(request, op, arg)
    }
}
