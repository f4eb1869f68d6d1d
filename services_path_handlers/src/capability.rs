//! Mountable front for a handler chain

use crate::chain::HandlerChain;
use crate::handler::HandlerOutcome;
use core_types::{Errno, KResult};
use kernel_api::{Capability, IoRequest, KernelRef};
use log::{debug, error};
use serde_json::Value;
use std::rc::Rc;

/// A capability that answers every call through a [`HandlerChain`]
///
/// Several mounts may share one chain; each handler matches on the full
/// path, so the same chain serves `/v_entity`, `/v_character` and friends.
/// A call no handler claims fails with `EINVAL`.
pub struct ResourceCapability {
    id: String,
    kernel: KernelRef,
    chain: Rc<HandlerChain>,
    debug: bool,
}

impl ResourceCapability {
    pub fn new(id: impl Into<String>, kernel: KernelRef, chain: Rc<HandlerChain>) -> Self {
        Self {
            id: id.into(),
            kernel,
            chain,
            debug: false,
        }
    }

    /// Enables per-call tracing
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    fn settle<T>(&self, op: &str, request: &IoRequest, outcome: HandlerOutcome<T>) -> KResult<T> {
        let result = match outcome {
            HandlerOutcome::Handled(result) => result,
            HandlerOutcome::NotHandled => {
                if self.debug {
                    debug!("{}: no handler for {} {}", self.id, op, request.path);
                }
                Err(Errno::EINVAL)
            }
        };
        if let Err(Errno::EIO) = result {
            error!("{}: {} {} failed: {}", self.id, op, request.path, Errno::EIO);
        }
        result
    }
}

impl Capability for ResourceCapability {
    fn id(&self) -> &str {
        &self.id
    }

    fn version(&self) -> &str {
        env!("CARGO_PKG_VERSION")
    }

    fn on_mount(&self) -> KResult<()> {
        self.kernel.get()?;
        if self.debug {
            debug!("{}: {} handlers", self.id, self.chain.len());
        }
        Ok(())
    }

    fn read(&self, request: &IoRequest) -> KResult<Value> {
        self.settle("read", request, self.chain.read(request))
    }

    fn write(&self, request: &IoRequest, data: Value) -> KResult<()> {
        self.settle("write", request, self.chain.write(request, &data))
    }

    fn ioctl(&self, request: &IoRequest, code: u32, arg: Value) -> KResult<Value> {
        self.settle("ioctl", request, self.chain.ioctl(request, code, &arg))
    }
}
