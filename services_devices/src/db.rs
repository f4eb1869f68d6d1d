//! Database access device
//!
//! Bridges kernel calls to the persistence driver. `ioctl` answers at once.
//! `write` runs a request and parks its result against the descriptor; the
//! next `read` on that descriptor drains it.

use core_types::document;
use core_types::{DriverOp, Errno, Fd, KResult};
use kernel_api::{Capability, IoRequest, KernelRef};
use log::{debug, error};
use serde_json::{Map, Value};
use services_persistence::{Driver, DriverRequest};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Buffered bridge to the persistence driver
///
/// `/dev/db/{kind}` scopes every request to that entity kind unless the
/// argument names one.
pub struct DbDevice {
    kernel: KernelRef,
    driver: Rc<dyn Driver>,
    pending: RefCell<HashMap<Fd, Value>>,
    debug: bool,
}

impl DbDevice {
    pub fn new(kernel: KernelRef, driver: Rc<dyn Driver>) -> Self {
        Self {
            kernel,
            driver,
            pending: RefCell::new(HashMap::new()),
            debug: false,
        }
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Number of results waiting to be read
    pub fn pending_count(&self) -> usize {
        self.pending.borrow().len()
    }

    fn run(&self, request: &IoRequest, op: DriverOp, arg: Value) -> KResult<Value> {
        let mut arg = match arg {
            Value::Null => Map::new(),
            Value::Object(map) => map,
            _ => return Err(Errno::EINVAL),
        };
        if let Some(kind) = request.segment(0) {
            arg.entry(document::KIND.to_string())
                .or_insert_with(|| Value::from(kind));
        }
        if self.debug {
            debug!("db: {} on {}", op, request.path);
        }
        let result = self.driver.ioctl(
            &DriverRequest::new(request.fd, request.path.clone()),
            op,
            Value::Object(arg),
        );
        if let Err(errno) = &result {
            if *errno == Errno::EIO {
                error!("db: {} failed: {}", op, errno);
            }
        }
        result
    }
}

impl Capability for DbDevice {
    fn id(&self) -> &str {
        "db"
    }

    fn version(&self) -> &str {
        env!("CARGO_PKG_VERSION")
    }

    fn on_mount(&self) -> KResult<()> {
        self.kernel.get().map(|_| ())
    }

    fn on_unmount(&self) {
        self.pending.borrow_mut().clear();
    }

    /// Discards a result parked on a descriptor that was never read back
    fn on_close(&self, request: &IoRequest) {
        self.pending.borrow_mut().remove(&request.fd);
    }

    /// Drains the result parked by the last write on this descriptor
    fn read(&self, request: &IoRequest) -> KResult<Value> {
        self.pending
            .borrow_mut()
            .remove(&request.fd)
            .ok_or(Errno::ENOENT)
    }

    /// Runs `{ op, arg }` and parks the result
    ///
    /// A failed request parks nothing and returns the driver's error.
    fn write(&self, request: &IoRequest, data: Value) -> KResult<()> {
        let op = data
            .get("op")
            .and_then(Value::as_u64)
            .and_then(|code| u32::try_from(code).ok())
            .and_then(DriverOp::from_code)
            .ok_or(Errno::EINVAL)?;
        let arg = data.get("arg").cloned().unwrap_or(Value::Null);
        let result = self.run(request, op, arg)?;
        self.pending.borrow_mut().insert(request.fd, result);
        Ok(())
    }

    fn ioctl(&self, request: &IoRequest, code: u32, arg: Value) -> KResult<Value> {
        let op = DriverOp::from_code(code).ok_or(Errno::EINVAL)?;
        self.run(request, op, arg)
    }
}
