//! Chain Short-circuit Integration Tests
//!
//! A definite answer from one handler, error or not, must keep every later
//! handler from running. Spies before and after a real entity handler count
//! their calls.

use core_types::{DriverOp, Errno, OpenMode};
use kernel_api::{IoRequest, KernelApi, ManualClock};
use serde_json::{json, Value};
use services_path_handlers::{
    EntityPathHandler, HandlerChain, HandlerOutcome, PathHandler, ResourceCapability,
};
use services_persistence::{FailingDriver, FailurePolicy, InMemoryDriver};
use std::cell::Cell;
use std::rc::Rc;
use vfs_kernel::{KernelConfig, VfsKernel};

/// Counts calls and never claims a path
struct Spy {
    name: &'static str,
    calls: Rc<Cell<usize>>,
}

impl Spy {
    fn hit<T>(&self) -> HandlerOutcome<T> {
        self.calls.set(self.calls.get() + 1);
        HandlerOutcome::NotHandled
    }
}

impl PathHandler for Spy {
    fn name(&self) -> &str {
        self.name
    }

    fn handle_read(&self, _request: &IoRequest) -> HandlerOutcome<Value> {
        self.hit()
    }

    fn handle_write(&self, _request: &IoRequest, _data: &Value) -> HandlerOutcome<()> {
        self.hit()
    }

    fn handle_ioctl(&self, _request: &IoRequest, _code: u32, _arg: &Value) -> HandlerOutcome<Value> {
        self.hit()
    }
}

struct Rig {
    kernel: Rc<VfsKernel>,
    driver: Rc<FailingDriver<InMemoryDriver>>,
    before: Rc<Cell<usize>>,
    after: Rc<Cell<usize>>,
}

fn rig() -> Rig {
    let clock = Rc::new(ManualClock::default());
    let kernel = VfsKernel::with_clock(KernelConfig::default(), clock.clone());
    let inner = InMemoryDriver::new(clock.clone());
    inner
        .seed(json!({ "id": "1", "kind": "entity", "properties": { "hp": 9 } }))
        .unwrap();
    let driver = Rc::new(FailingDriver::new(inner, FailurePolicy::Never));

    let before = Rc::new(Cell::new(0));
    let after = Rc::new(Cell::new(0));
    let chain = HandlerChain::new()
        .with_handler(Spy {
            name: "before",
            calls: before.clone(),
        })
        .with_handler(EntityPathHandler::new("/v_entity", "entity", driver.clone(), clock))
        .with_handler(Spy {
            name: "after",
            calls: after.clone(),
        });
    let chain = Rc::new(chain);
    kernel
        .mount("/v_entity", move |k| ResourceCapability::new("resource.v_entity", k, chain))
        .unwrap();
    kernel
        .mount("/v_other", {
            let chain = HandlerChain::new().with_handler(Spy {
                name: "after",
                calls: after.clone(),
            });
            let chain = Rc::new(chain);
            move |k| ResourceCapability::new("resource.v_other", k, chain)
        })
        .unwrap();

    Rig {
        kernel,
        driver,
        before,
        after,
    }
}

fn read(kernel: &VfsKernel, path: &str) -> Result<Value, Errno> {
    let fd = kernel.open(path, OpenMode::Read)?;
    let result = kernel.read(fd);
    kernel.close(fd)?;
    result
}

#[test]
fn test_success_stops_the_chain() {
    let rig = rig();
    assert_eq!(read(&rig.kernel, "/v_entity/1/hp").unwrap(), json!(9));
    assert_eq!(rig.before.get(), 1);
    assert_eq!(rig.after.get(), 0);
}

#[test]
fn test_not_found_stops_the_chain() {
    let rig = rig();
    assert_eq!(read(&rig.kernel, "/v_entity/404"), Err(Errno::ENOENT));
    assert_eq!(rig.after.get(), 0);
}

#[test]
fn test_driver_failure_stops_the_chain() {
    let rig = rig();
    rig.driver.set_policy(FailurePolicy::OnOps(vec![DriverOp::GetById]));

    assert_eq!(read(&rig.kernel, "/v_entity/1"), Err(Errno::EIO));

    let fd = rig.kernel.open("/v_entity/1/hp", OpenMode::Write).unwrap();
    assert_eq!(rig.kernel.write(fd, json!(3)), Err(Errno::EIO));
    rig.kernel.close(fd).unwrap();

    assert_eq!(rig.before.get(), 2);
    assert_eq!(rig.after.get(), 0);
    // The read-modify-write aborted before any update reached the driver.
    assert_eq!(rig.driver.inner().get("1").unwrap()["properties"]["hp"], 9);
}

#[test]
fn test_invalid_ioctl_argument_stops_the_chain() {
    let rig = rig();
    let fd = rig.kernel.open("/v_entity/1", OpenMode::ReadWrite).unwrap();
    assert_eq!(
        rig.kernel.ioctl(fd, DriverOp::Update.code(), json!("not an object")),
        Err(Errno::EINVAL)
    );
    rig.kernel.close(fd).unwrap();
    assert_eq!(rig.after.get(), 0);
}

#[test]
fn test_unclaimed_request_runs_every_handler() {
    let rig = rig();
    let fd = rig.kernel.open("/v_entity/1", OpenMode::ReadWrite).unwrap();
    // Not a driver op, so the entity handler passes.
    assert_eq!(rig.kernel.ioctl(fd, 99, json!({})), Err(Errno::EINVAL));
    rig.kernel.close(fd).unwrap();
    assert_eq!(rig.before.get(), 1);
    assert_eq!(rig.after.get(), 1);

    assert_eq!(read(&rig.kernel, "/v_other/x"), Err(Errno::EINVAL));
    assert_eq!(rig.after.get(), 2);
}
