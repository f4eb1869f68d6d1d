//! Scenario Test Utilities
//!
//! This crate provides shared utilities for cross-crate scenario tests.
//!
//! ## Test Philosophy
//!
//! - **Through the kernel**: Scenarios drive the system only with
//!   open/read/write/ioctl/close, the way an application would
//! - **Deterministic time**: Every system runs on a [`ManualClock`]
//! - **No leaks**: Helpers close what they open; tests can assert the
//!   descriptor table is empty afterwards

use core_types::{DriverOp, KResult, OpenMode};
use kernel_api::{Instant, KernelApi, ManualClock};
use serde_json::{json, Value};
use std::rc::Rc;
use system_boot::{boot_with_clock, BootConfig, System};

/// Start time of every test system, in epoch milliseconds
pub const START_MILLIS: u64 = 1_000;

/// Boots the default system on a manual clock
pub fn test_system() -> (System, Rc<ManualClock>) {
    let clock = Rc::new(ManualClock::new(Instant::from_millis(START_MILLIS)));
    let system = match boot_with_clock(&BootConfig::default(), clock.clone()) {
        Ok(system) => system,
        Err(err) => panic!("test system failed to boot: {}", err),
    };
    (system, clock)
}

/// Creates a character through `/v_character` and returns its id
pub fn create_character(system: &System, properties: Value) -> KResult<String> {
    let doc = ioctl(
        system,
        "/v_character",
        DriverOp::Create.code(),
        json!({ "data": { "properties": properties } }),
    )?;
    Ok(doc["id"].as_str().unwrap_or_default().to_string())
}

/// Opens, reads and closes
pub fn read_path(system: &System, path: &str) -> KResult<Value> {
    let fd = system.kernel.open(path, OpenMode::Read)?;
    let result = system.kernel.read(fd);
    system.kernel.close(fd)?;
    result
}

/// Opens, writes and closes
pub fn write_path(system: &System, path: &str, data: Value) -> KResult<()> {
    let fd = system.kernel.open(path, OpenMode::Write)?;
    let result = system.kernel.write(fd, data);
    system.kernel.close(fd)?;
    result
}

/// Opens, issues one ioctl and closes
pub fn ioctl(system: &System, path: &str, code: u32, arg: Value) -> KResult<Value> {
    let fd = system.kernel.open(path, OpenMode::ReadWrite)?;
    let result = system.kernel.ioctl(fd, code, arg);
    system.kernel.close(fd)?;
    result
}
