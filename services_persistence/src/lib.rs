//! # Persistence Service
//!
//! This crate defines the contract between the namespace core and the
//! persistence collaborator that actually stores entities.
//!
//! ## Philosophy
//!
//! **The core never talks to storage directly.** Path handlers and devices
//! hold an `Rc<dyn Driver>` and speak the same read/write/ioctl triad the
//! kernel uses, with [`DriverOp`](core_types::DriverOp) codes naming the
//! CRUD intent.
//!
//! ## Design
//!
//! - **Driver**: the collaborator interface
//! - **InMemoryDriver**: a complete reference backend with a change log and
//!   a path-keyed projection cache
//! - **FailingDriver**: a wrapper that injects `EIO` for error-path tests

pub mod driver;
pub mod failing_driver;
pub mod memory;

pub use driver::{Driver, DriverRequest};
pub use failing_driver::{FailingDriver, FailurePolicy};
pub use memory::{ChangeEvent, InMemoryDriver};
