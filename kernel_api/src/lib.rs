//! # Kernel API
//!
//! This crate defines the interface between the namespace kernel, the
//! capabilities (devices) mounted into it, and the code that drives both.
//!
//! ## Philosophy
//!
//! The kernel provides **mechanisms**, not game rules:
//! - Paths and descriptors (not bespoke CRUD methods)
//! - Uniform `read` / `write` / `ioctl` (not per-subsystem APIs)
//! - Explicit kernel references (never an ambient global)
//! - Explicit time (controllable in tests)
//!
//! ## Design Goals
//!
//! 1. **Testability**: The entire API can be implemented in-process and inspected
//! 2. **Explicitness**: Capabilities are handed their kernel at construction
//! 3. **Uniformity**: Every subsystem is reached through the same three calls
//! 4. **Simplicity**: Minimal surface area
//!
//! ## Non-Goals
//!
//! This is NOT:
//! - A multi-process or multi-host filesystem
//! - Durable storage
//! - A permission system (beyond a single error code)

pub mod capability;
pub mod kernel;
pub mod kernel_ref;
pub mod open_file;
pub mod time;

pub use capability::{Capability, IoRequest};
pub use kernel::{ensure_dir_all, KernelApi};
pub use kernel_ref::KernelRef;
pub use open_file::OpenFile;
pub use time::{Clock, Instant, ManualClock, SystemClock};
