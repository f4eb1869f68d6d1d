//! # Core Types
//!
//! This crate defines the fundamental types shared by every layer of the
//! game namespace: the kernel, mounted devices, path handlers and the
//! persistence driver.
//!
//! ## Philosophy
//!
//! - **One vocabulary**: Every boundary call returns a [`KResult`], whose
//!   error side is the fixed [`Errno`] taxonomy.
//! - **Stable numbers**: Error codes, driver operation codes and device
//!   request codes are literal values that handlers switch on.
//! - **Documents, not structs**: Entities travel as JSON documents with a
//!   `properties` map and a `metadata` block.
//!
//! ## Key Types
//!
//! - [`Errno`]: POSIX-styled error codes
//! - [`Fd`] / [`OpenMode`]: descriptor handle and access mode
//! - [`DriverOp`] / [`DeviceRequest`]: the two operation-code namespaces
//! - [`MountId`]: identity of one mounted capability instance

pub mod descriptor;
pub mod document;
pub mod errno;
pub mod ids;
pub mod ops;
pub mod roots;

pub use descriptor::{Fd, OpenMode};
pub use errno::{code_of, Errno, KResult};
pub use ids::MountId;
pub use ops::{DeviceRequest, DriverOp};
