//! # Namespace
//!
//! This crate provides the in-memory path tree the kernel resolves against.
//!
//! ## Philosophy
//!
//! - **Paths are opaque segments**: `/`-delimited, case-sensitive, empty
//!   segments stripped
//! - **The tree owns nodes**: directories, data documents, pipes and mount
//!   points all live here
//! - **Mount points do not own capabilities**: they hold a [`MountId`] that
//!   the capability registry resolves
//! - **Resolution stops at a mount**: the remaining segments are handed on
//!   untouched as the sub-path
//!
//! [`MountId`]: core_types::MountId

pub mod node;
pub mod path;
pub mod tree;

pub use node::{Directory, Node, NodeKind};
pub use path::PathResolver;
pub use tree::{Namespace, Resolution};
