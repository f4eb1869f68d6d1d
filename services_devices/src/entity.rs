//! Entity access shared by devices

use crate::keys::{ENTITY_ID, ENTITY_PATH};
use core_types::document;
use core_types::{Errno, KResult, OpenMode};
use kernel_api::KernelRef;
use serde_json::Value;
use std::cell::RefCell;

/// The entity a request addresses
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Target {
    pub path: String,
    /// Key for effect lookups: `entityId` if given, else the last path
    /// segment
    pub id: String,
}

/// Remembers the entity chosen with `SET_CHARACTER`
#[derive(Debug, Default)]
pub(crate) struct Selection {
    current: RefCell<Option<String>>,
}

impl Selection {
    pub fn select(&self, arg: &Value) -> KResult<Value> {
        let path = document::require_str(arg, ENTITY_PATH)?.to_string();
        *self.current.borrow_mut() = Some(path.clone());
        Ok(Value::from(path))
    }

    pub fn current(&self) -> Option<String> {
        self.current.borrow().clone()
    }

    pub fn clear(&self) {
        self.current.borrow_mut().take();
    }

    /// Resolves the request's entity, failing with `EINVAL` when neither the
    /// argument nor the selection names one
    pub fn target(&self, arg: &Value) -> KResult<Target> {
        let path = match document::str_field(arg, ENTITY_PATH) {
            Some(path) => path.to_string(),
            None => self.current().ok_or(Errno::EINVAL)?,
        };
        let id = match document::str_field(arg, ENTITY_ID) {
            Some(id) => id.to_string(),
            None => last_segment(&path).ok_or(Errno::EINVAL)?.to_string(),
        };
        Ok(Target { path, id })
    }
}

fn last_segment(path: &str) -> Option<&str> {
    path.split('/').filter(|s| !s.is_empty()).last()
}

pub(crate) fn load(kernel: &KernelRef, path: &str) -> KResult<Value> {
    kernel.open(path, OpenMode::Read)?.read()
}

pub(crate) fn store(kernel: &KernelRef, path: &str, doc: Value) -> KResult<()> {
    kernel.open(path, OpenMode::Write)?.write(doc)
}

/// Integer at `properties.{key}`, accepting `{ "value": n }` or a bare `n`
pub(crate) fn raw_number(doc: &Value, key: &str) -> Option<i64> {
    let slot = doc.get(document::PROPERTIES)?.get(key)?;
    slot.get("value").and_then(Value::as_i64).or_else(|| slot.as_i64())
}

pub(crate) fn i64_field(arg: &Value, key: &str) -> Option<i64> {
    arg.get(key).and_then(Value::as_i64)
}
