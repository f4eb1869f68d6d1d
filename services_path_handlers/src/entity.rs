//! Entity resource handler

use crate::handler::{HandlerOutcome, PathHandler};
use crate::{driver_ioctl, segments_under, DATA, ENTITY_ID, KIND, SUB_ID, SUB_RESOURCE};
use core_types::document::{self, PROPERTIES};
use core_types::{DriverOp, Errno, KResult};
use kernel_api::{Clock, IoRequest};
use serde_json::{json, Map, Value};
use services_persistence::Driver;
use std::rc::Rc;

/// Parsed `{id}[/{subResource}[/{subId}]]` address
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EntityPath {
    pub entity_id: Option<String>,
    pub sub_resource: Option<String>,
    pub sub_id: Option<String>,
}

impl EntityPath {
    /// Parses the segments below a resource root
    ///
    /// Fails with `EINVAL` for more than three segments.
    pub fn parse(segments: &[&str]) -> KResult<Self> {
        if segments.len() > 3 {
            return Err(Errno::EINVAL);
        }
        let at = |i: usize| segments.get(i).map(|s| s.to_string());
        Ok(Self {
            entity_id: at(0),
            sub_resource: at(1),
            sub_id: at(2),
        })
    }
}

/// Serves `/root/{id}[/{subResource}[/{subId}]]` for one entity kind
pub struct EntityPathHandler {
    name: String,
    root: String,
    kind: String,
    driver: Rc<dyn Driver>,
    clock: Rc<dyn Clock>,
}

impl EntityPathHandler {
    pub fn new(
        root: impl Into<String>,
        kind: impl Into<String>,
        driver: Rc<dyn Driver>,
        clock: Rc<dyn Clock>,
    ) -> Self {
        let root = root.into();
        let kind = kind.into();
        Self {
            name: format!("entity:{}", kind),
            root,
            kind,
            driver,
            clock,
        }
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    fn parse(&self, request: &IoRequest) -> Option<KResult<EntityPath>> {
        segments_under(&request.path, &self.root).map(|segments| EntityPath::parse(&segments))
    }

    fn fetch(&self, request: &IoRequest, entity_id: &str) -> KResult<Value> {
        driver_ioctl(
            self.driver.as_ref(),
            request,
            DriverOp::GetById,
            json!({ ENTITY_ID: entity_id, KIND: self.kind }),
        )
    }

    fn store(&self, request: &IoRequest, entity_id: &str, doc: Value) -> KResult<()> {
        driver_ioctl(
            self.driver.as_ref(),
            request,
            DriverOp::Update,
            json!({ ENTITY_ID: entity_id, KIND: self.kind, DATA: doc }),
        )
        .map(|_| ())
    }

    fn read(&self, request: &IoRequest, path: EntityPath) -> KResult<Value> {
        let Some(entity_id) = path.entity_id else {
            return driver_ioctl(
                self.driver.as_ref(),
                request,
                DriverOp::GetAll,
                json!({ KIND: self.kind }),
            );
        };
        let doc = self.fetch(request, &entity_id)?;
        match path.sub_resource {
            None => Ok(doc),
            Some(sub) => project(&doc, &sub, path.sub_id.as_deref()),
        }
    }

    fn write(&self, request: &IoRequest, path: EntityPath, data: &Value) -> KResult<()> {
        let entity_id = path.entity_id.ok_or(Errno::EINVAL)?;
        let now = self.clock.now().as_millis();

        let Some(sub) = path.sub_resource else {
            if !data.is_object() {
                return Err(Errno::EINVAL);
            }
            let mut doc = data.clone();
            document::touch(&mut doc, now)?;
            return self.store(request, &entity_id, doc);
        };

        let mut doc = self.fetch(request, &entity_id)?;
        let properties = document::properties_mut(&mut doc)?;
        match path.sub_id {
            Some(sub_id) => {
                let slot = properties
                    .entry(sub)
                    .or_insert_with(|| Value::Object(Map::new()));
                if !slot.is_object() {
                    *slot = Value::Object(Map::new());
                }
                if let Value::Object(section) = slot {
                    section.insert(sub_id, data.clone());
                }
            }
            None => {
                properties.insert(sub, data.clone());
            }
        }
        document::touch(&mut doc, now)?;
        self.store(request, &entity_id, doc)
    }

    fn ioctl(&self, request: &IoRequest, path: EntityPath, op: DriverOp, arg: &Value) -> KResult<Value> {
        let mut arg = match arg {
            Value::Null => Map::new(),
            Value::Object(map) => map.clone(),
            _ => return Err(Errno::EINVAL),
        };
        match path.entity_id {
            Some(entity_id) => {
                arg.insert(ENTITY_ID.to_string(), Value::from(entity_id));
            }
            None if op.requires_id() => return Err(Errno::EINVAL),
            None => {}
        }
        if let Some(sub) = path.sub_resource {
            arg.insert(SUB_RESOURCE.to_string(), Value::from(sub));
        }
        if let Some(sub_id) = path.sub_id {
            arg.insert(SUB_ID.to_string(), Value::from(sub_id));
        }
        arg.entry(KIND.to_string())
            .or_insert_with(|| Value::from(self.kind.as_str()));
        driver_ioctl(self.driver.as_ref(), request, op, Value::Object(arg))
    }
}

/// Projects a sub-resource out of a whole entity
///
/// `properties[sub]` wins over a top-level field of the same name.
fn project(doc: &Value, sub: &str, sub_id: Option<&str>) -> KResult<Value> {
    let section = doc
        .get(PROPERTIES)
        .and_then(|properties| properties.get(sub))
        .or_else(|| doc.get(sub))
        .ok_or(Errno::ENOENT)?;
    match sub_id {
        None => Ok(section.clone()),
        Some(sub_id) => child(section, sub_id).cloned().ok_or(Errno::ENOENT),
    }
}

fn child<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    match value {
        Value::Object(map) => map.get(key),
        Value::Array(items) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    }
}

impl PathHandler for EntityPathHandler {
    fn name(&self) -> &str {
        &self.name
    }

    fn handle_read(&self, request: &IoRequest) -> HandlerOutcome<Value> {
        match self.parse(request) {
            None => HandlerOutcome::NotHandled,
            Some(path) => path.and_then(|path| self.read(request, path)).into(),
        }
    }

    fn handle_write(&self, request: &IoRequest, data: &Value) -> HandlerOutcome<()> {
        match self.parse(request) {
            None => HandlerOutcome::NotHandled,
            Some(path) => path.and_then(|path| self.write(request, path, data)).into(),
        }
    }

    fn handle_ioctl(&self, request: &IoRequest, code: u32, arg: &Value) -> HandlerOutcome<Value> {
        let Some(op) = DriverOp::from_code(code) else {
            return HandlerOutcome::NotHandled;
        };
        match self.parse(request) {
            None => HandlerOutcome::NotHandled,
            Some(path) => path.and_then(|path| self.ioctl(request, path, op, arg)).into(),
        }
    }
}
