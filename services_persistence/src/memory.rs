//! In-memory persistence backend

use crate::driver::{Driver, DriverRequest};
use core_types::document::{self, ID, KIND, PROPERTIES};
use core_types::{DriverOp, Errno, KResult};
use kernel_api::Clock;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

/// Argument keys
pub const ENTITY_ID: &str = "entityId";
pub const DATA: &str = "data";
pub const WHERE: &str = "where";
pub const SUB_RESOURCE: &str = "subResource";
pub const SUB_ID: &str = "subId";

/// A mutation observed by the driver
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ChangeEvent {
    Created { id: String, kind: String },
    Updated { id: String, kind: String },
    Deleted { id: String, kind: String },
}

#[derive(Debug, Default)]
struct Store {
    entities: BTreeMap<String, Value>,
    projections: HashMap<String, Value>,
    changes: Vec<ChangeEvent>,
    next_id: u64,
}

impl Store {
    fn allocate_id(&mut self) -> String {
        loop {
            self.next_id += 1;
            let id = self.next_id.to_string();
            if !self.entities.contains_key(&id) {
                return id;
            }
        }
    }

    fn record(&mut self, event: ChangeEvent) {
        // Any mutation may change what a projection would show.
        self.projections.clear();
        self.changes.push(event);
    }
}

/// Entity store held in memory
///
/// Entities are keyed by id and carry their kind; lookups that name a kind
/// only see entities of that kind. Ids allocated by `CREATE` are decimal
/// numbers.
pub struct InMemoryDriver {
    store: RefCell<Store>,
    clock: Rc<dyn Clock>,
}

impl InMemoryDriver {
    pub fn new(clock: Rc<dyn Clock>) -> Self {
        Self {
            store: RefCell::new(Store::default()),
            clock,
        }
    }

    /// Stores a complete document directly, bypassing the change log
    ///
    /// Fails with `EINVAL` if the document lacks an `id` or `kind`.
    pub fn seed(&self, doc: Value) -> KResult<()> {
        let id = document::require_str(&doc, ID)?.to_string();
        document::require_str(&doc, KIND)?;
        self.store.borrow_mut().entities.insert(id, doc);
        Ok(())
    }

    /// Returns a stored document
    pub fn get(&self, id: &str) -> Option<Value> {
        self.store.borrow().entities.get(id).cloned()
    }

    /// Every mutation recorded so far
    pub fn changes(&self) -> Vec<ChangeEvent> {
        self.store.borrow().changes.clone()
    }

    pub fn len(&self) -> usize {
        self.store.borrow().entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.borrow().entities.is_empty()
    }

    fn now_millis(&self) -> u64 {
        self.clock.now().as_millis()
    }

    fn lookup(&self, arg: &Value) -> KResult<Value> {
        let id = document::require_str(arg, ENTITY_ID)?;
        let store = self.store.borrow();
        let doc = store.entities.get(id).ok_or(Errno::ENOENT)?;
        if !kind_matches(doc, arg) {
            return Err(Errno::ENOENT);
        }
        Ok(doc.clone())
    }

    fn get_all(&self, arg: &Value) -> Value {
        let store = self.store.borrow();
        let docs: Vec<Value> = store
            .entities
            .values()
            .filter(|doc| kind_matches(doc, arg))
            .cloned()
            .collect();
        Value::Array(docs)
    }

    fn create(&self, arg: &Value) -> KResult<Value> {
        let kind = document::require_str(arg, KIND)?.to_string();
        let properties = match arg.get(DATA).or_else(|| arg.get(PROPERTIES)) {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(data)) => match data.get(PROPERTIES) {
                Some(Value::Object(inner)) => inner.clone(),
                Some(_) => return Err(Errno::EINVAL),
                None => data.clone(),
            },
            Some(_) => return Err(Errno::EINVAL),
        };
        let now = self.now_millis();

        let mut store = self.store.borrow_mut();
        let id = match document::str_field(arg, ENTITY_ID).or_else(|| document::str_field(arg, ID)) {
            Some(id) if store.entities.contains_key(id) => return Err(Errno::EEXIST),
            Some(id) => id.to_string(),
            None => store.allocate_id(),
        };
        let doc = document::new_entity(&id, &kind, properties, now);
        store.entities.insert(id.clone(), doc.clone());
        store.record(ChangeEvent::Created { id, kind });
        Ok(doc)
    }

    fn update(&self, arg: &Value) -> KResult<Value> {
        let id = document::require_str(arg, ENTITY_ID)?.to_string();
        if let Some(sub) = document::str_field(arg, SUB_RESOURCE) {
            let data = arg.get(DATA).cloned().ok_or(Errno::EINVAL)?;
            let sub_id = document::str_field(arg, SUB_ID);
            return self.edit_slot(&id, arg, |properties| {
                match sub_id {
                    Some(sub_id) => {
                        section_mut(properties, sub)?.insert(sub_id.to_string(), data);
                    }
                    None => {
                        properties.insert(sub.to_string(), data);
                    }
                }
                Ok(())
            });
        }
        let data = match arg.get(DATA) {
            Some(Value::Object(data)) => data.clone(),
            _ => return Err(Errno::EINVAL),
        };

        let mut store = self.store.borrow_mut();
        let existing = store.entities.get(&id).ok_or(Errno::ENOENT)?;
        if !kind_matches(existing, arg) {
            return Err(Errno::ENOENT);
        }
        let kind = existing
            .get(KIND)
            .cloned()
            .unwrap_or(Value::Null);
        let kind_name = kind.as_str().unwrap_or_default().to_string();

        let mut doc = Value::Object(data);
        if let Some(map) = doc.as_object_mut() {
            map.insert(ID.to_string(), Value::from(id.as_str()));
            map.insert(KIND.to_string(), kind);
        }
        store.entities.insert(id.clone(), doc.clone());
        store.record(ChangeEvent::Updated {
            id,
            kind: kind_name,
        });
        Ok(doc)
    }

    /// Applies `edit` to the entity's `properties`, touches it and records
    /// an update
    fn edit_slot(
        &self,
        id: &str,
        arg: &Value,
        edit: impl FnOnce(&mut Map<String, Value>) -> KResult<()>,
    ) -> KResult<Value> {
        let now = self.now_millis();
        let mut store = self.store.borrow_mut();
        let doc = store.entities.get_mut(id).ok_or(Errno::ENOENT)?;
        if !kind_matches(doc, arg) {
            return Err(Errno::ENOENT);
        }
        edit(document::properties_mut(doc)?)?;
        document::touch(doc, now)?;

        let doc = doc.clone();
        let kind = document::str_field(&doc, KIND).unwrap_or_default().to_string();
        store.record(ChangeEvent::Updated {
            id: id.to_string(),
            kind,
        });
        Ok(doc)
    }

    fn delete(&self, arg: &Value) -> KResult<Value> {
        if let Some(sub) = document::str_field(arg, SUB_RESOURCE) {
            let id = document::require_str(arg, ENTITY_ID)?;
            let sub_id = document::str_field(arg, SUB_ID);
            return self.edit_slot(id, arg, |properties| {
                let removed = match sub_id {
                    Some(sub_id) => properties
                        .get_mut(sub)
                        .and_then(Value::as_object_mut)
                        .and_then(|section| section.remove(sub_id)),
                    None => properties.remove(sub),
                };
                removed.map(|_| ()).ok_or(Errno::ENOENT)
            });
        }
        let doc = self.lookup(arg)?;
        let id = document::require_str(&doc, ID)?.to_string();
        let kind = document::str_field(&doc, KIND).unwrap_or_default().to_string();
        let mut store = self.store.borrow_mut();
        store.entities.remove(&id);
        store.record(ChangeEvent::Deleted { id, kind });
        Ok(doc)
    }

    fn query(&self, arg: &Value) -> KResult<Value> {
        let filter = match arg.get(WHERE) {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(filter)) => filter.clone(),
            Some(_) => return Err(Errno::EINVAL),
        };
        let store = self.store.borrow();
        let docs: Vec<Value> = store
            .entities
            .values()
            .filter(|doc| kind_matches(doc, arg))
            .filter(|doc| {
                filter
                    .iter()
                    .all(|(key, expected)| doc.get(PROPERTIES).and_then(|p| p.get(key)) == Some(expected))
            })
            .cloned()
            .collect();
        Ok(Value::Array(docs))
    }
}

/// The object at `properties[sub]`, replacing a missing or scalar value
fn section_mut<'a>(
    properties: &'a mut Map<String, Value>,
    sub: &str,
) -> KResult<&'a mut Map<String, Value>> {
    let slot = properties
        .entry(sub.to_string())
        .or_insert_with(|| Value::Object(Map::new()));
    if !slot.is_object() {
        *slot = Value::Object(Map::new());
    }
    slot.as_object_mut().ok_or(Errno::EINVAL)
}

fn kind_matches(doc: &Value, arg: &Value) -> bool {
    match document::str_field(arg, KIND) {
        Some(kind) => document::str_field(doc, KIND) == Some(kind),
        None => true,
    }
}

impl Driver for InMemoryDriver {
    /// Returns the materialized projection for the path, or `null`
    fn read(&self, request: &DriverRequest) -> KResult<Value> {
        Ok(self
            .store
            .borrow()
            .projections
            .get(&request.path)
            .cloned()
            .unwrap_or(Value::Null))
    }

    /// Materializes a projection for the path
    fn write(&self, request: &DriverRequest, data: Value) -> KResult<()> {
        self.store
            .borrow_mut()
            .projections
            .insert(request.path.clone(), data);
        Ok(())
    }

    fn ioctl(&self, _request: &DriverRequest, op: DriverOp, arg: Value) -> KResult<Value> {
        match op {
            DriverOp::GetById => self.lookup(&arg),
            DriverOp::GetAll => Ok(self.get_all(&arg)),
            DriverOp::Create => self.create(&arg),
            DriverOp::Update => self.update(&arg),
            DriverOp::Delete => self.delete(&arg),
            DriverOp::Query => self.query(&arg),
        }
    }
}
