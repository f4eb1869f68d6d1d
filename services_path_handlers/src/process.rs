//! Process-style resources: `{root}/list` and `{root}/{numericId}`

use crate::handler::{HandlerOutcome, PathHandler};
use crate::{driver_ioctl, driver_request, segments_under, DATA, ENTITY_ID, KIND};
use core_types::document;
use core_types::{DriverOp, Errno, KResult};
use kernel_api::IoRequest;
use log::error;
use serde_json::{json, Map, Value};
use services_persistence::Driver;
use std::rc::Rc;

/// Name of the list resource
pub const LIST: &str = "list";

enum Resource {
    List,
    Item(String),
}

/// Serves a list of all entities of one kind and items by numeric id
pub struct ProcessResourceHandler {
    name: String,
    root: String,
    kind: String,
    driver: Rc<dyn Driver>,
}

impl ProcessResourceHandler {
    pub fn new(root: impl Into<String>, kind: impl Into<String>, driver: Rc<dyn Driver>) -> Self {
        let kind = kind.into();
        Self {
            name: format!("process:{}", kind),
            root: root.into(),
            kind,
            driver,
        }
    }

    fn resource(&self, request: &IoRequest) -> Option<Resource> {
        match segments_under(&request.path, &self.root)?.as_slice() {
            [LIST] => Some(Resource::List),
            [id] if is_numeric(id) => Some(Resource::Item(id.to_string())),
            _ => None,
        }
    }

    fn list(&self, request: &IoRequest, arg: Map<String, Value>) -> KResult<Value> {
        let mut arg = arg;
        arg.insert(KIND.to_string(), Value::from(self.kind.as_str()));
        driver_ioctl(self.driver.as_ref(), request, DriverOp::GetAll, Value::Object(arg))
    }

    /// Reads the projection first and falls back to a fetch by id when the
    /// projection is not materialized yet
    fn read_item(&self, request: &IoRequest, id: &str) -> KResult<Value> {
        let projected = self.driver.read(&driver_request(request));
        if let Err(errno) = &projected {
            error!("driver read on {} failed: {}", request.path, errno);
        }
        let projected = projected?;
        if !document::is_empty(&projected) {
            return Ok(projected);
        }
        driver_ioctl(
            self.driver.as_ref(),
            request,
            DriverOp::GetById,
            json!({ ENTITY_ID: id, KIND: self.kind }),
        )
    }

    fn write_item(&self, request: &IoRequest, id: &str, data: &Value) -> KResult<()> {
        if !data.is_object() {
            return Err(Errno::EINVAL);
        }
        driver_ioctl(
            self.driver.as_ref(),
            request,
            DriverOp::Update,
            json!({ ENTITY_ID: id, KIND: self.kind, DATA: data }),
        )
        .map(|_| ())
    }

    fn ioctl_item(&self, request: &IoRequest, id: &str, op: DriverOp, arg: Map<String, Value>) -> KResult<Value> {
        if !op.requires_id() {
            return Err(Errno::EINVAL);
        }
        let mut arg = arg;
        arg.insert(ENTITY_ID.to_string(), Value::from(id));
        arg.insert(KIND.to_string(), Value::from(self.kind.as_str()));
        driver_ioctl(self.driver.as_ref(), request, op, Value::Object(arg))
    }
}

fn is_numeric(segment: &str) -> bool {
    !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit())
}

fn arg_map(arg: &Value) -> KResult<Map<String, Value>> {
    match arg {
        Value::Null => Ok(Map::new()),
        Value::Object(map) => Ok(map.clone()),
        _ => Err(Errno::EINVAL),
    }
}

impl PathHandler for ProcessResourceHandler {
    fn name(&self) -> &str {
        &self.name
    }

    fn handle_read(&self, request: &IoRequest) -> HandlerOutcome<Value> {
        match self.resource(request) {
            None => HandlerOutcome::NotHandled,
            Some(Resource::List) => self.list(request, Map::new()).into(),
            Some(Resource::Item(id)) => self.read_item(request, &id).into(),
        }
    }

    fn handle_write(&self, request: &IoRequest, data: &Value) -> HandlerOutcome<()> {
        match self.resource(request) {
            None => HandlerOutcome::NotHandled,
            Some(Resource::List) => HandlerOutcome::Handled(Err(Errno::EINVAL)),
            Some(Resource::Item(id)) => self.write_item(request, &id, data).into(),
        }
    }

    fn handle_ioctl(&self, request: &IoRequest, code: u32, arg: &Value) -> HandlerOutcome<Value> {
        let Some(op) = DriverOp::from_code(code) else {
            return HandlerOutcome::NotHandled;
        };
        let Some(resource) = self.resource(request) else {
            return HandlerOutcome::NotHandled;
        };
        let result = arg_map(arg).and_then(|arg| match resource {
            Resource::List => self.list(request, arg),
            Resource::Item(id) => self.ioctl_item(request, &id, op, arg),
        });
        result.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::Fd;
    use kernel_api::{Instant, ManualClock};
    use services_persistence::{DriverRequest, InMemoryDriver};

    fn setup() -> (ProcessResourceHandler, Rc<InMemoryDriver>) {
        let clock = Rc::new(ManualClock::new(Instant::from_millis(0)));
        let driver = Rc::new(InMemoryDriver::new(clock));
        for id in ["1", "2"] {
            driver
                .seed(document::new_entity(id, "character", Map::new(), 0))
                .unwrap();
        }
        driver
            .seed(document::new_entity("3", "schema", Map::new(), 0))
            .unwrap();
        let handler = ProcessResourceHandler::new("/proc/character", "character", driver.clone());
        (handler, driver)
    }

    fn req(path: &str) -> IoRequest {
        IoRequest::new(Fd::new(4), path, "/proc/character", Vec::new())
    }

    #[test]
    fn test_list_maps_to_get_all() {
        let (handler, _) = setup();
        match handler.handle_read(&req("/proc/character/list")) {
            HandlerOutcome::Handled(Ok(all)) => assert_eq!(all.as_array().map(Vec::len), Some(2)),
            other => panic!("unexpected {:?}", other),
        }
        // Any driver op on the list path is a listing.
        match handler.handle_ioctl(&req("/proc/character/list"), DriverOp::Delete.code(), &json!({})) {
            HandlerOutcome::Handled(Ok(all)) => assert!(all.is_array()),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_non_numeric_item_not_handled() {
        let (handler, _) = setup();
        assert_eq!(handler.handle_read(&req("/proc/character/abc")), HandlerOutcome::NotHandled);
        assert_eq!(handler.handle_read(&req("/proc/character/1/x")), HandlerOutcome::NotHandled);
        assert_eq!(handler.handle_read(&req("/proc/character")), HandlerOutcome::NotHandled);
    }

    #[test]
    fn test_cold_projection_falls_back_to_fetch() {
        let (handler, _) = setup();
        match handler.handle_read(&req("/proc/character/2")) {
            HandlerOutcome::Handled(Ok(doc)) => assert_eq!(doc["id"], "2"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_materialized_projection_wins() {
        let (handler, driver) = setup();
        driver
            .write(
                &DriverRequest::new(Fd::new(4), "/proc/character/2"),
                json!({ "status": "running" }),
            )
            .unwrap();
        assert_eq!(
            handler.handle_read(&req("/proc/character/2")),
            HandlerOutcome::Handled(Ok(json!({ "status": "running" })))
        );
    }

    #[test]
    fn test_item_kind_is_enforced() {
        let (handler, _) = setup();
        assert_eq!(
            handler.handle_read(&req("/proc/character/3")),
            HandlerOutcome::Handled(Err(Errno::ENOENT))
        );
    }

    #[test]
    fn test_item_ioctl_and_write() {
        let (handler, driver) = setup();
        assert_eq!(
            handler.handle_ioctl(&req("/proc/character/1"), DriverOp::Create.code(), &json!({})),
            HandlerOutcome::Handled(Err(Errno::EINVAL))
        );
        assert!(handler
            .handle_write(&req("/proc/character/1"), &json!({ "properties": { "hp": 9 } }))
            .is_handled());
        assert_eq!(driver.get("1").unwrap()["properties"]["hp"], 9);
        assert_eq!(
            handler.handle_write(&req("/proc/character/list"), &json!({})),
            HandlerOutcome::Handled(Err(Errno::EINVAL))
        );
        assert!(handler
            .handle_ioctl(&req("/proc/character/1"), DriverOp::Delete.code(), &Value::Null)
            .is_handled());
        assert!(driver.get("1").is_none());
    }
}
