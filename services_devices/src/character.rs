//! Character device

use crate::entity::{load, store, Selection};
use crate::keys::{ENTITY_PATH, PROPERTIES};
use core_types::document;
use core_types::roots::{PIPES, VAR_RUN};
use core_types::{DeviceRequest, Errno, KResult, OpenMode};
use kernel_api::{ensure_dir_all, Capability, IoRequest, KernelRef};
use log::{debug, error};
use serde_json::{json, Value};

/// Directory holding one status record per initialized character
pub fn status_dir() -> String {
    format!("{}/character", VAR_RUN)
}

/// Channel update events are published on
pub fn event_pipe() -> String {
    format!("{}/entity", PIPES)
}

/// Maintains process-status records and applies partial property updates
///
/// A write of `{ entityPath?, properties }` merges `properties` into the
/// entity, bumps `metadata.updatedAt` and publishes an event on
/// `/pipes/entity`. When that pipe is full the event is dropped and the
/// write still succeeds.
pub struct CharacterDevice {
    kernel: KernelRef,
    selection: Selection,
    debug: bool,
}

impl CharacterDevice {
    pub fn new(kernel: KernelRef) -> Self {
        Self {
            kernel,
            selection: Selection::default(),
            debug: false,
        }
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    fn status_path(id: &str) -> String {
        format!("{}/{}", status_dir(), id)
    }

    fn put(&self, path: &str, record: Value) -> KResult<()> {
        let kernel = self.kernel.get()?;
        if kernel.exists(path) {
            store(&self.kernel, path, record)
        } else {
            kernel.create(path, record)
        }
    }

    fn initialize(&self, arg: &Value) -> KResult<Value> {
        let target = self.selection.target(arg)?;
        load(&self.kernel, &target.path)?;
        let now = self.kernel.get()?.now().as_millis();
        let record = json!({
            "entityId": target.id,
            "entityPath": target.path,
            "status": "active",
            "startedAt": now,
            "updatedAt": now,
        });
        self.put(&Self::status_path(&target.id), record.clone())?;
        if document::str_field(arg, ENTITY_PATH).is_some() {
            self.selection.select(arg)?;
        }
        if self.debug {
            debug!("character: initialized {}", target.path);
        }
        Ok(record)
    }

    fn update(&self, data: &Value) -> KResult<()> {
        let partial = data
            .get(PROPERTIES)
            .and_then(Value::as_object)
            .ok_or(Errno::EINVAL)?;
        let target = self.selection.target(data)?;
        let mut doc = load(&self.kernel, &target.path)?;
        let now = self.kernel.get()?.now().as_millis();
        document::merge_properties(&mut doc, partial)?;
        document::touch(&mut doc, now)?;
        store(&self.kernel, &target.path, doc)?;

        let status = Self::status_path(&target.id);
        let kernel = self.kernel.get()?;
        if kernel.exists(&status) {
            let mut record = load(&self.kernel, &status)?;
            if let Some(map) = record.as_object_mut() {
                map.insert("updatedAt".to_string(), Value::from(now));
            }
            store(&self.kernel, &status, record)?;
        }

        let pipe = event_pipe();
        if kernel.exists(&pipe) {
            let keys: Vec<&String> = partial.keys().collect();
            let event = json!({
                "event": "entity.updated",
                "entityId": target.id,
                "entityPath": target.path,
                "keys": keys,
                "at": now,
            });
            match self.kernel.open(&pipe, OpenMode::Write)?.write(event) {
                // Nobody is draining the pipe; the update itself stands.
                Err(Errno::EAGAIN) => {
                    if self.debug {
                        debug!("{} full, dropped event for {}", pipe, target.id);
                    }
                }
                other => other?,
            }
        }
        Ok(())
    }

    fn status(&self, id: &str) -> KResult<Value> {
        load(&self.kernel, &Self::status_path(id))
    }
}

impl Capability for CharacterDevice {
    fn id(&self) -> &str {
        "character"
    }

    fn version(&self) -> &str {
        env!("CARGO_PKG_VERSION")
    }

    /// Creates the status directory unless it already exists
    fn on_mount(&self) -> KResult<()> {
        let kernel = self.kernel.get()?;
        ensure_dir_all(kernel.as_ref(), &status_dir())
    }

    fn on_unmount(&self) {
        self.selection.clear();
    }

    /// `/dev/character/{id}` reads a status record; the device root reads
    /// the selected character's record, or the ids of every record
    fn read(&self, request: &IoRequest) -> KResult<Value> {
        if let Some(id) = request.segment(0) {
            return self.status(id);
        }
        match self.selection.target(&Value::Null) {
            Ok(target) => self.status(&target.id),
            Err(_) => load(&self.kernel, &status_dir()),
        }
    }

    fn write(&self, request: &IoRequest, data: Value) -> KResult<()> {
        if self.debug {
            debug!("character: write on {}", request.path);
        }
        let result = self.update(&data);
        if let Err(Errno::EIO) = result {
            error!("character: update failed: {}", Errno::EIO);
        }
        result
    }

    fn ioctl(&self, _request: &IoRequest, code: u32, arg: Value) -> KResult<Value> {
        match DeviceRequest::from_code(code) {
            Some(DeviceRequest::Initialize) => self.initialize(&arg),
            Some(DeviceRequest::SetCharacter) => self.selection.select(&arg),
            _ => Err(Errno::EINVAL),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kernel_api::{Instant, KernelApi, ManualClock};
    use std::rc::Rc;
    use vfs_kernel::{KernelConfig, VfsKernel};

    fn boot() -> (Rc<VfsKernel>, Rc<ManualClock>) {
        let clock = Rc::new(ManualClock::new(Instant::from_millis(5)));
        let kernel = VfsKernel::with_clock(KernelConfig::default(), clock.clone());
        kernel.mount("/dev/character", CharacterDevice::new).unwrap();
        kernel
            .create(
                "/entity/character/7",
                json!({ "id": "7", "properties": { "name": "Valeros", "hp": 12 }, "metadata": {} }),
            )
            .unwrap();
        (kernel, clock)
    }

    fn read(kernel: &VfsKernel, path: &str) -> KResult<Value> {
        let fd = kernel.open(path, OpenMode::Read)?;
        let result = kernel.read(fd);
        kernel.close(fd)?;
        result
    }

    #[test]
    fn test_mount_creates_status_dir_once() {
        let (kernel, _) = boot();
        assert!(kernel.exists("/var/run/character"));
        // Remounting elsewhere finds the directory already present.
        kernel.mount("/dev/character2", CharacterDevice::new).unwrap();
    }

    #[test]
    fn test_initialize_creates_status_record() {
        let (kernel, _) = boot();
        let fd = kernel.open("/dev/character", OpenMode::ReadWrite).unwrap();
        let record = kernel
            .ioctl(
                fd,
                DeviceRequest::Initialize.code(),
                json!({ "entityPath": "/entity/character/7" }),
            )
            .unwrap();
        assert_eq!(record["status"], "active");
        assert_eq!(read(&kernel, "/var/run/character/7").unwrap()["entityId"], "7");
        assert_eq!(kernel.read(fd).unwrap()["startedAt"], 5);
        assert_eq!(read(&kernel, "/dev/character/7").unwrap()["status"], "active");
        kernel.close(fd).unwrap();
    }

    #[test]
    fn test_write_merges_touches_and_publishes() {
        let (kernel, clock) = boot();
        clock.set(Instant::from_millis(900));
        let fd = kernel.open("/dev/character", OpenMode::Write).unwrap();
        kernel
            .write(
                fd,
                json!({ "entityPath": "/entity/character/7", "properties": { "hp": 7 } }),
            )
            .unwrap();
        kernel.close(fd).unwrap();

        let doc = read(&kernel, "/entity/character/7").unwrap();
        assert_eq!(doc["properties"]["hp"], 7);
        assert_eq!(doc["properties"]["name"], "Valeros");
        assert_eq!(doc["metadata"]["updatedAt"], 900);

        let event = read(&kernel, "/pipes/entity").unwrap();
        assert_eq!(event["entityId"], "7");
        assert_eq!(event["keys"], json!(["hp"]));
        assert_eq!(read(&kernel, "/pipes/entity"), Err(Errno::EAGAIN));
    }

    #[test]
    fn test_full_event_pipe_does_not_fail_update() {
        let kernel = VfsKernel::new(KernelConfig {
            pipe_capacity: 1,
            ..KernelConfig::default()
        });
        kernel.mount("/dev/character", CharacterDevice::new).unwrap();
        kernel
            .create(
                "/entity/character/7",
                json!({ "id": "7", "properties": { "hp": 12 }, "metadata": {} }),
            )
            .unwrap();

        let fd = kernel.open("/dev/character", OpenMode::Write).unwrap();
        for hp in [10, 8, 6] {
            kernel
                .write(
                    fd,
                    json!({ "entityPath": "/entity/character/7", "properties": { "hp": hp } }),
                )
                .unwrap();
        }
        kernel.close(fd).unwrap();

        assert_eq!(read(&kernel, "/entity/character/7").unwrap()["properties"]["hp"], 6);
        let event = read(&kernel, "/pipes/entity").unwrap();
        assert_eq!(event["keys"], json!(["hp"]));
        assert_eq!(read(&kernel, "/pipes/entity"), Err(Errno::EAGAIN));
    }

    #[test]
    fn test_write_requires_payload_and_entity() {
        let (kernel, _) = boot();
        let fd = kernel.open("/dev/character", OpenMode::Write).unwrap();
        assert_eq!(
            kernel.write(fd, json!({ "entityPath": "/entity/character/7" })),
            Err(Errno::EINVAL)
        );
        assert_eq!(
            kernel.write(fd, json!({ "properties": { "hp": 1 } })),
            Err(Errno::EINVAL)
        );
        assert_eq!(
            kernel.write(
                fd,
                json!({ "entityPath": "/entity/character/99", "properties": {} })
            ),
            Err(Errno::ENOENT)
        );
        kernel.close(fd).unwrap();
    }

    #[test]
    fn test_root_read_without_selection_lists_records() {
        let (kernel, _) = boot();
        assert_eq!(read(&kernel, "/dev/character").unwrap(), json!([]));
    }
}
