//! # Capability Registry
//!
//! This crate holds the capability instances mounted into a kernel.
//!
//! ## Philosophy
//!
//! The namespace tree only knows that a path is a mount point and which
//! [`MountId`] it carries. The registry owns the capability behind that id,
//! together with the [`KernelRef`] it was constructed with, so that
//! unmounting can detach the reference and drop the instance in one place.

use core_types::{Errno, MountId};
use kernel_api::{Capability, KernelRef};
use std::collections::HashMap;
use std::rc::Rc;

/// Error types for registry operations
#[derive(Debug, PartialEq, Eq)]
pub enum RegistryError {
    /// Mount id already registered
    AlreadyRegistered(MountId),
    /// Mount path already taken
    PathAlreadyMounted(String),
    /// Mount id not found
    NotFound(MountId),
    /// Mount path not found
    PathNotFound(String),
}

impl From<RegistryError> for Errno {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::AlreadyRegistered(_) | RegistryError::PathAlreadyMounted(_) => {
                Errno::EBUSY
            }
            RegistryError::NotFound(_) | RegistryError::PathNotFound(_) => Errno::ENOENT,
        }
    }
}

/// Public description of a mounted capability
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountDescriptor {
    pub id: MountId,
    pub path: String,
    pub capability_id: String,
    pub version: String,
}

/// A registered capability and the reference it was handed
pub struct MountRecord {
    pub id: MountId,
    pub path: String,
    capability: Rc<dyn Capability>,
    kernel_ref: KernelRef,
}

impl MountRecord {
    /// Creates a record for an already-constructed capability
    pub fn new(
        id: MountId,
        path: impl Into<String>,
        capability: Rc<dyn Capability>,
        kernel_ref: KernelRef,
    ) -> Self {
        Self {
            id,
            path: path.into(),
            capability,
            kernel_ref,
        }
    }

    pub fn capability(&self) -> &Rc<dyn Capability> {
        &self.capability
    }

    pub fn descriptor(&self) -> MountDescriptor {
        MountDescriptor {
            id: self.id,
            path: self.path.clone(),
            capability_id: self.capability.id().to_string(),
            version: self.capability.version().to_string(),
        }
    }

    /// Runs the unmount hook and detaches the kernel reference
    ///
    /// After this the capability's `KernelRef` no longer resolves.
    pub fn retire(self) -> Rc<dyn Capability> {
        self.capability.on_unmount();
        self.kernel_ref.detach();
        self.capability
    }
}

/// Capability registry
///
/// Maps mount ids to capability instances, with a secondary index by mount
/// path.
#[derive(Default)]
pub struct CapabilityRegistry {
    mounts: HashMap<MountId, MountRecord>,
    paths: HashMap<String, MountId>,
}

impl CapabilityRegistry {
    /// Creates a new capability registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a mounted capability
    pub fn register(&mut self, record: MountRecord) -> Result<(), RegistryError> {
        if self.mounts.contains_key(&record.id) {
            return Err(RegistryError::AlreadyRegistered(record.id));
        }
        if self.paths.contains_key(&record.path) {
            return Err(RegistryError::PathAlreadyMounted(record.path));
        }
        self.paths.insert(record.path.clone(), record.id);
        self.mounts.insert(record.id, record);
        Ok(())
    }

    /// Looks up a capability
    ///
    /// Returns a shared handle so the caller can dispatch without holding a
    /// borrow of the registry.
    pub fn lookup(&self, id: MountId) -> Result<Rc<dyn Capability>, RegistryError> {
        self.mounts
            .get(&id)
            .map(|record| Rc::clone(&record.capability))
            .ok_or(RegistryError::NotFound(id))
    }

    /// Looks up the mount id bound at a path
    pub fn lookup_path(&self, path: &str) -> Result<MountId, RegistryError> {
        self.paths
            .get(path)
            .copied()
            .ok_or_else(|| RegistryError::PathNotFound(path.to_string()))
    }

    /// Returns a descriptor for a mount
    pub fn descriptor(&self, id: MountId) -> Option<MountDescriptor> {
        self.mounts.get(&id).map(MountRecord::descriptor)
    }

    /// Lists all mounts ordered by path
    pub fn descriptors(&self) -> Vec<MountDescriptor> {
        let mut all: Vec<MountDescriptor> =
            self.mounts.values().map(MountRecord::descriptor).collect();
        all.sort_by(|a, b| a.path.cmp(&b.path));
        all
    }

    /// Removes a mount, returning its record for retirement
    pub fn unregister(&mut self, id: MountId) -> Result<MountRecord, RegistryError> {
        let record = self.mounts.remove(&id).ok_or(RegistryError::NotFound(id))?;
        self.paths.remove(&record.path);
        Ok(record)
    }

    /// Returns the number of mounted capabilities
    pub fn count(&self) -> usize {
        self.mounts.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::{Fd, KResult, OpenMode};
    use kernel_api::{Instant, KernelApi};
    use serde_json::Value;
    use std::cell::Cell;
    use std::rc::Weak;

    struct NullKernel;

    impl KernelApi for NullKernel {
        fn open(&self, _path: &str, _mode: OpenMode) -> KResult<Fd> {
            Err(Errno::ENOENT)
        }
        fn read(&self, _fd: Fd) -> KResult<Value> {
            Err(Errno::EBADF)
        }
        fn write(&self, _fd: Fd, _data: Value) -> KResult<()> {
            Err(Errno::EBADF)
        }
        fn ioctl(&self, _fd: Fd, _request: u32, _arg: Value) -> KResult<Value> {
            Err(Errno::EBADF)
        }
        fn close(&self, _fd: Fd) -> KResult<()> {
            Err(Errno::EBADF)
        }
        fn mkdir(&self, _path: &str) -> KResult<()> {
            Ok(())
        }
        fn create(&self, _path: &str, _data: Value) -> KResult<()> {
            Ok(())
        }
        fn exists(&self, _path: &str) -> bool {
            false
        }
        fn unlink(&self, _path: &str) -> KResult<()> {
            Ok(())
        }
        fn mkfifo(&self, _path: &str) -> KResult<()> {
            Ok(())
        }
        fn now(&self) -> Instant {
            Instant::default()
        }
    }

    struct Stub {
        unmounted: Rc<Cell<bool>>,
    }

    impl Capability for Stub {
        fn id(&self) -> &str {
            "stub"
        }
        fn version(&self) -> &str {
            "1.0.0"
        }
        fn on_mount(&self) -> KResult<()> {
            Ok(())
        }
        fn on_unmount(&self) {
            self.unmounted.set(true);
        }
    }

    fn record(path: &str, kernel: &Rc<NullKernel>) -> (MountRecord, KernelRef, Rc<Cell<bool>>) {
        let weak: Weak<dyn KernelApi> = Rc::downgrade(kernel) as Weak<dyn KernelApi>;
        let kernel_ref = KernelRef::new(weak);
        let unmounted = Rc::new(Cell::new(false));
        let capability = Rc::new(Stub {
            unmounted: Rc::clone(&unmounted),
        });
        (
            MountRecord::new(MountId::new(), path, capability, kernel_ref.clone()),
            kernel_ref,
            unmounted,
        )
    }

    #[test]
    fn test_registry_creation() {
        let registry = CapabilityRegistry::new();
        assert_eq!(registry.count(), 0);
    }

    #[test]
    fn test_register_and_lookup() {
        let kernel = Rc::new(NullKernel);
        let mut registry = CapabilityRegistry::new();
        let (rec, _, _) = record("/dev/stub", &kernel);
        let id = rec.id;
        registry.register(rec).unwrap();

        assert_eq!(registry.count(), 1);
        assert_eq!(registry.lookup(id).unwrap().id(), "stub");
        assert_eq!(registry.lookup_path("/dev/stub").unwrap(), id);

        let descriptor = registry.descriptor(id).unwrap();
        assert_eq!(descriptor.capability_id, "stub");
        assert_eq!(descriptor.version, "1.0.0");
    }

    #[test]
    fn test_duplicate_path() {
        let kernel = Rc::new(NullKernel);
        let mut registry = CapabilityRegistry::new();
        let (first, _, _) = record("/dev/stub", &kernel);
        let (second, _, _) = record("/dev/stub", &kernel);
        registry.register(first).unwrap();
        assert_eq!(
            registry.register(second),
            Err(RegistryError::PathAlreadyMounted("/dev/stub".to_string()))
        );
    }

    #[test]
    fn test_unregister_and_retire_detaches() {
        let kernel = Rc::new(NullKernel);
        let mut registry = CapabilityRegistry::new();
        let (rec, kernel_ref, unmounted) = record("/dev/stub", &kernel);
        let id = rec.id;
        registry.register(rec).unwrap();
        assert!(kernel_ref.get().is_ok());

        registry.unregister(id).unwrap().retire();

        assert!(unmounted.get());
        assert!(!kernel_ref.is_attached());
        assert_eq!(kernel_ref.get().err(), Some(Errno::ENODEV));
        assert_eq!(registry.lookup(id).err(), Some(RegistryError::NotFound(id)));
        assert!(registry.lookup_path("/dev/stub").is_err());
    }

    #[test]
    fn test_descriptors_sorted_by_path() {
        let kernel = Rc::new(NullKernel);
        let mut registry = CapabilityRegistry::new();
        for path in ["/v_entity", "/dev/db", "/dev/ability"] {
            let (rec, _, _) = record(path, &kernel);
            registry.register(rec).unwrap();
        }
        let paths: Vec<String> = registry.descriptors().into_iter().map(|d| d.path).collect();
        assert_eq!(paths, vec!["/dev/ability", "/dev/db", "/v_entity"]);
    }

    #[test]
    fn test_registry_error_maps_to_errno() {
        assert_eq!(Errno::from(RegistryError::NotFound(MountId::new())), Errno::ENOENT);
        assert_eq!(
            Errno::from(RegistryError::PathAlreadyMounted("/x".into())),
            Errno::EBUSY
        );
    }
}
