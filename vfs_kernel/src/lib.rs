//! # VFS Kernel
//!
//! This crate provides the in-process implementation of [`KernelApi`].
//!
//! ## Purpose
//!
//! The kernel owns the namespace tree, the descriptor table and the registry
//! of mounted capabilities. Every read, write and ioctl is routed either to a
//! plain namespace node or to the capability mounted at or above the path.
//!
//! ## Philosophy
//!
//! **One instance, no globals.** A kernel is an `Rc<VfsKernel>`; tests and
//! applications may hold as many independent kernels as they like.
//!
//! **Re-entrancy.** Capabilities call back into the kernel from inside their
//! own dispatch, so no internal borrow is ever held across a capability call.

pub mod config;
pub mod descriptor_table;
pub mod mount_audit;

pub use config::{KernelConfig, DEFAULT_PIPE_CAPACITY};

use capability_registry::{CapabilityRegistry, MountDescriptor, MountRecord};
use core_types::roots::{PIPES, PIPE_CHANNELS, STANDARD_DIRECTORIES};
use core_types::{code_of, Errno, Fd, KResult, MountId, OpenMode};
use descriptor_table::{Descriptor, DescriptorTable, Target};
use kernel_api::{Capability, Clock, Instant, IoRequest, KernelApi, KernelRef, SystemClock};
use log::{debug, error};
use mount_audit::{MountAuditLog, MountEvent};
use namespace::{Namespace, Node, PathResolver, Resolution};
use serde_json::Value;
use std::cell::{Ref, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

struct KernelState {
    namespace: Namespace,
    descriptors: DescriptorTable,
    registry: CapabilityRegistry,
    audit: MountAuditLog,
}

/// The namespace kernel
pub struct VfsKernel {
    state: RefCell<KernelState>,
    clock: Rc<dyn Clock>,
    config: KernelConfig,
    self_ref: Weak<VfsKernel>,
}

impl VfsKernel {
    /// Creates a kernel on the wall clock
    pub fn new(config: KernelConfig) -> Rc<Self> {
        Self::with_clock(config, Rc::new(SystemClock))
    }

    /// Creates a kernel with an explicit clock
    pub fn with_clock(config: KernelConfig, clock: Rc<dyn Clock>) -> Rc<Self> {
        let kernel = Rc::new_cyclic(|self_ref| Self {
            state: RefCell::new(KernelState {
                namespace: Namespace::new(),
                descriptors: DescriptorTable::new(),
                registry: CapabilityRegistry::new(),
                audit: MountAuditLog::new(),
            }),
            clock,
            config,
            self_ref: self_ref.clone(),
        });
        if kernel.config.standard_roots {
            if let Err(errno) = kernel.install_standard_roots() {
                error!("standard roots: {}", errno);
            }
        }
        kernel
    }

    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    fn install_standard_roots(&self) -> KResult<()> {
        let mut state = self.state.borrow_mut();
        for dir in STANDARD_DIRECTORIES {
            state.namespace.mkdir_all(dir)?;
        }
        for channel in PIPE_CHANNELS {
            let pipe = PathResolver::join(&[PIPES.trim_start_matches('/'), channel]);
            if !state.namespace.exists(&pipe) {
                state.namespace.mkfifo(&pipe)?;
            }
        }
        Ok(())
    }

    /// Mounts a capability at `path`
    ///
    /// The factory receives the capability's [`KernelRef`]; a capability can
    /// therefore never exist without one. The path may be absent or an empty
    /// directory, and its parent must exist. If `on_mount` fails the mount is
    /// rolled back and the reference detached.
    pub fn mount<C, F>(&self, path: &str, factory: F) -> KResult<MountId>
    where
        C: Capability + 'static,
        F: FnOnce(KernelRef) -> C,
    {
        let path = PathResolver::normalize(path);
        let kernel: Weak<dyn KernelApi> = self.self_ref.clone();
        let kernel_ref = KernelRef::new(kernel);
        let capability: Rc<dyn Capability> = Rc::new(factory(kernel_ref.clone()));
        let mount_id = MountId::new();

        let attached = self.attach(&path, mount_id, &capability, kernel_ref.clone());
        let result = attached.and_then(|()| {
            capability.on_mount().map_err(|errno| {
                self.rollback(&path, mount_id);
                errno
            })
        });

        let now = self.clock.now();
        let mut state = self.state.borrow_mut();
        match result {
            Ok(()) => {
                if self.config.debug {
                    debug!("mount {} at {}", capability.id(), path);
                }
                state.audit.record_event(
                    now,
                    MountEvent::Mounted {
                        mount_id,
                        path,
                        capability_id: capability.id().to_string(),
                    },
                );
                Ok(mount_id)
            }
            Err(errno) => {
                kernel_ref.detach();
                error!("mount {} at {} failed: {}", capability.id(), path, errno);
                state
                    .audit
                    .record_event(now, MountEvent::MountFailed { path, errno });
                Err(errno)
            }
        }
    }

    fn attach(
        &self,
        path: &str,
        mount_id: MountId,
        capability: &Rc<dyn Capability>,
        kernel_ref: KernelRef,
    ) -> KResult<()> {
        let mut state = self.state.borrow_mut();
        state.namespace.attach_mount(path, mount_id)?;
        let record = MountRecord::new(mount_id, path, Rc::clone(capability), kernel_ref);
        if let Err(err) = state.registry.register(record) {
            state.namespace.detach_mount(path)?;
            return Err(err.into());
        }
        Ok(())
    }

    fn rollback(&self, path: &str, mount_id: MountId) {
        let mut state = self.state.borrow_mut();
        let _ = state.namespace.detach_mount(path);
        let _ = state.registry.unregister(mount_id);
    }

    /// Unmounts the capability at `path`
    ///
    /// Runs `on_unmount`, detaches the capability's kernel reference and
    /// removes the mount point. Descriptors still open below it fail with
    /// `ENODEV` from then on.
    pub fn unmount(&self, path: &str) -> KResult<()> {
        let path = PathResolver::normalize(path);
        let record = {
            let mut state = self.state.borrow_mut();
            let mount_id = state.registry.lookup_path(&path)?;
            state.namespace.detach_mount(&path)?;
            state.registry.unregister(mount_id)?
        };
        let mount_id = record.id;
        let capability = record.retire();
        if self.config.debug {
            debug!("unmount {} at {}", capability.id(), path);
        }
        let now = self.clock.now();
        self.state
            .borrow_mut()
            .audit
            .record_event(now, MountEvent::Unmounted { mount_id, path });
        Ok(())
    }

    /// Lists mounted capabilities ordered by path
    pub fn mounts(&self) -> Vec<MountDescriptor> {
        self.state.borrow().registry.descriptors()
    }

    /// Number of currently open descriptors
    pub fn descriptor_count(&self) -> usize {
        self.state.borrow().descriptors.count()
    }

    /// Mount lifecycle history
    pub fn mount_audit(&self) -> Ref<'_, MountAuditLog> {
        Ref::map(self.state.borrow(), |state| &state.audit)
    }

    fn descriptor(&self, fd: Fd) -> KResult<Descriptor> {
        self.state.borrow().descriptors.get(fd).cloned()
    }

    fn capability_for(&self, mount_id: MountId) -> KResult<Rc<dyn Capability>> {
        self.state
            .borrow()
            .registry
            .lookup(mount_id)
            .map_err(|_| Errno::ENODEV)
    }

    fn with_node<T>(&self, path: &str, f: impl FnOnce(&mut Node) -> KResult<T>) -> KResult<T> {
        let mut state = self.state.borrow_mut();
        let node = state.namespace.node_mut(path)?;
        f(node)
    }

    fn finish<T>(&self, op: &str, subject: &dyn fmt::Display, result: KResult<T>) -> KResult<T> {
        match &result {
            Err(Errno::EIO) => error!("{} {}: {}", op, subject, Errno::EIO),
            _ if self.config.debug => debug!("{} {} -> {}", op, subject, code_of(&result)),
            _ => {}
        }
        result
    }

    fn do_open(&self, path: &str, mode: OpenMode) -> KResult<Fd> {
        let path = PathResolver::normalize(path);
        let mut state = self.state.borrow_mut();
        let target = match state.namespace.resolve(&path)? {
            Resolution::Mount {
                mount_id,
                mount_path,
                sub_path,
            } => Target::Mount {
                mount_id,
                mount_path,
                sub_path,
            },
            Resolution::Node(Node::Directory(_)) if mode != OpenMode::Read => {
                return Err(Errno::EINVAL)
            }
            Resolution::Node(_) => Target::Node,
        };
        Ok(state.descriptors.allocate(path, mode, target))
    }

    fn do_read(&self, fd: Fd) -> KResult<Value> {
        let desc = self.descriptor(fd)?;
        if !desc.mode.can_read() {
            return Err(Errno::EBADF);
        }
        match desc.target {
            Target::Node => self.with_node(&desc.path, |node| match node {
                Node::Directory(dir) => Ok(Value::from(dir.names())),
                Node::Data(data) => Ok(data.clone()),
                Node::Pipe(queue) => queue.pop_front().ok_or(Errno::EAGAIN),
                Node::Mount(_) => Err(Errno::EBUSY),
            }),
            Target::Mount {
                mount_id,
                mount_path,
                sub_path,
            } => {
                let capability = self.capability_for(mount_id)?;
                capability.read(&IoRequest::new(fd, desc.path, mount_path, sub_path))
            }
        }
    }

    fn do_write(&self, fd: Fd, data: Value) -> KResult<()> {
        let desc = self.descriptor(fd)?;
        if !desc.mode.can_write() {
            return Err(Errno::EBADF);
        }
        match desc.target {
            Target::Node => self.with_node(&desc.path, |node| match node {
                Node::Directory(_) => Err(Errno::EISDIR),
                Node::Data(existing) => {
                    *existing = data;
                    Ok(())
                }
                Node::Pipe(queue) if queue.len() >= self.config.pipe_capacity => {
                    Err(Errno::EAGAIN)
                }
                Node::Pipe(queue) => {
                    queue.push_back(data);
                    Ok(())
                }
                Node::Mount(_) => Err(Errno::EBUSY),
            }),
            Target::Mount {
                mount_id,
                mount_path,
                sub_path,
            } => {
                let capability = self.capability_for(mount_id)?;
                capability.write(&IoRequest::new(fd, desc.path, mount_path, sub_path), data)
            }
        }
    }

    fn do_close(&self, fd: Fd) -> KResult<()> {
        let desc = self.state.borrow_mut().descriptors.release(fd)?;
        if let Target::Mount {
            mount_id,
            mount_path,
            sub_path,
        } = desc.target
        {
            // A capability already unmounted has nothing left to release.
            if let Ok(capability) = self.capability_for(mount_id) {
                capability.on_close(&IoRequest::new(fd, desc.path, mount_path, sub_path));
            }
        }
        Ok(())
    }

    fn do_ioctl(&self, fd: Fd, request: u32, arg: Value) -> KResult<Value> {
        let desc = self.descriptor(fd)?;
        match desc.target {
            Target::Node => Err(Errno::EINVAL),
            Target::Mount {
                mount_id,
                mount_path,
                sub_path,
            } => {
                let capability = self.capability_for(mount_id)?;
                capability.ioctl(
                    &IoRequest::new(fd, desc.path, mount_path, sub_path),
                    request,
                    arg,
                )
            }
        }
    }
}

impl KernelApi for VfsKernel {
    fn open(&self, path: &str, mode: OpenMode) -> KResult<Fd> {
        let result = self.do_open(path, mode);
        self.finish("open", &path, result)
    }

    fn read(&self, fd: Fd) -> KResult<Value> {
        let result = self.do_read(fd);
        self.finish("read", &fd, result)
    }

    fn write(&self, fd: Fd, data: Value) -> KResult<()> {
        let result = self.do_write(fd, data);
        self.finish("write", &fd, result)
    }

    fn ioctl(&self, fd: Fd, request: u32, arg: Value) -> KResult<Value> {
        let result = self.do_ioctl(fd, request, arg);
        self.finish("ioctl", &fd, result)
    }

    fn close(&self, fd: Fd) -> KResult<()> {
        let result = self.do_close(fd);
        self.finish("close", &fd, result)
    }

    fn mkdir(&self, path: &str) -> KResult<()> {
        let result = self
            .state
            .borrow_mut()
            .namespace
            .mkdir(&PathResolver::normalize(path));
        self.finish("mkdir", &path, result)
    }

    fn create(&self, path: &str, data: Value) -> KResult<()> {
        let result = self
            .state
            .borrow_mut()
            .namespace
            .create(&PathResolver::normalize(path), data);
        self.finish("create", &path, result)
    }

    fn exists(&self, path: &str) -> bool {
        self.state
            .borrow()
            .namespace
            .exists(&PathResolver::normalize(path))
    }

    fn unlink(&self, path: &str) -> KResult<()> {
        let result = self
            .state
            .borrow_mut()
            .namespace
            .unlink(&PathResolver::normalize(path));
        self.finish("unlink", &path, result)
    }

    fn mkfifo(&self, path: &str) -> KResult<()> {
        let result = self
            .state
            .borrow_mut()
            .namespace
            .mkfifo(&PathResolver::normalize(path));
        self.finish("mkfifo", &path, result)
    }

    fn now(&self) -> Instant {
        self.clock.now()
    }
}

impl fmt::Debug for VfsKernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("VfsKernel")
            .field("config", &self.config)
            .field("mounts", &state.registry.count())
            .field("descriptors", &state.descriptors.count())
            .finish()
    }
}
