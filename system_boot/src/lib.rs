//! # System Boot
//!
//! Assembles a complete game namespace: a kernel with its standard roots,
//! the persistence driver, the resource handler chain and the devices.
//!
//! ## Example
//!
//! ```
//! use system_boot::{boot, BootConfig};
//!
//! let system = boot(&BootConfig::default()).unwrap();
//! assert_eq!(system.kernel.mounts().len(), 8);
//! ```

pub mod config;

pub use config::{BootConfig, ConfigError, MountConfig};

use core_types::roots::{
    DEV, DEV_ABILITY, DEV_CHARACTER, DEV_COMBAT, DEV_DB, PROC, PROC_CHARACTER, V_CHARACTER,
    V_ENTITY, V_SCHEMA,
};
use core_types::{Errno, KResult, MountId, OpenMode};
use kernel_api::{ensure_dir_all, Clock, KernelApi, OpenFile, SystemClock};
use log::info;
use services_devices::{AbilityDevice, CharacterDevice, CombatDevice, DbDevice};
use services_effects::EffectBook;
use services_path_handlers::{
    EntityPathHandler, HandlerChain, ProcessResourceHandler, ResourceCapability,
};
use services_persistence::{Driver, InMemoryDriver};
use std::cell::RefCell;
use std::rc::Rc;
use thiserror::Error;
use vfs_kernel::VfsKernel;

/// Resource roots served by the handler chain, with their entity kind
pub const RESOURCE_ROOTS: [(&str, &str); 3] = [
    (V_ENTITY, "entity"),
    (V_CHARACTER, "character"),
    (V_SCHEMA, "schema"),
];

/// Errors raised while booting
#[derive(Debug, Error)]
pub enum BootError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("mount at {path} failed: {errno}")]
    Mount { path: String, errno: Errno },
    #[error("preparing {path} failed: {errno}")]
    Prepare { path: String, errno: Errno },
}

/// A booted namespace and the collaborators wired into it
pub struct System {
    pub kernel: Rc<VfsKernel>,
    pub driver: Rc<InMemoryDriver>,
    pub effects: Rc<RefCell<EffectBook>>,
    pub chain: Rc<HandlerChain>,
}

impl System {
    /// Opens a scoped descriptor on the kernel
    pub fn open(&self, path: &str, mode: OpenMode) -> KResult<OpenFile> {
        let kernel: Rc<dyn KernelApi> = self.kernel.clone();
        OpenFile::open(kernel, path, mode)
    }
}

/// Boots on the wall clock
pub fn boot(config: &BootConfig) -> Result<System, BootError> {
    boot_with_clock(config, Rc::new(SystemClock))
}

/// Parses a JSON configuration and boots on the wall clock
pub fn boot_from_json(json: &str) -> Result<System, BootError> {
    boot(&BootConfig::from_json(json)?)
}

/// Boots with an explicit clock shared by kernel, driver and handlers
pub fn boot_with_clock(config: &BootConfig, clock: Rc<dyn Clock>) -> Result<System, BootError> {
    let kernel = VfsKernel::with_clock(config.kernel.clone(), Rc::clone(&clock));
    let driver = Rc::new(InMemoryDriver::new(Rc::clone(&clock)));
    let effects = Rc::new(RefCell::new(EffectBook::new()));
    let chain = Rc::new(build_chain(driver.clone(), Rc::clone(&clock)));

    for dir in [DEV, PROC] {
        ensure_dir_all(kernel.as_ref(), dir).map_err(|errno| BootError::Prepare {
            path: dir.to_string(),
            errno,
        })?;
    }

    let debug = config.kernel.debug;
    let mounts = &config.mounts;
    if mounts.resources {
        let roots = RESOURCE_ROOTS.iter().map(|(root, _)| *root).chain([PROC_CHARACTER]);
        for root in roots {
            let chain = Rc::clone(&chain);
            let id = format!("resource{}", root.replace('/', "."));
            mount(&kernel, root, move |k| {
                ResourceCapability::new(id, k, chain).with_debug(debug)
            })?;
        }
    }
    if mounts.ability {
        let effects = Rc::clone(&effects);
        mount(&kernel, DEV_ABILITY, move |k| {
            AbilityDevice::new(k, effects).with_debug(debug)
        })?;
    }
    if mounts.combat {
        let effects = Rc::clone(&effects);
        let combat = config.combat.clone();
        mount(&kernel, DEV_COMBAT, move |k| {
            CombatDevice::new(k, effects, combat).with_debug(debug)
        })?;
    }
    if mounts.character {
        mount(&kernel, DEV_CHARACTER, move |k| {
            CharacterDevice::new(k).with_debug(debug)
        })?;
    }
    if mounts.db {
        let shared: Rc<dyn Driver> = driver.clone();
        mount(&kernel, DEV_DB, move |k| DbDevice::new(k, shared).with_debug(debug))?;
    }

    info!("booted with {} mounts", kernel.mounts().len());
    Ok(System {
        kernel,
        driver,
        effects,
        chain,
    })
}

/// Builds the fixed-order handler chain: entity roots first, then process
/// resources
pub fn build_chain(driver: Rc<dyn Driver>, clock: Rc<dyn Clock>) -> HandlerChain {
    let mut chain = HandlerChain::new();
    for (root, kind) in RESOURCE_ROOTS {
        chain.push(Box::new(EntityPathHandler::new(
            root,
            kind,
            Rc::clone(&driver),
            Rc::clone(&clock),
        )));
    }
    chain.with_handler(ProcessResourceHandler::new(PROC_CHARACTER, "character", driver))
}

fn mount<C, F>(kernel: &VfsKernel, path: &str, factory: F) -> Result<MountId, BootError>
where
    C: kernel_api::Capability + 'static,
    F: FnOnce(kernel_api::KernelRef) -> C,
{
    kernel.mount(path, factory).map_err(|errno| BootError::Mount {
        path: path.to_string(),
        errno,
    })
}
