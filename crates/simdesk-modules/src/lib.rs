//! simdesk Modules
//!
//! The module registry: reusable form fields (GPS capture, image upload,
//! ICCID sequence, ...) that task templates and flow nodes attach by id.
//! The built-in catalog is always available; [`FsModuleRegistry`] layers
//! site-specific modules from a directory on top of it.

mod builtin;
mod error;
mod fs_registry;
mod module;
mod registry;

pub use builtin::{BuiltinRegistry, builtin_modules};
pub use error::RegistryError;
pub use fs_registry::FsModuleRegistry;
pub use module::{ModuleDef, ModuleDefaults};
pub use registry::{ModuleCatalog, ModuleRegistry};
