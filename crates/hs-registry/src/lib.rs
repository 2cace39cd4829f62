//! hs-registry: shared state exchanged between homesim components.
//!
//! Provides:
//! - [`SharedRegistry`] with singleton and `(component type, weight)` entries
//! - [`SharedRegistryHandle`], the lockable handle passed to runs
//! - an exactly-once process-wide instance via [`SharedRegistry::global`]

pub mod error;
pub mod key;
pub mod registry;

pub use error::{RegistryError, RegistryResult};
pub use key::{RegistryKey, RegistryValue};
pub use registry::{SharedRegistry, SharedRegistryHandle};
