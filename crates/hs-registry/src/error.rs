//! Error types for shared registry access.

use hs_core::{ComponentType, SourceWeight};
use thiserror::Error;

use crate::key::RegistryKey;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RegistryError {
    #[error("Registry key not found: {key:?}")]
    KeyNotFound { key: RegistryKey },

    #[error("No dynamic registry entry for {component_type:?} with source weight {weight}")]
    DynamicEntryNotFound {
        component_type: ComponentType,
        weight: SourceWeight,
    },

    #[error("Registry entry {key:?} holds a {found}, expected a {expected}")]
    WrongValueKind {
        key: RegistryKey,
        expected: &'static str,
        found: &'static str,
    },
}

pub type RegistryResult<T> = Result<T, RegistryError>;
