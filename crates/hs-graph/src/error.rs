//! Assembly-time and component-level error types.

use hs_core::{ComponentType, LoadType, Unit};
use hs_registry::RegistryError;
use thiserror::Error;

use crate::port::PortDirection;

/// Graph assembly and validation errors.
///
/// Every variant names the offending component and port so a malformed
/// assembly can be fixed without a debugger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// Two components registered under the same name.
    DuplicateComponent { name: String },

    /// A port name declared twice for the same direction on one component.
    DuplicatePort {
        component: String,
        port: String,
        direction: PortDirection,
    },

    /// A component handle that does not belong to this assembly.
    UnknownComponent { index: usize },

    /// A port name not declared on the component.
    UnknownPort {
        component: String,
        port: String,
        direction: PortDirection,
    },

    /// Source and target disagree on load type or unit.
    PortTypeMismatch {
        target_component: String,
        target_port: String,
        expected: (LoadType, Unit),
        source_component: String,
        source_port: String,
        found: (LoadType, Unit),
    },

    /// The target input already has a source.
    AlreadyConnected {
        component: String,
        port: String,
        existing_source: String,
    },

    /// A mandatory input has no source when assembly is frozen.
    UnresolvedMandatoryInput { component: String, port: String },

    /// A dynamic output slot has no consumer when assembly is frozen.
    UnresolvedDynamicSlot { owner: String, port: String },

    /// The target has no predefined connections for the upstream kind.
    NoPredefinedConnections {
        target: String,
        source: String,
        source_kind: ComponentType,
    },

    /// A dynamic slot handle that does not belong to this assembly.
    ForeignSlot { owner: String, port: String },
}

impl std::fmt::Display for GraphError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GraphError::DuplicateComponent { name } => {
                write!(f, "Component '{}' is already registered", name)
            }
            GraphError::DuplicatePort {
                component,
                port,
                direction,
            } => {
                write!(
                    f,
                    "Component '{}' declares {} port '{}' twice",
                    component, direction, port
                )
            }
            GraphError::UnknownComponent { index } => {
                write!(f, "Component handle {} does not exist", index)
            }
            GraphError::UnknownPort {
                component,
                port,
                direction,
            } => {
                write!(
                    f,
                    "Component '{}' has no {} port '{}'",
                    component, direction, port
                )
            }
            GraphError::PortTypeMismatch {
                target_component,
                target_port,
                expected,
                source_component,
                source_port,
                found,
            } => {
                write!(
                    f,
                    "Cannot connect {}.{} ({}, {}) to {}.{} ({}, {})",
                    source_component,
                    source_port,
                    found.0,
                    found.1,
                    target_component,
                    target_port,
                    expected.0,
                    expected.1
                )
            }
            GraphError::AlreadyConnected {
                component,
                port,
                existing_source,
            } => {
                write!(
                    f,
                    "Input {}.{} is already connected to {}",
                    component, port, existing_source
                )
            }
            GraphError::UnresolvedMandatoryInput { component, port } => {
                write!(f, "Mandatory input {}.{} is not connected", component, port)
            }
            GraphError::UnresolvedDynamicSlot { owner, port } => {
                write!(f, "Dynamic output {}.{} has no consumer", owner, port)
            }
            GraphError::NoPredefinedConnections {
                target,
                source,
                source_kind,
            } => {
                write!(
                    f,
                    "Component '{}' has no predefined connections from '{}' ({:?})",
                    target, source, source_kind
                )
            }
            GraphError::ForeignSlot { owner, port } => {
                write!(
                    f,
                    "Dynamic output {}.{} was not created by this assembly",
                    owner, port
                )
            }
        }
    }
}

impl std::error::Error for GraphError {}

pub type GraphResult<T> = Result<T, GraphError>;

/// Errors raised by a component while preparing or evaluating.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ComponentError {
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error("Non-physical value: {what}")]
    NonPhysical { what: String },

    #[error("Port {port} is not an output of the evaluating component")]
    NotOwnPort { port: usize },

    #[error("Component '{component}' used before its ports were declared")]
    Undeclared { component: String },

    #[error("Missing {direction} port '{port}'")]
    MissingPort {
        port: String,
        direction: PortDirection,
    },

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),
}

pub type ComponentResult<T> = Result<T, ComponentError>;
