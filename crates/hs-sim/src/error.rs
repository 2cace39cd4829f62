//! Error types for simulation runs.

use hs_graph::{ComponentError, GraphError};
use hs_registry::RegistryError;
use thiserror::Error;

use crate::scheduler::RunState;

/// Errors that abort a run. None of them is retried.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimError {
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error("Cannot {action} while the simulator is {state}")]
    InvalidState {
        action: &'static str,
        state: RunState,
    },

    #[error("Assembly error: {0}")]
    Graph(#[from] GraphError),

    #[error("Component '{component}' failed to prepare: {source}")]
    Prepare {
        component: String,
        #[source]
        source: ComponentError,
    },

    #[error("Component '{component}' failed at timestep {timestep}: {source}")]
    Component {
        component: String,
        timestep: usize,
        #[source]
        source: ComponentError,
    },

    #[error(
        "No convergence at timestep {timestep} after {iterations} iterations; unstable: {}",
        .unstable.join(", ")
    )]
    Convergence {
        timestep: usize,
        iterations: usize,
        unstable: Vec<String>,
    },

    #[error("Non-finite value {value} on {port} at timestep {timestep}")]
    NonFinite {
        port: String,
        timestep: usize,
        value: f64,
    },

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),
}

pub type SimResult<T> = Result<T, SimError>;
