//! The component contract.

use hs_core::{CompId, ComponentType, PortId, SourceWeight};

use crate::context::{EvalContext, PrepareContext};
use crate::error::{ComponentResult, GraphResult};
use crate::graph::Graph;
use crate::port::{PortDirection, PortSpec};

/// One row of a component's predefined wiring table: bind `input` to
/// `source_output` of any upstream component of kind `source_kind`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PredefinedConnection {
    pub input: &'static str,
    pub source_kind: ComponentType,
    pub source_output: &'static str,
}

impl PredefinedConnection {
    pub const fn new(
        input: &'static str,
        source_kind: ComponentType,
        source_output: &'static str,
    ) -> Self {
        Self {
            input,
            source_kind,
            source_output,
        }
    }
}

/// A node of the simulation graph.
///
/// Lifecycle inside a run:
/// 1. `declare_ports` once, when added to an assembly
/// 2. `prepare` once, after the assembly is frozen
/// 3. per timestep: `save_state`, then `evaluate` one or more times with
///    `restore_state` before every re-evaluation
///
/// `evaluate` must be deterministic given identical inputs and restored
/// state, and must not touch anything but its own state, its declared
/// outputs and the shared registry handed to it.
pub trait Component: Send {
    /// Unique name within a run.
    fn name(&self) -> &str;

    fn kind(&self) -> ComponentType {
        ComponentType::Generic
    }

    /// Weight used for connections sourced from this component.
    fn source_weight(&self) -> SourceWeight {
        SourceWeight::DEFAULT
    }

    fn declare_ports(&mut self, ports: &mut PortDeclarer<'_>) -> GraphResult<()>;

    /// Wiring this component knows how to make from upstream kinds.
    fn predefined_connections(&self) -> &'static [PredefinedConnection] {
        &[]
    }

    fn prepare(&mut self, _ctx: &mut PrepareContext<'_>) -> ComponentResult<()> {
        Ok(())
    }

    fn evaluate(&mut self, ctx: &mut EvalContext<'_>) -> ComponentResult<()>;

    fn save_state(&mut self) {}

    fn restore_state(&mut self) {}
}

/// Handed to [`Component::declare_ports`]; registers ports on one owner.
pub struct PortDeclarer<'a> {
    owner: CompId,
    graph: &'a mut Graph,
}

impl<'a> PortDeclarer<'a> {
    pub(crate) fn new(owner: CompId, graph: &'a mut Graph) -> Self {
        Self { owner, graph }
    }

    pub fn owner(&self) -> CompId {
        self.owner
    }

    /// Fails with `DuplicatePort` if the name is taken for `direction`.
    pub fn declare_port(&mut self, direction: PortDirection, spec: PortSpec) -> GraphResult<PortId> {
        self.graph.add_port(self.owner, direction, spec, false)
    }

    pub fn input(&mut self, spec: PortSpec) -> GraphResult<PortId> {
        self.declare_port(PortDirection::Input, spec)
    }

    pub fn output(&mut self, spec: PortSpec) -> GraphResult<PortId> {
        self.declare_port(PortDirection::Output, spec)
    }
}
