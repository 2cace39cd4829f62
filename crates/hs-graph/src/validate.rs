//! Checks run when an assembly is frozen.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{GraphError, GraphResult};
use crate::graph::Graph;

/// What to do with a dynamic output slot nobody consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DanglingSlotPolicy {
    #[default]
    Reject,
    Warn,
}

/// Options applied by [`Assembly::finish`](crate::Assembly::finish).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AssemblyOptions {
    pub dangling_slots: DanglingSlotPolicy,
}

impl AssemblyOptions {
    pub fn warn_on_dangling_slots() -> Self {
        Self {
            dangling_slots: DanglingSlotPolicy::Warn,
        }
    }
}

pub(crate) fn validate(graph: &Graph, options: &AssemblyOptions) -> GraphResult<()> {
    validate_mandatory_inputs(graph)?;
    validate_dynamic_slots(graph, options.dangling_slots)
}

/// Every mandatory input needs a source. Reports the first offender in
/// component, then declaration order.
fn validate_mandatory_inputs(graph: &Graph) -> GraphResult<()> {
    for info in graph.components() {
        for &input in &info.inputs {
            let port = &graph.ports[input.index()];
            if port.mandatory && graph.input_source[input.index()].is_none() {
                return Err(GraphError::UnresolvedMandatoryInput {
                    component: info.name.clone(),
                    port: port.name.clone(),
                });
            }
        }
    }
    Ok(())
}

fn validate_dynamic_slots(graph: &Graph, policy: DanglingSlotPolicy) -> GraphResult<()> {
    for slot in graph.dynamic_slots() {
        if !graph.port_consumers[slot.port.index()].is_empty() {
            continue;
        }
        let owner = graph
            .component(slot.owner)
            .map_or_else(|| slot.owner.to_string(), |c| c.name.clone());
        let port = graph.ports[slot.port.index()].name.clone();
        match policy {
            DanglingSlotPolicy::Reject => {
                return Err(GraphError::UnresolvedDynamicSlot { owner, port });
            }
            DanglingSlotPolicy::Warn => {
                warn!(%owner, %port, weight = %slot.source_weight, "dynamic output has no consumer");
            }
        }
    }
    Ok(())
}
