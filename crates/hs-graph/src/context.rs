//! Views handed to components while preparing and evaluating.

use hs_core::{CompId, LoadType, PortId, SourceWeight, StepClock, TagSet};
use hs_registry::SharedRegistry;

use crate::connection::{Connection, DynamicOutputSlot};
use crate::error::{ComponentError, ComponentResult};
use crate::graph::Graph;
use crate::port::PortDirection;

/// Per-evaluation view: inputs, own outputs, clock and shared registry.
///
/// Values are stored per output port. An input reads the current value of
/// its source, which is this timestep's value if the source was already
/// evaluated and the previous timestep's otherwise.
pub struct EvalContext<'a> {
    graph: &'a Graph,
    component: CompId,
    clock: StepClock,
    values: &'a mut [f64],
    registry: &'a mut SharedRegistry,
}

impl<'a> EvalContext<'a> {
    /// `values` must have one slot per port of `graph`.
    pub fn new(
        graph: &'a Graph,
        component: CompId,
        clock: StepClock,
        values: &'a mut [f64],
        registry: &'a mut SharedRegistry,
    ) -> Self {
        Self {
            graph,
            component,
            clock,
            values,
            registry,
        }
    }

    pub fn component(&self) -> CompId {
        self.component
    }

    pub fn clock(&self) -> StepClock {
        self.clock
    }

    pub fn graph(&self) -> &Graph {
        self.graph
    }

    /// Current value of one of this component's inputs; unconnected
    /// inputs read 0.0.
    ///
    /// # Errors
    /// `NotOwnPort` when `port` is not an input of this component.
    pub fn input(&self, port: PortId) -> ComponentResult<f64> {
        self.check_own(port, PortDirection::Input)?;
        Ok(self
            .graph
            .source_of(port)
            .and_then(|c| self.values.get(c.source_port.index()).copied())
            .unwrap_or(0.0))
    }

    /// Sum of several inputs.
    pub fn sum_inputs(&self, ports: &[PortId]) -> ComponentResult<f64> {
        ports.iter().map(|&p| self.input(p)).sum()
    }

    /// Last value written to one of this component's outputs.
    pub fn output(&self, port: PortId) -> ComponentResult<f64> {
        self.check_own(port, PortDirection::Output)?;
        Ok(self.values[port.index()])
    }

    pub fn set_output(&mut self, port: PortId, value: f64) -> ComponentResult<()> {
        self.check_own(port, PortDirection::Output)?;
        self.values[port.index()] = value;
        Ok(())
    }

    pub fn registry(&mut self) -> &mut SharedRegistry {
        self.registry
    }

    pub fn registry_ref(&self) -> &SharedRegistry {
        self.registry
    }

    fn check_own(&self, port: PortId, direction: PortDirection) -> ComponentResult<()> {
        match self.graph.port(port) {
            Some(desc) if desc.owner == self.component && desc.direction == direction => Ok(()),
            _ => Err(ComponentError::NotOwnPort { port: port.index() }),
        }
    }
}

/// One-time view used by [`Component::prepare`](crate::Component::prepare):
/// look up own ports, resolve dynamic wiring and seed the registry.
pub struct PrepareContext<'a> {
    graph: &'a Graph,
    component: CompId,
    registry: &'a mut SharedRegistry,
}

impl<'a> PrepareContext<'a> {
    pub fn new(graph: &'a Graph, component: CompId, registry: &'a mut SharedRegistry) -> Self {
        Self {
            graph,
            component,
            registry,
        }
    }

    pub fn component(&self) -> CompId {
        self.component
    }

    pub fn graph(&self) -> &Graph {
        self.graph
    }

    pub fn input(&self, name: &str) -> ComponentResult<PortId> {
        self.port(PortDirection::Input, name)
    }

    pub fn output(&self, name: &str) -> ComponentResult<PortId> {
        self.port(PortDirection::Output, name)
    }

    /// Connections feeding this component that match the classification,
    /// by ascending weight then registration order.
    pub fn resolve_input_connections(
        &self,
        load_type: LoadType,
        tags: &TagSet,
        source_weight: Option<SourceWeight>,
    ) -> Vec<&'a Connection> {
        self.graph
            .resolve_inputs_by_tag_and_weight(self.component, load_type, tags, source_weight)
    }

    /// Target ports of [`resolve_input_connections`](Self::resolve_input_connections).
    pub fn resolve_inputs(
        &self,
        load_type: LoadType,
        tags: &TagSet,
        source_weight: Option<SourceWeight>,
    ) -> Vec<PortId> {
        self.resolve_input_connections(load_type, tags, source_weight)
            .into_iter()
            .map(|c| c.target_port)
            .collect()
    }

    /// This component's dynamic output slots carrying every tag in `tags`,
    /// by ascending weight.
    pub fn dynamic_outputs(&self, tags: &TagSet) -> Vec<&'a DynamicOutputSlot> {
        self.graph.dynamic_slots_of(self.component, tags)
    }

    pub fn registry(&mut self) -> &mut SharedRegistry {
        self.registry
    }

    fn port(&self, direction: PortDirection, name: &str) -> ComponentResult<PortId> {
        self.graph
            .find_port(self.component, direction, name)
            .ok_or_else(|| ComponentError::MissingPort {
                port: name.to_string(),
                direction,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::ComponentInfo;
    use crate::port::PortSpec;
    use hs_core::{ComponentType, Id, Unit};

    fn two_components() -> (Graph, PortId, PortId, PortId) {
        let mut graph = Graph::default();
        for i in 0..2 {
            graph.components.push(ComponentInfo {
                id: Id::from_index(i),
                name: format!("C{i}"),
                kind: ComponentType::Generic,
                source_weight: SourceWeight::DEFAULT,
                inputs: Vec::new(),
                outputs: Vec::new(),
            });
        }
        let spec = PortSpec::new("P", LoadType::Heat, Unit::Watt);
        let out0 = graph
            .add_port(Id::from_index(0), PortDirection::Output, spec.clone(), false)
            .unwrap();
        let in1 = graph
            .add_port(Id::from_index(1), PortDirection::Input, spec.clone().optional(), false)
            .unwrap();
        let out1 = graph
            .add_port(Id::from_index(1), PortDirection::Output, spec, false)
            .unwrap();
        (graph, out0, in1, out1)
    }

    #[test]
    fn unconnected_input_reads_zero() {
        let (graph, _, in1, _) = two_components();
        let mut values = vec![42.0; graph.ports().len()];
        let mut registry = SharedRegistry::new();
        let ctx = EvalContext::new(
            &graph,
            Id::from_index(1),
            StepClock::new(60),
            &mut values,
            &mut registry,
        );
        assert_eq!(ctx.input(in1).unwrap(), 0.0);
        assert_eq!(ctx.sum_inputs(&[in1, in1]).unwrap(), 0.0);
    }

    #[test]
    fn set_output_rejects_foreign_ports() {
        let (graph, out0, in1, out1) = two_components();
        let mut values = vec![0.0; graph.ports().len()];
        let mut registry = SharedRegistry::new();
        let mut ctx = EvalContext::new(
            &graph,
            Id::from_index(1),
            StepClock::new(60),
            &mut values,
            &mut registry,
        );
        ctx.set_output(out1, 3.5).unwrap();
        assert_eq!(ctx.output(out1).unwrap(), 3.5);
        assert!(matches!(
            ctx.set_output(out0, 1.0),
            Err(ComponentError::NotOwnPort { .. })
        ));
        assert!(matches!(
            ctx.set_output(in1, 1.0),
            Err(ComponentError::NotOwnPort { .. })
        ));
    }

    #[test]
    fn input_rejects_ports_it_does_not_read() {
        let (graph, out0, in1, out1) = two_components();
        let mut values = vec![7.0; graph.ports().len()];
        let mut registry = SharedRegistry::new();
        let ctx = EvalContext::new(
            &graph,
            Id::from_index(0),
            StepClock::new(60),
            &mut values,
            &mut registry,
        );
        // another component's input, and an output of either side
        for port in [in1, out1, out0] {
            assert!(matches!(
                ctx.input(port),
                Err(ComponentError::NotOwnPort { .. })
            ));
        }
        assert!(matches!(
            ctx.sum_inputs(&[in1]),
            Err(ComponentError::NotOwnPort { .. })
        ));
    }

    #[test]
    fn prepare_reports_missing_port() {
        let (graph, _, in1, _) = two_components();
        let mut registry = SharedRegistry::new();
        let ctx = PrepareContext::new(&graph, Id::from_index(1), &mut registry);
        assert_eq!(ctx.input("P").unwrap(), in1);
        assert!(matches!(
            ctx.output("Nope"),
            Err(ComponentError::MissingPort { .. })
        ));
    }
}
