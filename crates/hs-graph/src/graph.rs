//! Core graph data structures.

use hs_core::{CompId, ComponentType, ConnId, LoadType, PortId, SourceWeight, TagSet};

use crate::connection::{Connection, DynamicOutputSlot, resolve_by_tag_and_weight};
use crate::error::{GraphError, GraphResult};
use crate::port::{PortDescriptor, PortDirection, PortSpec};

/// Static facts about a component, kept alongside the component arena.
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentInfo {
    pub id: CompId,
    pub name: String,
    pub kind: ComponentType,
    pub source_weight: SourceWeight,
    /// Declaration order, dynamic inputs last.
    pub inputs: Vec<PortId>,
    /// Declaration order, dynamic outputs last.
    pub outputs: Vec<PortId>,
}

/// Components, ports and connections of a simulation.
///
/// All tables are vectors indexed by their ids. Per port, the graph also
/// stores:
/// - for inputs, the connection feeding it (at most one)
/// - for outputs, the connections it feeds (in registration order)
///
/// Mutated only by [`Assembly`](crate::Assembly); read-only once frozen.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    pub(crate) components: Vec<ComponentInfo>,
    pub(crate) ports: Vec<PortDescriptor>,
    pub(crate) connections: Vec<Connection>,
    pub(crate) input_source: Vec<Option<ConnId>>,
    pub(crate) port_consumers: Vec<Vec<ConnId>>,
    pub(crate) slots: Vec<DynamicOutputSlot>,
}

impl Graph {
    /// Return all components.
    pub fn components(&self) -> &[ComponentInfo] {
        &self.components
    }

    /// Return all ports.
    pub fn ports(&self) -> &[PortDescriptor] {
        &self.ports
    }

    /// Return all connections in registration order.
    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    /// Return all dynamic output slots in creation order.
    pub fn dynamic_slots(&self) -> &[DynamicOutputSlot] {
        &self.slots
    }

    pub fn component(&self, id: CompId) -> Option<&ComponentInfo> {
        self.components.get(id.index())
    }

    pub fn component_by_name(&self, name: &str) -> Option<&ComponentInfo> {
        self.components.iter().find(|c| c.name == name)
    }

    pub fn port(&self, id: PortId) -> Option<&PortDescriptor> {
        self.ports.get(id.index())
    }

    pub fn connection(&self, id: ConnId) -> Option<&Connection> {
        self.connections.get(id.index())
    }

    /// Find a port of `comp` by direction and name.
    pub fn find_port(&self, comp: CompId, direction: PortDirection, name: &str) -> Option<PortId> {
        let info = self.component(comp)?;
        let list = match direction {
            PortDirection::Input => &info.inputs,
            PortDirection::Output => &info.outputs,
        };
        list.iter()
            .copied()
            .find(|&p| self.ports[p.index()].name == name)
    }

    /// The connection feeding an input, if any.
    pub fn source_of(&self, input: PortId) -> Option<&Connection> {
        let conn = (*self.input_source.get(input.index())?)?;
        self.connection(conn)
    }

    /// Connections fed by an output, in registration order.
    pub fn consumers_of(&self, output: PortId) -> impl Iterator<Item = &Connection> + '_ {
        self.port_consumers
            .get(output.index())
            .into_iter()
            .flatten()
            .map(|&c| &self.connections[c.index()])
    }

    /// Components reading at least one output of `comp`, ascending.
    pub fn dependents(&self, comp: CompId) -> Vec<CompId> {
        let Some(info) = self.component(comp) else {
            return Vec::new();
        };
        let mut out: Vec<CompId> = info
            .outputs
            .iter()
            .flat_map(|&p| self.consumers_of(p))
            .map(|c| c.target_component)
            .collect();
        out.sort();
        out.dedup();
        out
    }

    /// All connections matching the classification, ordered by ascending
    /// source weight and then registration order.
    pub fn resolve_sources_by_tag_and_weight(
        &self,
        load_type: LoadType,
        tags: &TagSet,
        source_weight: Option<SourceWeight>,
    ) -> Vec<&Connection> {
        resolve_by_tag_and_weight(&self.connections, load_type, tags, source_weight)
    }

    /// Same as [`resolve_sources_by_tag_and_weight`](Self::resolve_sources_by_tag_and_weight),
    /// restricted to connections feeding `target`.
    pub fn resolve_inputs_by_tag_and_weight(
        &self,
        target: CompId,
        load_type: LoadType,
        tags: &TagSet,
        source_weight: Option<SourceWeight>,
    ) -> Vec<&Connection> {
        resolve_by_tag_and_weight(
            self.connections
                .iter()
                .filter(|c| c.target_component == target),
            load_type,
            tags,
            source_weight,
        )
    }

    /// Dynamic slots owned by `owner` carrying every tag in `tags`,
    /// ordered by ascending weight and then creation order.
    pub fn dynamic_slots_of(&self, owner: CompId, tags: &TagSet) -> Vec<&DynamicOutputSlot> {
        let mut slots: Vec<&DynamicOutputSlot> = self
            .slots
            .iter()
            .filter(|s| s.owner == owner && tags.is_subset(&s.tags))
            .collect();
        slots.sort_by_key(|s| (s.source_weight, s.port));
        slots
    }

    pub(crate) fn component_checked(&self, id: CompId) -> GraphResult<&ComponentInfo> {
        self.component(id)
            .ok_or(GraphError::UnknownComponent { index: id.index() })
    }

    pub(crate) fn port_checked(
        &self,
        comp: CompId,
        direction: PortDirection,
        name: &str,
    ) -> GraphResult<PortId> {
        let info = self.component_checked(comp)?;
        self.find_port(comp, direction, name)
            .ok_or_else(|| GraphError::UnknownPort {
                component: info.name.clone(),
                port: name.to_string(),
                direction,
            })
    }

    /// `component.port` label for messages.
    pub fn port_label(&self, port: PortId) -> String {
        match self.port(port) {
            Some(desc) => {
                let owner = self
                    .component(desc.owner)
                    .map_or("?", |c| c.name.as_str());
                format!("{}.{}", owner, desc.name)
            }
            None => format!("<port {}>", port),
        }
    }

    pub(crate) fn add_port(
        &mut self,
        owner: CompId,
        direction: PortDirection,
        spec: PortSpec,
        dynamic: bool,
    ) -> GraphResult<PortId> {
        let info = self.component_checked(owner)?;
        if self.find_port(owner, direction, &spec.name).is_some() {
            return Err(GraphError::DuplicatePort {
                component: info.name.clone(),
                port: spec.name,
                direction,
            });
        }

        let id = PortId::from_index(self.ports.len());
        self.ports.push(PortDescriptor {
            id,
            owner,
            name: spec.name,
            direction,
            load_type: spec.load_type,
            unit: spec.unit,
            tags: spec.tags,
            mandatory: direction == PortDirection::Input && spec.mandatory,
            description: spec.description,
            dynamic,
        });
        self.input_source.push(None);
        self.port_consumers.push(Vec::new());

        let info = &mut self.components[owner.index()];
        match direction {
            PortDirection::Input => info.inputs.push(id),
            PortDirection::Output => info.outputs.push(id),
        }
        Ok(id)
    }

    /// Drop ports allocated after `mark` (rollback of a failed declaration).
    pub(crate) fn truncate_ports(&mut self, mark: usize) {
        self.ports.truncate(mark);
        self.input_source.truncate(mark);
        self.port_consumers.truncate(mark);
        for info in &mut self.components {
            info.inputs.retain(|p| p.index() < mark);
            info.outputs.retain(|p| p.index() < mark);
        }
    }

    /// Drop connections registered after `mark`, unbinding their inputs.
    pub(crate) fn truncate_connections(&mut self, mark: usize) {
        for conn in self.connections.drain(mark..) {
            self.input_source[conn.target_port.index()] = None;
            self.port_consumers[conn.source_port.index()].retain(|c| c.index() < mark);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hs_core::{Id, Unit};

    fn graph_with_component() -> Graph {
        let mut graph = Graph::default();
        graph.components.push(ComponentInfo {
            id: Id::from_index(0),
            name: "Test".into(),
            kind: ComponentType::Generic,
            source_weight: SourceWeight::DEFAULT,
            inputs: Vec::new(),
            outputs: Vec::new(),
        });
        graph
    }

    #[test]
    fn add_port_rejects_duplicate_name_per_direction() {
        let mut graph = graph_with_component();
        let owner = Id::from_index(0);
        let spec = PortSpec::new("Power", LoadType::Electricity, Unit::Watt);
        graph
            .add_port(owner, PortDirection::Input, spec.clone(), false)
            .unwrap();
        // Same name on the other direction is fine
        graph
            .add_port(owner, PortDirection::Output, spec.clone(), false)
            .unwrap();
        let err = graph
            .add_port(owner, PortDirection::Input, spec, false)
            .unwrap_err();
        assert!(matches!(err, GraphError::DuplicatePort { .. }));
    }

    #[test]
    fn outputs_are_never_mandatory() {
        let mut graph = graph_with_component();
        let owner = Id::from_index(0);
        let p = graph
            .add_port(
                owner,
                PortDirection::Output,
                PortSpec::new("Out", LoadType::Heat, Unit::Watt),
                false,
            )
            .unwrap();
        assert!(!graph.port(p).unwrap().mandatory);
        assert_eq!(graph.port_label(p), "Test.Out");
    }

    #[test]
    fn truncate_rolls_back_ports() {
        let mut graph = graph_with_component();
        let owner = Id::from_index(0);
        graph
            .add_port(
                owner,
                PortDirection::Input,
                PortSpec::new("A", LoadType::Heat, Unit::Watt),
                false,
            )
            .unwrap();
        graph.truncate_ports(0);
        assert!(graph.ports().is_empty());
        assert!(graph.components()[0].inputs.is_empty());
    }
}
