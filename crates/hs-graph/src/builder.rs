//! Incremental assembly of components and connections.

use std::collections::HashMap;

use hs_core::{CompId, ConnId, LoadType, PortId, SourceWeight, TagSet};
use tracing::debug;

use crate::component::{Component, PortDeclarer};
use crate::connection::{
    Connection, ConnectionOrigin, DynamicInputSpec, DynamicOutputSlot, DynamicOutputSpec,
};
use crate::error::{GraphError, GraphResult};
use crate::graph::{ComponentInfo, Graph};
use crate::port::{PortDirection, PortSpec};
use crate::validate::{self, AssemblyOptions};

/// Connection registry used while a system is being assembled.
///
/// Components are added first (declaring their static ports), then wired
/// with `connect`, `connect_predefined` or the dynamic operations. Every
/// wiring error is raised immediately. `finish` validates the result and
/// freezes it into an [`AssembledSystem`].
#[derive(Default)]
pub struct Assembly {
    graph: Graph,
    components: Vec<Box<dyn Component>>,
    names: HashMap<String, CompId>,
}

impl Assembly {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a component and let it declare its ports.
    pub fn add_component<C: Component + 'static>(&mut self, component: C) -> GraphResult<CompId> {
        self.add_boxed(Box::new(component))
    }

    /// Same as [`add_component`](Self::add_component) for already boxed
    /// components.
    pub fn add_boxed(&mut self, mut component: Box<dyn Component>) -> GraphResult<CompId> {
        let name = component.name().to_string();
        if self.names.contains_key(&name) {
            return Err(GraphError::DuplicateComponent { name });
        }

        let id = CompId::from_index(self.components.len());
        self.graph.components.push(ComponentInfo {
            id,
            name: name.clone(),
            kind: component.kind(),
            source_weight: component.source_weight(),
            inputs: Vec::new(),
            outputs: Vec::new(),
        });

        // A failed declaration leaves no trace of the component
        let mark = self.graph.ports.len();
        let mut declarer = PortDeclarer::new(id, &mut self.graph);
        if let Err(err) = component.declare_ports(&mut declarer) {
            self.graph.truncate_ports(mark);
            self.graph.components.pop();
            return Err(err);
        }

        debug!(component = %name, kind = ?component.kind(), "component added");
        self.components.push(component);
        self.names.insert(name, id);
        Ok(id)
    }

    /// Look up a component handle by name.
    pub fn component_id(&self, name: &str) -> Option<CompId> {
        self.names.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Read-only view of the graph assembled so far.
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Explicit single link from `source.source_output` to
    /// `target.target_input`. The connection carries the source
    /// component's weight.
    pub fn connect(
        &mut self,
        target: CompId,
        target_input: &str,
        source: CompId,
        source_output: &str,
    ) -> GraphResult<ConnId> {
        let target_port = self
            .graph
            .port_checked(target, PortDirection::Input, target_input)?;
        let source_port = self
            .graph
            .port_checked(source, PortDirection::Output, source_output)?;
        let weight = self.graph.components[source.index()].source_weight;
        self.link(
            source_port,
            target_port,
            weight,
            TagSet::new(),
            ConnectionOrigin::Explicit,
        )
    }

    /// Wire `target` to each upstream component using the target's
    /// predefined table. Every entry whose upstream kind matches is bound.
    ///
    /// # Errors
    ///
    /// `NoPredefinedConnections` when an upstream component matches no
    /// entry, plus every error of [`connect`](Self::connect). On failure
    /// no connection of this call is kept.
    pub fn connect_predefined(
        &mut self,
        target: CompId,
        upstream: &[CompId],
    ) -> GraphResult<Vec<ConnId>> {
        let mark = self.graph.connections.len();
        let linked = self.link_predefined(target, upstream);
        if linked.is_err() {
            self.graph.truncate_connections(mark);
        }
        linked
    }

    fn link_predefined(&mut self, target: CompId, upstream: &[CompId]) -> GraphResult<Vec<ConnId>> {
        self.graph.component_checked(target)?;
        let table = self.components[target.index()].predefined_connections();

        let mut created = Vec::new();
        for &source in upstream {
            let source_info = self.graph.component_checked(source)?;
            let source_kind = source_info.kind;
            let weight = source_info.source_weight;

            let mut matched = table
                .iter()
                .filter(|entry| entry.source_kind == source_kind)
                .peekable();
            if matched.peek().is_none() {
                return Err(GraphError::NoPredefinedConnections {
                    target: self.graph.components[target.index()].name.clone(),
                    source: source_info.name.clone(),
                    source_kind,
                });
            }

            for entry in matched {
                let target_port =
                    self.graph
                        .port_checked(target, PortDirection::Input, entry.input)?;
                let source_port =
                    self.graph
                        .port_checked(source, PortDirection::Output, entry.source_output)?;
                created.push(self.link(
                    source_port,
                    target_port,
                    weight,
                    TagSet::new(),
                    ConnectionOrigin::Predefined,
                )?);
            }
        }
        Ok(created)
    }

    /// Create an output on `owner` that is not part of its static
    /// declaration. The returned slot is usable as a connection source.
    pub fn add_dynamic_output_and_register(
        &mut self,
        owner: CompId,
        spec: DynamicOutputSpec,
    ) -> GraphResult<DynamicOutputSlot> {
        self.graph.component_checked(owner)?;
        let ordinal = self.graph.slots.iter().filter(|s| s.owner == owner).count();
        let name = format!("dynamic_{}_w{}", ordinal, spec.source_weight);

        let port_spec = PortSpec {
            name,
            load_type: spec.load_type,
            unit: spec.unit,
            tags: spec.tags.clone(),
            mandatory: false,
            description: spec.description.clone(),
        };
        let port = self
            .graph
            .add_port(owner, PortDirection::Output, port_spec, true)?;

        let slot = DynamicOutputSlot {
            port,
            owner,
            load_type: spec.load_type,
            unit: spec.unit,
            tags: spec.tags,
            source_weight: spec.source_weight,
            description: spec.description,
        };
        debug!(slot = %self.graph.port_label(port), weight = %slot.source_weight, "dynamic output created");
        self.graph.slots.push(slot.clone());
        Ok(slot)
    }

    /// Bind an input of `target` to a dynamic output slot.
    pub fn register_dynamic_input_source(
        &mut self,
        target: CompId,
        target_input: &str,
        slot: &DynamicOutputSlot,
    ) -> GraphResult<ConnId> {
        if !self.graph.slots.iter().any(|s| s == slot) {
            return Err(GraphError::ForeignSlot {
                owner: self
                    .graph
                    .component(slot.owner)
                    .map_or_else(|| slot.owner.to_string(), |c| c.name.clone()),
                port: slot.port.to_string(),
            });
        }
        let target_port = self
            .graph
            .port_checked(target, PortDirection::Input, target_input)?;
        self.link(
            slot.port,
            target_port,
            slot.source_weight,
            slot.tags.clone(),
            ConnectionOrigin::DynamicSlot,
        )
    }

    /// Create an input on the aggregator `target` and connect it to
    /// `source.source_output` in one step.
    ///
    /// The input is named `{source}_{output}#{source port id}`. The id
    /// suffix keeps names distinct when component and port names share
    /// underscores (`Car_1.Power` vs `Car.1_Power`).
    pub fn add_dynamic_input_and_connect(
        &mut self,
        target: CompId,
        source: CompId,
        source_output: &str,
        spec: DynamicInputSpec,
    ) -> GraphResult<ConnId> {
        self.graph.component_checked(target)?;
        let source_port = self
            .graph
            .port_checked(source, PortDirection::Output, source_output)?;
        let name = format!(
            "{}_{}#{}",
            self.graph.components[source.index()].name,
            source_output,
            source_port
        );

        let mark = self.graph.ports.len();
        let port_spec = PortSpec {
            name,
            load_type: spec.load_type,
            unit: spec.unit,
            tags: spec.tags.clone(),
            mandatory: true,
            description: String::new(),
        };
        let target_port = self
            .graph
            .add_port(target, PortDirection::Input, port_spec, true)?;

        let linked = self.link(
            source_port,
            target_port,
            spec.source_weight,
            spec.tags,
            ConnectionOrigin::DynamicInput,
        );
        if linked.is_err() {
            self.graph.truncate_ports(mark);
        }
        linked
    }

    /// See [`Graph::resolve_sources_by_tag_and_weight`].
    pub fn resolve_sources_by_tag_and_weight(
        &self,
        load_type: LoadType,
        tags: &TagSet,
        source_weight: Option<SourceWeight>,
    ) -> Vec<&Connection> {
        self.graph
            .resolve_sources_by_tag_and_weight(load_type, tags, source_weight)
    }

    /// Validate and freeze.
    pub fn finish(self, options: &AssemblyOptions) -> GraphResult<AssembledSystem> {
        validate::validate(&self.graph, options)?;
        debug!(
            components = self.graph.components.len(),
            connections = self.graph.connections.len(),
            "assembly frozen"
        );
        Ok(AssembledSystem {
            graph: self.graph,
            components: self.components,
        })
    }

    fn link(
        &mut self,
        source_port: PortId,
        target_port: PortId,
        source_weight: SourceWeight,
        extra_tags: TagSet,
        origin: ConnectionOrigin,
    ) -> GraphResult<ConnId> {
        let graph = &mut self.graph;
        let target = &graph.ports[target_port.index()];
        let source = &graph.ports[source_port.index()];

        if let Some(existing) = graph.input_source[target_port.index()] {
            let existing_source = graph.connections[existing.index()].source_port;
            return Err(GraphError::AlreadyConnected {
                component: graph.components[target.owner.index()].name.clone(),
                port: target.name.clone(),
                existing_source: graph.port_label(existing_source),
            });
        }

        if !target.accepts(source) {
            return Err(GraphError::PortTypeMismatch {
                target_component: graph.components[target.owner.index()].name.clone(),
                target_port: target.name.clone(),
                expected: (target.load_type, target.unit),
                source_component: graph.components[source.owner.index()].name.clone(),
                source_port: source.name.clone(),
                found: (source.load_type, source.unit),
            });
        }

        let mut tags = source.tags.clone();
        tags.extend(extra_tags);

        let id = ConnId::from_index(graph.connections.len());
        let connection = Connection {
            id,
            source_component: source.owner,
            source_port,
            target_component: target.owner,
            target_port,
            load_type: source.load_type,
            unit: source.unit,
            source_weight,
            tags,
            origin,
        };
        debug!(
            source = %graph.port_label(source_port),
            target = %graph.port_label(target_port),
            weight = %source_weight,
            ?origin,
            "connection registered"
        );
        graph.connections.push(connection);
        graph.input_source[target_port.index()] = Some(id);
        graph.port_consumers[source_port.index()].push(id);
        Ok(id)
    }
}

/// A validated, frozen system: the graph plus the component arena.
pub struct AssembledSystem {
    graph: Graph,
    components: Vec<Box<dyn Component>>,
}

impl AssembledSystem {
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Hand the parts to a scheduler; the arena is indexed by `CompId`.
    pub fn into_parts(self) -> (Graph, Vec<Box<dyn Component>>) {
        (self.graph, self.components)
    }
}

impl std::fmt::Debug for AssembledSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssembledSystem")
            .field("components", &self.components.len())
            .field("connections", &self.graph.connections.len())
            .finish()
    }
}
