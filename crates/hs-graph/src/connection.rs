//! Directed edges between ports and dynamic output slots.

use hs_core::{CompId, ConnId, LoadType, PortId, SourceWeight, Tag, TagSet, Unit};
use serde::{Deserialize, Serialize};

/// How a connection came to exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConnectionOrigin {
    /// `connect` issued by assembly code.
    Explicit,
    /// Taken from the target's predefined wiring table.
    Predefined,
    /// Input created on the target at assembly time.
    DynamicInput,
    /// Sourced from a dynamic output slot.
    DynamicSlot,
}

/// A resolved edge from one output port to one input port.
#[derive(Debug, Clone, PartialEq)]
pub struct Connection {
    pub id: ConnId,
    pub source_component: CompId,
    pub source_port: PortId,
    pub target_component: CompId,
    pub target_port: PortId,
    /// Load type and unit of the source port.
    pub load_type: LoadType,
    pub unit: Unit,
    pub source_weight: SourceWeight,
    /// Source port tags plus tags supplied at registration.
    pub tags: TagSet,
    pub origin: ConnectionOrigin,
}

impl Connection {
    pub fn matches(
        &self,
        load_type: LoadType,
        tags: &TagSet,
        source_weight: Option<SourceWeight>,
    ) -> bool {
        let load_ok = load_type == LoadType::Any || self.load_type == load_type;
        let weight_ok = source_weight.is_none_or(|w| w == self.source_weight);
        load_ok && weight_ok && tags.is_subset(&self.tags)
    }
}

/// Connections matching the classification, ordered by ascending weight
/// and then by registration order.
pub fn resolve_by_tag_and_weight<'a, I>(
    connections: I,
    load_type: LoadType,
    tags: &TagSet,
    source_weight: Option<SourceWeight>,
) -> Vec<&'a Connection>
where
    I: IntoIterator<Item = &'a Connection>,
{
    let mut matched: Vec<&Connection> = connections
        .into_iter()
        .filter(|c| c.matches(load_type, tags, source_weight))
        .collect();
    // ids are allocated in registration order
    matched.sort_by_key(|c| (c.source_weight, c.id));
    matched
}

/// Classification of an output slot created at assembly time.
#[derive(Debug, Clone, PartialEq)]
pub struct DynamicOutputSpec {
    pub load_type: LoadType,
    pub unit: Unit,
    pub tags: TagSet,
    pub source_weight: SourceWeight,
    pub description: String,
}

impl DynamicOutputSpec {
    pub fn new(load_type: LoadType, unit: Unit, source_weight: SourceWeight) -> Self {
        Self {
            load_type,
            unit,
            tags: TagSet::new(),
            source_weight,
            description: String::new(),
        }
    }

    pub fn with_tags<I, T>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Tag>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// Handle to an output created by `add_dynamic_output_and_register`.
/// Usable as a connection source.
#[derive(Debug, Clone, PartialEq)]
pub struct DynamicOutputSlot {
    pub port: PortId,
    pub owner: CompId,
    pub load_type: LoadType,
    pub unit: Unit,
    pub tags: TagSet,
    pub source_weight: SourceWeight,
    pub description: String,
}

/// Classification of an input created on an aggregator together with its
/// connection.
#[derive(Debug, Clone, PartialEq)]
pub struct DynamicInputSpec {
    pub load_type: LoadType,
    pub unit: Unit,
    pub tags: TagSet,
    pub source_weight: SourceWeight,
}

impl DynamicInputSpec {
    pub fn new(load_type: LoadType, unit: Unit, source_weight: SourceWeight) -> Self {
        Self {
            load_type,
            unit,
            tags: TagSet::new(),
            source_weight,
        }
    }

    pub fn with_tags<I, T>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Tag>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }
}
