//! Typed port declarations.

use hs_core::{CompId, LoadType, PortId, Tag, TagSet, Unit};
use serde::{Deserialize, Serialize};

/// Direction of a port relative to its owning component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PortDirection {
    Input,
    Output,
}

impl std::fmt::Display for PortDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PortDirection::Input => f.write_str("input"),
            PortDirection::Output => f.write_str("output"),
        }
    }
}

/// What a component asks for when declaring a port.
///
/// Inputs are mandatory unless marked [`optional`](PortSpec::optional);
/// outputs are never mandatory.
#[derive(Debug, Clone, PartialEq)]
pub struct PortSpec {
    pub name: String,
    pub load_type: LoadType,
    pub unit: Unit,
    pub tags: TagSet,
    pub mandatory: bool,
    pub description: String,
}

impl PortSpec {
    pub fn new(name: impl Into<String>, load_type: LoadType, unit: Unit) -> Self {
        Self {
            name: name.into(),
            load_type,
            unit,
            tags: TagSet::new(),
            mandatory: true,
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

    pub fn optional(mut self) -> Self {
        self.mandatory = false;
        self
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// Immutable declaration of a port. Identity is `(owner, direction, name)`.
#[derive(Debug, Clone, PartialEq)]
pub struct PortDescriptor {
    pub id: PortId,
    pub owner: CompId,
    pub name: String,
    pub direction: PortDirection,
    pub load_type: LoadType,
    pub unit: Unit,
    pub tags: TagSet,
    pub mandatory: bool,
    pub description: String,
    /// Created after the owner's static declaration.
    pub dynamic: bool,
}

impl PortDescriptor {
    pub fn is_input(&self) -> bool {
        self.direction == PortDirection::Input
    }

    pub fn is_output(&self) -> bool {
        self.direction == PortDirection::Output
    }

    /// Whether this input can be fed by `source`. `Any` on the input side
    /// accepts every load type or unit.
    pub fn accepts(&self, source: &PortDescriptor) -> bool {
        let load_ok = self.load_type == LoadType::Any || self.load_type == source.load_type;
        let unit_ok = self.unit == Unit::Any || self.unit == source.unit;
        load_ok && unit_ok
    }
}
