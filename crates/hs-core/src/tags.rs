//! Classification labels attached to ports and connections.

use std::collections::BTreeSet;

/// Kind of a component. Drives predefined wiring and groups dynamic
/// registry entries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ComponentType {
    Weather,
    Occupancy,
    Building,
    PvSystem,
    HeatPump,
    HeatPumpController,
    ElectricityMeter,
    EnergyManagementSystem,
    Battery,
    Car,
    CarBattery,
    EvChargeController,
    Generic,
}

/// Role a flow plays for an aggregating component.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FlowRole {
    ElectricityProduction,
    ElectricityConsumptionUncontrolled,
    /// Measured consumption of a controllable device.
    ElectricityReal,
    /// Setpoint handed to a controllable device.
    ElectricityTarget,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Tag {
    Component(ComponentType),
    Role(FlowRole),
}

impl From<ComponentType> for Tag {
    fn from(c: ComponentType) -> Self {
        Tag::Component(c)
    }
}

impl From<FlowRole> for Tag {
    fn from(r: FlowRole) -> Self {
        Tag::Role(r)
    }
}

/// Ordered so that iteration and display are reproducible.
pub type TagSet = BTreeSet<Tag>;

/// Build a tag set from anything convertible into tags.
pub fn tag_set<I, T>(tags: I) -> TagSet
where
    I: IntoIterator<Item = T>,
    T: Into<Tag>,
{
    tags.into_iter().map(Into::into).collect()
}
