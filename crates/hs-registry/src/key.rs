//! Well-known singleton keys and the values they hold.

use serde::{Deserialize, Serialize};

/// Static key for singleton values shared between components.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RegistryKey {
    SetHeatingTemperatureForBuilding,
    SetCoolingTemperatureForBuilding,
    WaterMassFlowRateOfHeatingDistributionSystem,
    WaterMassFlowRateOfHeatGenerator,
    SetHeatingTemperatureForWaterStorage,
    SetCoolingTemperatureForWaterStorage,
    HeatingSystem,
    Location,
    ResultScenarioName,
    ThermalTransmissionCoefficientGlazing,
    ThermalTransmissionSurfaceIndoorAir,
    ThermalTransmissionCoefficientOpaqueEm,
    ThermalTransmissionCoefficientOpaqueMs,
    ThermalTransmissionCoefficientVentilation,
    ThermalCapacityEnvelope,
}

/// Value stored in the registry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum RegistryValue {
    Scalar(f64),
    Flag(bool),
    Text(String),
    Series(Vec<f64>),
}

impl RegistryValue {
    pub fn kind(&self) -> &'static str {
        match self {
            RegistryValue::Scalar(_) => "scalar",
            RegistryValue::Flag(_) => "flag",
            RegistryValue::Text(_) => "text",
            RegistryValue::Series(_) => "series",
        }
    }

    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            RegistryValue::Scalar(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_flag(&self) -> Option<bool> {
        match self {
            RegistryValue::Flag(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            RegistryValue::Text(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_series(&self) -> Option<&[f64]> {
        match self {
            RegistryValue::Series(v) => Some(v),
            _ => None,
        }
    }
}

impl From<f64> for RegistryValue {
    fn from(v: f64) -> Self {
        Self::Scalar(v)
    }
}

impl From<bool> for RegistryValue {
    fn from(v: bool) -> Self {
        Self::Flag(v)
    }
}

impl From<String> for RegistryValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<&str> for RegistryValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<Vec<f64>> for RegistryValue {
    fn from(v: Vec<f64>) -> Self {
        Self::Series(v)
    }
}
