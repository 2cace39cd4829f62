//! Photovoltaic system.

use hs_core::{ComponentType, FlowRole, LoadType, PortId, Unit};
use hs_graph::{
    Component, ComponentResult, EvalContext, GraphResult, PortDeclarer, PortSpec,
    PredefinedConnection, PrepareContext,
};
use serde::{Deserialize, Serialize};

use crate::common::{check_finite, declared, require_positive};
use crate::weather::Weather;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PvSystemConfig {
    pub name: String,
    /// Module area (m²)
    pub area_m2: f64,
    /// Module efficiency at 25 °C
    pub efficiency: f64,
    /// Relative efficiency loss per K above 25 °C cell temperature
    pub temperature_coefficient: f64,
    /// Inverter efficiency
    pub inverter_efficiency: f64,
    pub source_weight: u32,
}

impl Default for PvSystemConfig {
    fn default() -> Self {
        Self {
            name: "PvSystem".into(),
            area_m2: 30.0,
            efficiency: 0.2,
            temperature_coefficient: 0.004,
            inverter_efficiency: 0.96,
            source_weight: 999,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct PvPorts {
    temperature_outside: PortId,
    direct_normal_irradiance: PortId,
    electricity_output: PortId,
}

/// AC output from irradiance with a linear cell-temperature derating.
#[derive(Debug, Clone)]
pub struct PvSystem {
    config: PvSystemConfig,
    ports: Option<PvPorts>,
}

const PREDEFINED: &[PredefinedConnection] = &[
    PredefinedConnection::new(
        PvSystem::TEMPERATURE_OUTSIDE,
        ComponentType::Weather,
        Weather::TEMPERATURE_OUTSIDE,
    ),
    PredefinedConnection::new(
        PvSystem::DIRECT_NORMAL_IRRADIANCE,
        ComponentType::Weather,
        Weather::DIRECT_NORMAL_IRRADIANCE,
    ),
];

impl PvSystem {
    pub const TEMPERATURE_OUTSIDE: &'static str = "TemperatureOutside";
    pub const DIRECT_NORMAL_IRRADIANCE: &'static str = "DirectNormalIrradiance";
    pub const ELECTRICITY_OUTPUT: &'static str = "ElectricityOutput";

    pub fn new(config: PvSystemConfig) -> Self {
        Self {
            config,
            ports: None,
        }
    }

    /// AC power for the given irradiance and outside temperature.
    pub fn ac_power(&self, irradiance_w_m2: f64, temperature_c: f64) -> f64 {
        let c = &self.config;
        let cell_temperature = temperature_c + 0.03 * irradiance_w_m2;
        let derating = (1.0 - c.temperature_coefficient * (cell_temperature - 25.0)).clamp(0.0, 1.2);
        (irradiance_w_m2 * c.area_m2 * c.efficiency * derating * c.inverter_efficiency).max(0.0)
    }
}

impl Component for PvSystem {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn kind(&self) -> ComponentType {
        ComponentType::PvSystem
    }

    fn source_weight(&self) -> hs_core::SourceWeight {
        self.config.source_weight.into()
    }

    fn declare_ports(&mut self, ports: &mut PortDeclarer<'_>) -> GraphResult<()> {
        self.ports = Some(PvPorts {
            temperature_outside: ports.input(PortSpec::new(
                Self::TEMPERATURE_OUTSIDE,
                LoadType::Temperature,
                Unit::Celsius,
            ))?,
            direct_normal_irradiance: ports.input(PortSpec::new(
                Self::DIRECT_NORMAL_IRRADIANCE,
                LoadType::Irradiance,
                Unit::WattPerSquareMeter,
            ))?,
            electricity_output: ports.output(
                PortSpec::new(Self::ELECTRICITY_OUTPUT, LoadType::Electricity, Unit::Watt)
                    .with_tags([FlowRole::ElectricityProduction])
                    .describe("AC power fed to the house"),
            )?,
        });
        Ok(())
    }

    fn predefined_connections(&self) -> &'static [PredefinedConnection] {
        PREDEFINED
    }

    fn prepare(&mut self, _ctx: &mut PrepareContext<'_>) -> ComponentResult<()> {
        require_positive(self.config.area_m2, "PV area must be positive")?;
        require_positive(self.config.efficiency, "PV efficiency must be positive")
    }

    fn evaluate(&mut self, ctx: &mut EvalContext<'_>) -> ComponentResult<()> {
        let ports = *declared(&self.ports, &self.config.name)?;
        let irradiance = ctx.input(ports.direct_normal_irradiance)?;
        let temperature = ctx.input(ports.temperature_outside)?;
        let power = check_finite(self.ac_power(irradiance, temperature), "PV output")?;
        ctx.set_output(ports.electricity_output, power)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dark_means_no_output() {
        let pv = PvSystem::new(PvSystemConfig::default());
        assert_eq!(pv.ac_power(0.0, 10.0), 0.0);
    }

    #[test]
    fn hot_cells_produce_less() {
        let pv = PvSystem::new(PvSystemConfig::default());
        assert!(pv.ac_power(800.0, 0.0) > pv.ac_power(800.0, 30.0));
    }
}
