//! Residents' electricity demand and internal heat gains.

use hs_core::{ComponentType, FlowRole, LoadType, PortId, Unit};
use hs_graph::{Component, ComponentResult, EvalContext, GraphResult, PortDeclarer, PortSpec};
use serde::{Deserialize, Serialize};

use crate::common::{daily_bump, declared};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OccupancyConfig {
    pub name: String,
    pub number_of_residents: u32,
    /// Always-on appliances (W)
    pub base_load_w: f64,
    /// Extra demand at the morning and evening peaks (W)
    pub peak_load_w: f64,
    /// Sensible heat given off per present resident (W)
    pub heat_per_resident_w: f64,
}

impl Default for OccupancyConfig {
    fn default() -> Self {
        Self {
            name: "Occupancy".into(),
            number_of_residents: 2,
            base_load_w: 150.0,
            peak_load_w: 1_200.0,
            heat_per_resident_w: 80.0,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct OccupancyPorts {
    electricity_output: PortId,
    heating_by_residents: PortId,
    number_of_residents: PortId,
}

/// Fixed daily profile: residents are away 08:00-17:00, with demand
/// peaks around 07:00 and 19:00.
#[derive(Debug, Clone)]
pub struct Occupancy {
    config: OccupancyConfig,
    ports: Option<OccupancyPorts>,
}

impl Occupancy {
    pub const ELECTRICITY_OUTPUT: &'static str = "ElectricityOutput";
    pub const HEATING_BY_RESIDENTS: &'static str = "HeatingByResidents";
    pub const NUMBER_OF_RESIDENTS: &'static str = "NumberOfResidents";

    pub fn new(config: OccupancyConfig) -> Self {
        Self {
            config,
            ports: None,
        }
    }

    pub fn residents_at_home(&self, hour: f64) -> u32 {
        if (8.0..17.0).contains(&hour) {
            0
        } else {
            self.config.number_of_residents
        }
    }

    pub fn electricity_demand(&self, hour: f64) -> f64 {
        let peaks = daily_bump(hour, 7.0, 1.5) + daily_bump(hour, 19.0, 3.0);
        self.config.base_load_w + self.config.peak_load_w * peaks.min(1.0)
    }
}

impl Component for Occupancy {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn kind(&self) -> ComponentType {
        ComponentType::Occupancy
    }

    fn declare_ports(&mut self, ports: &mut PortDeclarer<'_>) -> GraphResult<()> {
        self.ports = Some(OccupancyPorts {
            electricity_output: ports.output(
                PortSpec::new(Self::ELECTRICITY_OUTPUT, LoadType::Electricity, Unit::Watt)
                    .with_tags([FlowRole::ElectricityConsumptionUncontrolled])
                    .describe("Household appliance demand"),
            )?,
            heating_by_residents: ports.output(PortSpec::new(
                Self::HEATING_BY_RESIDENTS,
                LoadType::Heat,
                Unit::Watt,
            ))?,
            number_of_residents: ports.output(PortSpec::new(
                Self::NUMBER_OF_RESIDENTS,
                LoadType::Any,
                Unit::Any,
            ))?,
        });
        Ok(())
    }

    fn evaluate(&mut self, ctx: &mut EvalContext<'_>) -> ComponentResult<()> {
        let ports = *declared(&self.ports, &self.config.name)?;
        let hour = ctx.clock().hour_of_day();
        let present = self.residents_at_home(hour);
        ctx.set_output(ports.electricity_output, self.electricity_demand(hour))?;
        ctx.set_output(
            ports.heating_by_residents,
            f64::from(present) * self.config.heat_per_resident_w,
        )?;
        ctx.set_output(ports.number_of_residents, f64::from(present))?;
        Ok(())
    }
}
