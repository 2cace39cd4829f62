//! Electricity meter aggregating dynamically connected flows.

use hs_core::{ComponentType, FlowRole, LoadType, PortId, Unit, tag_set};
use hs_graph::{
    Component, ComponentResult, EvalContext, GraphResult, PortDeclarer, PortSpec, PrepareContext,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::common::{declared, energy_wh};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElectricityMeterConfig {
    pub name: String,
}

impl Default for ElectricityMeterConfig {
    fn default() -> Self {
        Self {
            name: "ElectricityMeter".into(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct MeterPorts {
    to_or_from_grid: PortId,
    production: PortId,
    consumption: PortId,
    cumulative_production: PortId,
    cumulative_consumption: PortId,
}

/// Sums every input tagged as production or uncontrolled consumption.
///
/// Inputs are created on the meter with `add_dynamic_input_and_connect`
/// and picked up by tag in `prepare`.
///
/// ## Sign Conventions
///
/// - Grid exchange is `production - consumption`, positive when feeding in
/// - The cumulative outputs only grow: fed-in energy collects the positive
///   part of each timestep, drawn energy the negative part (Wh)
#[derive(Debug, Clone)]
pub struct ElectricityMeter {
    config: ElectricityMeterConfig,
    ports: Option<MeterPorts>,
    production_inputs: Vec<PortId>,
    consumption_inputs: Vec<PortId>,
    fed_in_wh: f64,
    drawn_wh: f64,
    saved: (f64, f64),
}

impl ElectricityMeter {
    pub const ELECTRICITY_TO_OR_FROM_GRID: &'static str = "ElectricityToOrFromGrid";
    pub const ELECTRICITY_PRODUCTION: &'static str = "ElectricityProduction";
    pub const ELECTRICITY_CONSUMPTION: &'static str = "ElectricityConsumption";
    pub const CUMULATIVE_PRODUCTION: &'static str = "CumulativeProduction";
    pub const CUMULATIVE_CONSUMPTION: &'static str = "CumulativeConsumption";

    pub fn new(config: ElectricityMeterConfig) -> Self {
        Self {
            config,
            ports: None,
            production_inputs: Vec::new(),
            consumption_inputs: Vec::new(),
            fed_in_wh: 0.0,
            drawn_wh: 0.0,
            saved: (0.0, 0.0),
        }
    }
}

impl Component for ElectricityMeter {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn kind(&self) -> ComponentType {
        ComponentType::ElectricityMeter
    }

    fn declare_ports(&mut self, ports: &mut PortDeclarer<'_>) -> GraphResult<()> {
        let watt = |name| PortSpec::new(name, LoadType::Electricity, Unit::Watt);
        let watt_hour = |name| PortSpec::new(name, LoadType::Electricity, Unit::WattHour);
        self.ports = Some(MeterPorts {
            to_or_from_grid: ports.output(
                watt(Self::ELECTRICITY_TO_OR_FROM_GRID)
                    .describe("Positive when feeding into the grid"),
            )?,
            production: ports.output(watt(Self::ELECTRICITY_PRODUCTION))?,
            consumption: ports.output(watt(Self::ELECTRICITY_CONSUMPTION))?,
            cumulative_production: ports.output(watt_hour(Self::CUMULATIVE_PRODUCTION))?,
            cumulative_consumption: ports.output(watt_hour(Self::CUMULATIVE_CONSUMPTION))?,
        });
        Ok(())
    }

    fn prepare(&mut self, ctx: &mut PrepareContext<'_>) -> ComponentResult<()> {
        self.production_inputs = ctx.resolve_inputs(
            LoadType::Electricity,
            &tag_set([FlowRole::ElectricityProduction]),
            None,
        );
        self.consumption_inputs = ctx.resolve_inputs(
            LoadType::Electricity,
            &tag_set([FlowRole::ElectricityConsumptionUncontrolled]),
            None,
        );
        debug!(
            meter = %self.config.name,
            production = self.production_inputs.len(),
            consumption = self.consumption_inputs.len(),
            "meter inputs resolved"
        );
        Ok(())
    }

    fn evaluate(&mut self, ctx: &mut EvalContext<'_>) -> ComponentResult<()> {
        let ports = *declared(&self.ports, &self.config.name)?;
        let production = ctx.sum_inputs(&self.production_inputs)?;
        let consumption = ctx.sum_inputs(&self.consumption_inputs)?;
        let grid = production - consumption;

        let clock = ctx.clock();
        self.fed_in_wh += energy_wh(grid.max(0.0), &clock);
        self.drawn_wh += energy_wh((-grid).max(0.0), &clock);

        ctx.set_output(ports.to_or_from_grid, grid)?;
        ctx.set_output(ports.production, production)?;
        ctx.set_output(ports.consumption, consumption)?;
        ctx.set_output(ports.cumulative_production, self.fed_in_wh)?;
        ctx.set_output(ports.cumulative_consumption, self.drawn_wh)
    }

    fn save_state(&mut self) {
        self.saved = (self.fed_in_wh, self.drawn_wh);
    }

    fn restore_state(&mut self) {
        (self.fed_in_wh, self.drawn_wh) = self.saved;
    }
}
