//! Energy management system distributing surplus by priority.

use hs_core::{ComponentType, FlowRole, LoadType, PortId, SourceWeight, Unit, tag_set};
use hs_graph::{
    Component, ComponentResult, EvalContext, GraphResult, PortDeclarer, PortSpec, PrepareContext,
};
use hs_registry::SharedRegistry;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::common::declared;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmsConfig {
    pub name: String,
}

impl Default for EmsConfig {
    fn default() -> Self {
        Self {
            name: "EnergyManagementSystem".into(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct EmsPorts {
    to_or_from_grid: PortId,
    total_consumption: PortId,
    mean_car_soc: PortId,
}

/// One controllable device: the target handed to it and the power it
/// actually drew.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Priority {
    weight: SourceWeight,
    target: PortId,
    real: Option<PortId>,
}

/// Offers the electricity balance to controllable devices in ascending
/// source weight.
///
/// Targets are dynamic outputs tagged `ElectricityTarget`; real power
/// arrives on dynamic inputs tagged `ElectricityReal` with the same
/// weight.
///
/// ## Model
///
/// ```text
/// available_0 = Σ production - Σ uncontrolled consumption
/// target_k    = available_k
/// available_k+1 = available_k - real_k
/// grid        = available_n
/// consumption = Σ uncontrolled consumption + Σ real_k
/// ```
///
/// `real_k` may lag one evaluation behind the target it answers, so the
/// balance settles over the fixed-point iteration.
///
/// ## Sign Conventions
///
/// - `ElectricityToOrFromGrid` is positive when feeding in, negative when
///   drawing from the grid
/// - A target is negative when there is a deficit; a battery reads that as
///   a discharge request
/// - `real_k` is positive when the device draws power
#[derive(Debug, Clone)]
pub struct EnergyManagementSystem {
    config: EmsConfig,
    ports: Option<EmsPorts>,
    production: Vec<PortId>,
    consumption: Vec<PortId>,
    priorities: Vec<Priority>,
}

impl EnergyManagementSystem {
    pub const ELECTRICITY_TO_OR_FROM_GRID: &'static str = "ElectricityToOrFromGrid";
    pub const TOTAL_ELECTRICITY_CONSUMPTION: &'static str = "TotalElectricityConsumption";
    pub const MEAN_CAR_STATE_OF_CHARGE: &'static str = "MeanCarStateOfCharge";

    pub fn new(config: EmsConfig) -> Self {
        Self {
            config,
            ports: None,
            production: Vec::new(),
            consumption: Vec::new(),
            priorities: Vec::new(),
        }
    }

    /// Weights of the controllable devices, in service order.
    pub fn priority_weights(&self) -> Vec<SourceWeight> {
        self.priorities.iter().map(|p| p.weight).collect()
    }
}

/// Mean of the car battery charge levels published in the registry.
fn mean_car_soc(registry: &SharedRegistry) -> f64 {
    let values: Vec<f64> = registry
        .get_dynamic_component_weights(ComponentType::CarBattery)
        .into_iter()
        .filter_map(|w| registry.get_dynamic_entry(ComponentType::CarBattery, w))
        .filter_map(|v| v.as_scalar())
        .collect();
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

impl Component for EnergyManagementSystem {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn kind(&self) -> ComponentType {
        ComponentType::EnergyManagementSystem
    }

    fn declare_ports(&mut self, ports: &mut PortDeclarer<'_>) -> GraphResult<()> {
        self.ports = Some(EmsPorts {
            to_or_from_grid: ports.output(
                PortSpec::new(
                    Self::ELECTRICITY_TO_OR_FROM_GRID,
                    LoadType::Electricity,
                    Unit::Watt,
                )
                .describe("Balance after serving all devices, positive when feeding in"),
            )?,
            total_consumption: ports.output(PortSpec::new(
                Self::TOTAL_ELECTRICITY_CONSUMPTION,
                LoadType::Electricity,
                Unit::Watt,
            ))?,
            mean_car_soc: ports.output(PortSpec::new(
                Self::MEAN_CAR_STATE_OF_CHARGE,
                LoadType::Any,
                Unit::Percent,
            ))?,
        });
        Ok(())
    }

    fn prepare(&mut self, ctx: &mut PrepareContext<'_>) -> ComponentResult<()> {
        self.production = ctx.resolve_inputs(
            LoadType::Electricity,
            &tag_set([FlowRole::ElectricityProduction]),
            None,
        );
        self.consumption = ctx.resolve_inputs(
            LoadType::Electricity,
            &tag_set([FlowRole::ElectricityConsumptionUncontrolled]),
            None,
        );

        let real_tags = tag_set([FlowRole::ElectricityReal]);
        self.priorities = ctx
            .dynamic_outputs(&tag_set([FlowRole::ElectricityTarget]))
            .into_iter()
            .map(|slot| Priority {
                weight: slot.source_weight,
                target: slot.port,
                real: ctx
                    .resolve_inputs(LoadType::Electricity, &real_tags, Some(slot.source_weight))
                    .first()
                    .copied(),
            })
            .collect();

        debug!(
            ems = %self.config.name,
            production = self.production.len(),
            consumption = self.consumption.len(),
            devices = self.priorities.len(),
            "energy management resolved"
        );
        Ok(())
    }

    fn evaluate(&mut self, ctx: &mut EvalContext<'_>) -> ComponentResult<()> {
        let ports = *declared(&self.ports, &self.config.name)?;
        let production = ctx.sum_inputs(&self.production)?;
        let mut consumption = ctx.sum_inputs(&self.consumption)?;

        let mut available = production - consumption;
        for priority in &self.priorities {
            ctx.set_output(priority.target, available)?;
            let drawn = match priority.real {
                Some(port) => ctx.input(port)?,
                None => 0.0,
            };
            available -= drawn;
            consumption += drawn;
        }

        let soc = mean_car_soc(ctx.registry_ref());
        ctx.set_output(ports.to_or_from_grid, available)?;
        ctx.set_output(ports.total_consumption, consumption)?;
        ctx.set_output(ports.mean_car_soc, soc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_soc_over_published_cars() {
        let mut registry = SharedRegistry::new();
        assert_eq!(mean_car_soc(&registry), 0.0);
        registry.set_dynamic_entry(ComponentType::CarBattery, SourceWeight(1), 40.0);
        registry.set_dynamic_entry(ComponentType::CarBattery, SourceWeight(2), 80.0);
        registry.set_dynamic_entry(ComponentType::Battery, SourceWeight(3), 10.0);
        assert_eq!(mean_car_soc(&registry), 60.0);
    }
}
