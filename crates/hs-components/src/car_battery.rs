//! Traction battery of an electric car.

use hs_core::{ComponentType, LoadType, PortId, SourceWeight, Unit};
use hs_graph::{
    Component, ComponentResult, EvalContext, GraphResult, PortDeclarer, PortSpec,
    PredefinedConnection, PrepareContext,
};
use serde::{Deserialize, Serialize};

use crate::battery::StorageLimits;
use crate::car::Car;
use crate::common::{check_finite, declared, energy_wh};
use crate::ev_charge::EvChargeController;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CarBatteryConfig {
    pub name: String,
    pub capacity_wh: f64,
    /// Charging limit at the home wallbox (W)
    pub max_charging_power_w: f64,
    pub efficiency: f64,
    pub initial_soc: f64,
    pub source_weight: u32,
}

impl Default for CarBatteryConfig {
    fn default() -> Self {
        Self {
            name: "CarBattery".into(),
            capacity_wh: 50_000.0,
            max_charging_power_w: 11_000.0,
            efficiency: 0.96,
            initial_soc: 0.5,
            source_weight: 1,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct CarBatteryPorts {
    to_or_from_battery: PortId,
    car_consumption: PortId,
    ac_power: PortId,
    state_of_charge: PortId,
}

const PREDEFINED: &[PredefinedConnection] = &[
    PredefinedConnection::new(
        CarBattery::TO_OR_FROM_BATTERY,
        ComponentType::EvChargeController,
        EvChargeController::TO_OR_FROM_BATTERY,
    ),
    PredefinedConnection::new(
        CarBattery::CAR_CONSUMPTION,
        ComponentType::Car,
        Car::ELECTRICITY_OUTPUT,
    ),
];

/// Charged by its controller at home and drained by driving.
///
/// Publishes its state of charge in the registry under its source weight
/// so that the energy management can report a fleet average.
///
/// ## Sign Conventions
///
/// - Only charging is possible; a negative request is read as zero
/// - Driving consumption is taken from the stored energy without
///   conversion losses and never drives it below zero
#[derive(Debug, Clone)]
pub struct CarBattery {
    config: CarBatteryConfig,
    ports: Option<CarBatteryPorts>,
    stored_wh: f64,
    saved_wh: f64,
}

impl CarBattery {
    pub const TO_OR_FROM_BATTERY: &'static str = "ToOrFromBattery";
    pub const CAR_CONSUMPTION: &'static str = "CarConsumption";
    pub const AC_BATTERY_POWER: &'static str = "AcBatteryPower";
    pub const STATE_OF_CHARGE: &'static str = "StateOfCharge";

    pub fn new(config: CarBatteryConfig) -> Self {
        let stored = config.initial_soc.clamp(0.0, 1.0) * config.capacity_wh;
        Self {
            config,
            ports: None,
            stored_wh: stored,
            saved_wh: stored,
        }
    }

    pub fn limits(&self) -> StorageLimits {
        StorageLimits {
            capacity_wh: self.config.capacity_wh,
            max_power_w: self.config.max_charging_power_w,
            efficiency: self.config.efficiency,
        }
    }

    pub fn soc_percent(&self) -> f64 {
        100.0 * self.stored_wh / self.config.capacity_wh
    }
}

impl Component for CarBattery {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn kind(&self) -> ComponentType {
        ComponentType::CarBattery
    }

    fn source_weight(&self) -> SourceWeight {
        SourceWeight(self.config.source_weight)
    }

    fn declare_ports(&mut self, ports: &mut PortDeclarer<'_>) -> GraphResult<()> {
        self.ports = Some(CarBatteryPorts {
            to_or_from_battery: ports.input(PortSpec::new(
                Self::TO_OR_FROM_BATTERY,
                LoadType::Electricity,
                Unit::Watt,
            ))?,
            car_consumption: ports.input(PortSpec::new(
                Self::CAR_CONSUMPTION,
                LoadType::Electricity,
                Unit::Watt,
            ))?,
            ac_power: ports.output(
                PortSpec::new(Self::AC_BATTERY_POWER, LoadType::Electricity, Unit::Watt)
                    .describe("Charging power actually accepted"),
            )?,
            state_of_charge: ports.output(PortSpec::new(
                Self::STATE_OF_CHARGE,
                LoadType::Any,
                Unit::Percent,
            ))?,
        });
        Ok(())
    }

    fn predefined_connections(&self) -> &'static [PredefinedConnection] {
        PREDEFINED
    }

    fn prepare(&mut self, ctx: &mut PrepareContext<'_>) -> ComponentResult<()> {
        self.limits().validate()?;
        let soc = self.soc_percent();
        ctx.registry()
            .set_dynamic_entry(ComponentType::CarBattery, self.source_weight(), soc);
        Ok(())
    }

    fn evaluate(&mut self, ctx: &mut EvalContext<'_>) -> ComponentResult<()> {
        let ports = *declared(&self.ports, &self.config.name)?;
        let soc = self.soc_percent();
        let requested = ctx.input(ports.to_or_from_battery)?.max(0.0);
        let driving = ctx.input(ports.car_consumption)?.max(0.0);
        let clock = ctx.clock();

        let (accepted, charged) = self.limits().apply(self.stored_wh, requested, &clock);
        let stored = (charged - energy_wh(driving, &clock)).max(0.0);
        self.stored_wh = check_finite(stored, "car battery energy")?;

        let weight = self.source_weight();
        ctx.registry()
            .set_dynamic_entry(ComponentType::CarBattery, weight, soc);
        ctx.set_output(ports.ac_power, accepted)?;
        ctx.set_output(ports.state_of_charge, soc)
    }

    fn save_state(&mut self) {
        self.saved_wh = self.stored_wh;
    }

    fn restore_state(&mut self) {
        self.stored_wh = self.saved_wh;
    }
}
