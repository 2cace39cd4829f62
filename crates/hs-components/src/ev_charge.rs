//! Wallbox controller for one car.

use hs_core::{ComponentType, LoadType, PortId, Unit};
use hs_graph::{
    Component, ComponentResult, EvalContext, GraphResult, PortDeclarer, PortSpec,
    PredefinedConnection, PrepareContext,
};
use serde::{Deserialize, Serialize};

use crate::car::Car;
use crate::car_battery::CarBattery;
use crate::common::{declared, require_positive};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvChargeControllerConfig {
    pub name: String,
    pub max_charging_power_w: f64,
    /// Below this state of charge (%) the car charges at full power
    pub min_soc_percent: f64,
    /// Stop charging above this state of charge (%)
    pub max_soc_percent: f64,
    /// Follow the surplus target from the energy management when set
    pub surplus_control: bool,
}

impl Default for EvChargeControllerConfig {
    fn default() -> Self {
        Self {
            name: "EvChargeController".into(),
            max_charging_power_w: 11_000.0,
            min_soc_percent: 40.0,
            max_soc_percent: 100.0,
            surplus_control: true,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct ChargerPorts {
    car_location: PortId,
    state_of_charge: PortId,
    ac_battery_power: PortId,
    electricity_target: PortId,
    to_or_from_battery: PortId,
    charging_power_to_ems: PortId,
}

const PREDEFINED: &[PredefinedConnection] = &[
    PredefinedConnection::new(
        EvChargeController::CAR_LOCATION,
        ComponentType::Car,
        Car::CAR_LOCATION,
    ),
    PredefinedConnection::new(
        EvChargeController::STATE_OF_CHARGE,
        ComponentType::CarBattery,
        CarBattery::STATE_OF_CHARGE,
    ),
    PredefinedConnection::new(
        EvChargeController::AC_BATTERY_POWER,
        ComponentType::CarBattery,
        CarBattery::AC_BATTERY_POWER,
    ),
];

/// Decides how much to charge while the car is at home.
#[derive(Debug, Clone)]
pub struct EvChargeController {
    config: EvChargeControllerConfig,
    ports: Option<ChargerPorts>,
}

impl EvChargeController {
    pub const CAR_LOCATION: &'static str = "CarLocation";
    pub const STATE_OF_CHARGE: &'static str = "StateOfCharge";
    pub const AC_BATTERY_POWER: &'static str = "AcBatteryPower";
    pub const ELECTRICITY_TARGET: &'static str = "ElectricityTarget";
    pub const TO_OR_FROM_BATTERY: &'static str = "ToOrFromBattery";
    pub const BATTERY_CHARGING_POWER_TO_EMS: &'static str = "BatteryChargingPowerToEMS";

    pub fn new(config: EvChargeControllerConfig) -> Self {
        Self {
            config,
            ports: None,
        }
    }

    /// Charging request for the given situation.
    pub fn request(&self, at_home: bool, soc_percent: f64, target_w: f64) -> f64 {
        let c = &self.config;
        if !at_home || soc_percent >= c.max_soc_percent {
            0.0
        } else if soc_percent < c.min_soc_percent || !c.surplus_control {
            c.max_charging_power_w
        } else {
            target_w.clamp(0.0, c.max_charging_power_w)
        }
    }
}

impl Component for EvChargeController {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn kind(&self) -> ComponentType {
        ComponentType::EvChargeController
    }

    fn declare_ports(&mut self, ports: &mut PortDeclarer<'_>) -> GraphResult<()> {
        self.ports = Some(ChargerPorts {
            car_location: ports.input(PortSpec::new(
                Self::CAR_LOCATION,
                LoadType::Any,
                Unit::Binary,
            ))?,
            state_of_charge: ports.input(PortSpec::new(
                Self::STATE_OF_CHARGE,
                LoadType::Any,
                Unit::Percent,
            ))?,
            ac_battery_power: ports.input(PortSpec::new(
                Self::AC_BATTERY_POWER,
                LoadType::Electricity,
                Unit::Watt,
            ))?,
            electricity_target: ports.input(
                PortSpec::new(Self::ELECTRICITY_TARGET, LoadType::Electricity, Unit::Watt)
                    .optional()
                    .describe("Surplus offered by the energy management"),
            )?,
            to_or_from_battery: ports.output(PortSpec::new(
                Self::TO_OR_FROM_BATTERY,
                LoadType::Electricity,
                Unit::Watt,
            ))?,
            charging_power_to_ems: ports.output(
                PortSpec::new(
                    Self::BATTERY_CHARGING_POWER_TO_EMS,
                    LoadType::Electricity,
                    Unit::Watt,
                )
                .describe("Power really drawn from the house bus"),
            )?,
        });
        Ok(())
    }

    fn predefined_connections(&self) -> &'static [PredefinedConnection] {
        PREDEFINED
    }

    fn prepare(&mut self, _ctx: &mut PrepareContext<'_>) -> ComponentResult<()> {
        require_positive(
            self.config.max_charging_power_w,
            "charging power must be positive",
        )
    }

    fn evaluate(&mut self, ctx: &mut EvalContext<'_>) -> ComponentResult<()> {
        let ports = *declared(&self.ports, &self.config.name)?;
        let at_home = ctx.input(ports.car_location)? > 0.5;
        let soc = ctx.input(ports.state_of_charge)?;
        let target = ctx.input(ports.electricity_target)?;

        let request = self.request(at_home, soc, target);
        ctx.set_output(ports.to_or_from_battery, request)?;
        let accepted = ctx.input(ports.ac_battery_power)?;
        ctx.set_output(ports.charging_power_to_ems, accepted)
    }
}
