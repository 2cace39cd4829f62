//! Air-source heat pump and its on/off controller.

use hs_core::{ComponentType, LoadType, PortId, Unit};
use hs_graph::{
    Component, ComponentResult, EvalContext, GraphResult, PortDeclarer, PortSpec,
    PredefinedConnection, PrepareContext,
};
use hs_registry::RegistryKey;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::building::Building;
use crate::common::{check_finite, declared, require_positive};
use crate::weather::Weather;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeatPumpControllerConfig {
    pub name: String,
    /// Used when no building published a set temperature (°C)
    pub fallback_set_temperature_c: f64,
    /// Width of the dead band around the set temperature (K)
    pub hysteresis_k: f64,
    /// No heating above this outside temperature (°C)
    pub heating_threshold_outside_c: f64,
}

impl Default for HeatPumpControllerConfig {
    fn default() -> Self {
        Self {
            name: "HeatPumpController".into(),
            fallback_set_temperature_c: 20.0,
            hysteresis_k: 1.0,
            heating_threshold_outside_c: 16.0,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct ControllerPorts {
    temperature_mean: PortId,
    temperature_outside: PortId,
    state: PortId,
}

/// Two-point controller with a dead band around the building's set
/// temperature. Inside the band the previous decision is kept.
#[derive(Debug, Clone)]
pub struct HeatPumpController {
    config: HeatPumpControllerConfig,
    ports: Option<ControllerPorts>,
    set_temperature_c: f64,
    on: bool,
    saved_on: bool,
}

const CONTROLLER_PREDEFINED: &[PredefinedConnection] = &[
    PredefinedConnection::new(
        HeatPumpController::TEMPERATURE_MEAN,
        ComponentType::Building,
        Building::TEMPERATURE_MEAN,
    ),
    PredefinedConnection::new(
        HeatPumpController::TEMPERATURE_OUTSIDE,
        ComponentType::Weather,
        Weather::TEMPERATURE_OUTSIDE,
    ),
];

impl HeatPumpController {
    pub const TEMPERATURE_MEAN: &'static str = "TemperatureMean";
    pub const TEMPERATURE_OUTSIDE: &'static str = "TemperatureOutside";
    pub const STATE: &'static str = "State";

    pub fn new(config: HeatPumpControllerConfig) -> Self {
        let set = config.fallback_set_temperature_c;
        Self {
            config,
            ports: None,
            set_temperature_c: set,
            on: false,
            saved_on: false,
        }
    }

    pub fn set_temperature_c(&self) -> f64 {
        self.set_temperature_c
    }

    /// Next on/off decision given the previous one.
    pub fn decide(&self, was_on: bool, indoor_c: f64, outside_c: f64) -> bool {
        if outside_c >= self.config.heating_threshold_outside_c {
            return false;
        }
        let half_band = 0.5 * self.config.hysteresis_k;
        if indoor_c < self.set_temperature_c - half_band {
            true
        } else if indoor_c > self.set_temperature_c + half_band {
            false
        } else {
            was_on
        }
    }
}

impl Component for HeatPumpController {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn kind(&self) -> ComponentType {
        ComponentType::HeatPumpController
    }

    fn declare_ports(&mut self, ports: &mut PortDeclarer<'_>) -> GraphResult<()> {
        self.ports = Some(ControllerPorts {
            temperature_mean: ports.input(PortSpec::new(
                Self::TEMPERATURE_MEAN,
                LoadType::Temperature,
                Unit::Celsius,
            ))?,
            temperature_outside: ports.input(PortSpec::new(
                Self::TEMPERATURE_OUTSIDE,
                LoadType::Temperature,
                Unit::Celsius,
            ))?,
            state: ports.output(
                PortSpec::new(Self::STATE, LoadType::Any, Unit::Binary)
                    .describe("1 when the heat pump should run"),
            )?,
        });
        Ok(())
    }

    fn predefined_connections(&self) -> &'static [PredefinedConnection] {
        CONTROLLER_PREDEFINED
    }

    fn prepare(&mut self, ctx: &mut PrepareContext<'_>) -> ComponentResult<()> {
        let registry = ctx.registry();
        if registry.exist_entry(RegistryKey::SetHeatingTemperatureForBuilding) {
            self.set_temperature_c =
                registry.get_scalar(RegistryKey::SetHeatingTemperatureForBuilding)?;
        }
        debug!(
            controller = %self.config.name,
            set_temperature_c = self.set_temperature_c,
            "heat pump controller prepared"
        );
        Ok(())
    }

    fn evaluate(&mut self, ctx: &mut EvalContext<'_>) -> ComponentResult<()> {
        let ports = *declared(&self.ports, &self.config.name)?;
        let indoor = ctx.input(ports.temperature_mean)?;
        let outside = ctx.input(ports.temperature_outside)?;
        self.on = self.decide(self.on, indoor, outside);
        ctx.set_output(ports.state, if self.on { 1.0 } else { 0.0 })
    }

    fn save_state(&mut self) {
        self.saved_on = self.on;
    }

    fn restore_state(&mut self) {
        self.on = self.saved_on;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeatPumpConfig {
    pub name: String,
    /// Heat output when running (W)
    pub rated_thermal_power_w: f64,
    /// Coefficient of performance at 7 °C outside
    pub cop_at_7c: f64,
    /// COP change per K of outside temperature
    pub cop_slope_per_k: f64,
    pub min_cop: f64,
}

impl Default for HeatPumpConfig {
    fn default() -> Self {
        Self {
            name: "HeatPump".into(),
            rated_thermal_power_w: 6_000.0,
            cop_at_7c: 3.5,
            cop_slope_per_k: 0.08,
            min_cop: 1.5,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct HeatPumpPorts {
    state: PortId,
    temperature_outside: PortId,
    thermal_power_delivered: PortId,
    electrical_input_power: PortId,
    cop: PortId,
}

/// Fixed-output heat pump with a linear COP in outside temperature.
#[derive(Debug, Clone)]
pub struct HeatPump {
    config: HeatPumpConfig,
    ports: Option<HeatPumpPorts>,
}

const HEAT_PUMP_PREDEFINED: &[PredefinedConnection] = &[
    PredefinedConnection::new(
        HeatPump::STATE,
        ComponentType::HeatPumpController,
        HeatPumpController::STATE,
    ),
    PredefinedConnection::new(
        HeatPump::TEMPERATURE_OUTSIDE,
        ComponentType::Weather,
        Weather::TEMPERATURE_OUTSIDE,
    ),
];

impl HeatPump {
    pub const STATE: &'static str = "State";
    pub const TEMPERATURE_OUTSIDE: &'static str = "TemperatureOutside";
    pub const THERMAL_POWER_DELIVERED: &'static str = "ThermalPowerDelivered";
    pub const ELECTRICAL_INPUT_POWER: &'static str = "ElectricalInputPower";
    pub const COP: &'static str = "Cop";

    pub fn new(config: HeatPumpConfig) -> Self {
        Self {
            config,
            ports: None,
        }
    }

    pub fn cop(&self, outside_c: f64) -> f64 {
        let c = &self.config;
        (c.cop_at_7c + c.cop_slope_per_k * (outside_c - 7.0)).max(c.min_cop)
    }
}

impl Component for HeatPump {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn kind(&self) -> ComponentType {
        ComponentType::HeatPump
    }

    fn declare_ports(&mut self, ports: &mut PortDeclarer<'_>) -> GraphResult<()> {
        self.ports = Some(HeatPumpPorts {
            state: ports.input(PortSpec::new(Self::STATE, LoadType::Any, Unit::Binary))?,
            temperature_outside: ports.input(PortSpec::new(
                Self::TEMPERATURE_OUTSIDE,
                LoadType::Temperature,
                Unit::Celsius,
            ))?,
            thermal_power_delivered: ports.output(PortSpec::new(
                Self::THERMAL_POWER_DELIVERED,
                LoadType::Heat,
                Unit::Watt,
            ))?,
            electrical_input_power: ports.output(
                PortSpec::new(Self::ELECTRICAL_INPUT_POWER, LoadType::Electricity, Unit::Watt)
                    .with_tags([ComponentType::HeatPump]),
            )?,
            cop: ports.output(PortSpec::new(Self::COP, LoadType::Any, Unit::Any))?,
        });
        Ok(())
    }

    fn predefined_connections(&self) -> &'static [PredefinedConnection] {
        HEAT_PUMP_PREDEFINED
    }

    fn prepare(&mut self, _ctx: &mut PrepareContext<'_>) -> ComponentResult<()> {
        require_positive(self.config.rated_thermal_power_w, "rated thermal power must be positive")?;
        require_positive(self.config.min_cop, "minimum COP must be positive")
    }

    fn evaluate(&mut self, ctx: &mut EvalContext<'_>) -> ComponentResult<()> {
        let ports = *declared(&self.ports, &self.config.name)?;
        let running = ctx.input(ports.state)? > 0.5;
        let cop = check_finite(self.cop(ctx.input(ports.temperature_outside)?), "COP")?;
        let thermal = if running {
            self.config.rated_thermal_power_w
        } else {
            0.0
        };
        ctx.set_output(ports.thermal_power_delivered, thermal)?;
        ctx.set_output(ports.electrical_input_power, thermal / cop)?;
        ctx.set_output(ports.cop, cop)
    }
}
