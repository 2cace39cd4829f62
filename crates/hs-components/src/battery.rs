//! Stationary AC-coupled battery.

use hs_core::{ComponentType, LoadType, PortId, SourceWeight, StepClock, Unit};
use hs_graph::{
    Component, ComponentResult, EvalContext, GraphResult, PortDeclarer, PortSpec, PrepareContext,
};
use serde::{Deserialize, Serialize};

use crate::common::{check_finite, declared, energy_wh, power_w, require_positive};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatteryConfig {
    pub name: String,
    pub capacity_wh: f64,
    /// Charge and discharge limit on the AC side (W)
    pub max_power_w: f64,
    /// One-way conversion efficiency
    pub efficiency: f64,
    /// Initial state of charge, 0..=1
    pub initial_soc: f64,
    pub source_weight: u32,
}

impl Default for BatteryConfig {
    fn default() -> Self {
        Self {
            name: "Battery".into(),
            capacity_wh: 10_000.0,
            max_power_w: 5_000.0,
            efficiency: 0.95,
            initial_soc: 0.5,
            source_weight: SourceWeight::DEFAULT.value(),
        }
    }
}

/// Storage limits shared by the stationary and the car battery.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StorageLimits {
    pub capacity_wh: f64,
    pub max_power_w: f64,
    pub efficiency: f64,
}

impl StorageLimits {
    /// AC power actually exchanged when `requested_w` is asked for, and
    /// the stored energy afterwards.
    ///
    /// # Arguments
    /// * `stored_wh` - Energy held at the start of the timestep
    /// * `requested_w` - AC power asked for; positive charges, negative
    ///   discharges
    /// * `clock` - Timestep length used to convert power to energy
    ///
    /// The request is clamped to `±max_power_w`, then to what the free
    /// capacity (charging) or the stored energy (discharging) can take over
    /// one timestep. Conversion losses apply on the storage side in both
    /// directions.
    pub fn apply(&self, stored_wh: f64, requested_w: f64, clock: &StepClock) -> (f64, f64) {
        let requested = requested_w.clamp(-self.max_power_w, self.max_power_w);
        if requested >= 0.0 {
            let room_wh = (self.capacity_wh - stored_wh).max(0.0);
            let max_ac = power_w(room_wh / self.efficiency, clock);
            let ac = requested.min(max_ac);
            (ac, stored_wh + energy_wh(ac, clock) * self.efficiency)
        } else {
            let max_ac = power_w(stored_wh.max(0.0) * self.efficiency, clock);
            let ac = requested.max(-max_ac);
            (ac, stored_wh + energy_wh(ac, clock) / self.efficiency)
        }
    }

    pub(crate) fn validate(&self) -> ComponentResult<()> {
        require_positive(self.capacity_wh, "battery capacity must be positive")?;
        require_positive(self.max_power_w, "battery power limit must be positive")?;
        require_positive(self.efficiency, "battery efficiency must be positive")
    }
}

#[derive(Debug, Clone, Copy)]
struct BatteryPorts {
    loading_power: PortId,
    ac_power: PortId,
    state_of_charge: PortId,
}

/// Follows the charge or discharge target it receives as closely as its
/// limits allow.
///
/// ## Model
///
/// ```text
/// P_ac   = clamp(P_target, -P_max, P_max), limited by capacity
/// E_next = E + P_ac * dt * eta     (charging)
/// E_next = E + P_ac * dt / eta     (discharging)
/// ```
///
/// The state of charge reported during a timestep is the one at its
/// start.
///
/// ## Sign Conventions
///
/// - `LoadingPowerInput` and `AcBatteryPower` are positive when charging
/// - `StateOfCharge` is in percent of `capacity_wh`
#[derive(Debug, Clone)]
pub struct Battery {
    config: BatteryConfig,
    ports: Option<BatteryPorts>,
    stored_wh: f64,
    saved_wh: f64,
}

impl Battery {
    pub const LOADING_POWER_INPUT: &'static str = "LoadingPowerInput";
    pub const AC_BATTERY_POWER: &'static str = "AcBatteryPower";
    pub const STATE_OF_CHARGE: &'static str = "StateOfCharge";

    pub fn new(config: BatteryConfig) -> Self {
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
            max_power_w: self.config.max_power_w,
            efficiency: self.config.efficiency,
        }
    }

    /// State of charge in percent.
    pub fn soc_percent(&self) -> f64 {
        100.0 * self.stored_wh / self.config.capacity_wh
    }
}

impl Component for Battery {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn kind(&self) -> ComponentType {
        ComponentType::Battery
    }

    fn source_weight(&self) -> SourceWeight {
        SourceWeight(self.config.source_weight)
    }

    fn declare_ports(&mut self, ports: &mut PortDeclarer<'_>) -> GraphResult<()> {
        self.ports = Some(BatteryPorts {
            loading_power: ports.input(
                PortSpec::new(Self::LOADING_POWER_INPUT, LoadType::Electricity, Unit::Watt)
                    .describe("Requested power, positive to charge"),
            )?,
            ac_power: ports.output(
                PortSpec::new(Self::AC_BATTERY_POWER, LoadType::Electricity, Unit::Watt)
                    .describe("Power drawn from the house bus, negative when discharging"),
            )?,
            state_of_charge: ports.output(PortSpec::new(
                Self::STATE_OF_CHARGE,
                LoadType::Any,
                Unit::Percent,
            ))?,
        });
        Ok(())
    }

    fn prepare(&mut self, _ctx: &mut PrepareContext<'_>) -> ComponentResult<()> {
        self.limits().validate()
    }

    fn evaluate(&mut self, ctx: &mut EvalContext<'_>) -> ComponentResult<()> {
        let ports = *declared(&self.ports, &self.config.name)?;
        let soc = self.soc_percent();
        let requested = ctx.input(ports.loading_power)?;
        let (ac, stored) = self.limits().apply(self.stored_wh, requested, &ctx.clock());
        self.stored_wh = check_finite(stored, "battery energy")?;

        ctx.set_output(ports.ac_power, ac)?;
        ctx.set_output(ports.state_of_charge, soc)
    }

    fn save_state(&mut self) {
        self.saved_wh = self.stored_wh;
    }

    fn restore_state(&mut self) {
        self.stored_wh = self.saved_wh;
    }
}
