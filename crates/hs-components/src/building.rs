//! Single-zone building with a lumped thermal capacity.

use hs_core::{ComponentType, LoadType, PortId, Unit};
use hs_graph::{
    Component, ComponentResult, EvalContext, GraphResult, PortDeclarer, PortSpec,
    PredefinedConnection, PrepareContext,
};
use hs_registry::RegistryKey;
use serde::{Deserialize, Serialize};

use crate::common::{check_finite, declared, require_positive};
use crate::occupancy::Occupancy;
use crate::weather::Weather;

/// Envelope of a typical German single-family home.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildingConfig {
    pub name: String,
    /// Heat transfer through windows (W/K)
    pub h_transmission_glazing_w_k: f64,
    /// Coupling between internal surfaces and indoor air (W/K)
    pub h_transmission_surface_indoor_air_w_k: f64,
    /// Opaque elements, exterior to mass node (W/K)
    pub h_transmission_opaque_em_w_k: f64,
    /// Opaque elements, mass node to surface (W/K)
    pub h_transmission_opaque_ms_w_k: f64,
    /// Ventilation losses (W/K)
    pub h_ventilation_w_k: f64,
    /// Effective thermal capacity of the envelope (J/K)
    pub thermal_capacity_j_k: f64,
    /// Effective solar aperture: irradiance times this area enters as heat (m²)
    pub solar_aperture_m2: f64,
    pub set_heating_temperature_c: f64,
    pub set_cooling_temperature_c: f64,
    pub initial_temperature_c: f64,
}

impl Default for BuildingConfig {
    fn default() -> Self {
        Self {
            name: "Building".into(),
            h_transmission_glazing_w_k: 60.0,
            h_transmission_surface_indoor_air_w_k: 900.0,
            h_transmission_opaque_em_w_k: 130.0,
            h_transmission_opaque_ms_w_k: 1_300.0,
            h_ventilation_w_k: 50.0,
            thermal_capacity_j_k: 2.5e7,
            solar_aperture_m2: 4.0,
            set_heating_temperature_c: 20.0,
            set_cooling_temperature_c: 24.0,
            initial_temperature_c: 20.0,
        }
    }
}

impl BuildingConfig {
    /// Overall loss coefficient to the outside (W/K).
    pub fn heat_loss_coefficient(&self) -> f64 {
        let opaque = 1.0
            / (1.0 / self.h_transmission_opaque_em_w_k + 1.0 / self.h_transmission_opaque_ms_w_k);
        self.h_transmission_glazing_w_k + self.h_ventilation_w_k + opaque
    }
}

#[derive(Debug, Clone, Copy)]
struct BuildingPorts {
    temperature_outside: PortId,
    direct_normal_irradiance: PortId,
    heating_by_residents: PortId,
    thermal_power_delivered: PortId,
    temperature_mean: PortId,
    theoretical_demand: PortId,
}

/// One capacity, one loss coefficient, stepped with implicit Euler.
///
/// `TemperatureMean` reports the temperature at the start of the
/// timestep, which is what a thermostat sees while the step is running.
#[derive(Debug, Clone)]
pub struct Building {
    config: BuildingConfig,
    ports: Option<BuildingPorts>,
    temperature_c: f64,
    saved_temperature_c: f64,
}

const PREDEFINED: &[PredefinedConnection] = &[
    PredefinedConnection::new(
        Building::TEMPERATURE_OUTSIDE,
        ComponentType::Weather,
        Weather::TEMPERATURE_OUTSIDE,
    ),
    PredefinedConnection::new(
        Building::DIRECT_NORMAL_IRRADIANCE,
        ComponentType::Weather,
        Weather::DIRECT_NORMAL_IRRADIANCE,
    ),
    PredefinedConnection::new(
        Building::HEATING_BY_RESIDENTS,
        ComponentType::Occupancy,
        Occupancy::HEATING_BY_RESIDENTS,
    ),
];

impl Building {
    pub const TEMPERATURE_OUTSIDE: &'static str = "TemperatureOutside";
    pub const DIRECT_NORMAL_IRRADIANCE: &'static str = "DirectNormalIrradiance";
    pub const HEATING_BY_RESIDENTS: &'static str = "HeatingByResidents";
    pub const THERMAL_POWER_DELIVERED: &'static str = "ThermalPowerDelivered";
    pub const TEMPERATURE_MEAN: &'static str = "TemperatureMean";
    pub const THEORETICAL_THERMAL_BUILDING_DEMAND: &'static str =
        "TheoreticalThermalBuildingDemand";

    pub fn new(config: BuildingConfig) -> Self {
        let t0 = config.initial_temperature_c;
        Self {
            config,
            ports: None,
            temperature_c: t0,
            saved_temperature_c: t0,
        }
    }

    pub fn temperature_c(&self) -> f64 {
        self.temperature_c
    }

    /// Indoor temperature after `dt` seconds with constant gains.
    pub fn step_temperature(&self, start_c: f64, outside_c: f64, gains_w: f64, dt: f64) -> f64 {
        let c = self.config.thermal_capacity_j_k;
        let h = self.config.heat_loss_coefficient();
        (c * start_c + dt * (gains_w + h * outside_c)) / (c + dt * h)
    }

    /// Heating power that would hold the set temperature (W, never negative).
    pub fn theoretical_demand(&self, outside_c: f64, passive_gains_w: f64) -> f64 {
        let h = self.config.heat_loss_coefficient();
        (h * (self.config.set_heating_temperature_c - outside_c) - passive_gains_w).max(0.0)
    }
}

impl Component for Building {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn kind(&self) -> ComponentType {
        ComponentType::Building
    }

    fn declare_ports(&mut self, ports: &mut PortDeclarer<'_>) -> GraphResult<()> {
        self.ports = Some(BuildingPorts {
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
            heating_by_residents: ports.input(
                PortSpec::new(Self::HEATING_BY_RESIDENTS, LoadType::Heat, Unit::Watt).optional(),
            )?,
            thermal_power_delivered: ports.input(
                PortSpec::new(Self::THERMAL_POWER_DELIVERED, LoadType::Heat, Unit::Watt)
                    .describe("Heat delivered by the heating system"),
            )?,
            temperature_mean: ports.output(
                PortSpec::new(Self::TEMPERATURE_MEAN, LoadType::Temperature, Unit::Celsius)
                    .describe("Indoor air temperature at the start of the timestep"),
            )?,
            theoretical_demand: ports.output(PortSpec::new(
                Self::THEORETICAL_THERMAL_BUILDING_DEMAND,
                LoadType::Heat,
                Unit::Watt,
            ))?,
        });
        Ok(())
    }

    fn predefined_connections(&self) -> &'static [PredefinedConnection] {
        PREDEFINED
    }

    /// Publishes the envelope and set temperatures for controllers.
    fn prepare(&mut self, ctx: &mut PrepareContext<'_>) -> ComponentResult<()> {
        let c = &self.config;
        require_positive(c.thermal_capacity_j_k, "thermal capacity must be positive")?;
        require_positive(c.heat_loss_coefficient(), "heat loss coefficient must be positive")?;

        let registry = ctx.registry();
        registry.set_entry(
            RegistryKey::ThermalTransmissionCoefficientGlazing,
            c.h_transmission_glazing_w_k,
        );
        registry.set_entry(
            RegistryKey::ThermalTransmissionSurfaceIndoorAir,
            c.h_transmission_surface_indoor_air_w_k,
        );
        registry.set_entry(
            RegistryKey::ThermalTransmissionCoefficientOpaqueEm,
            c.h_transmission_opaque_em_w_k,
        );
        registry.set_entry(
            RegistryKey::ThermalTransmissionCoefficientOpaqueMs,
            c.h_transmission_opaque_ms_w_k,
        );
        registry.set_entry(
            RegistryKey::ThermalTransmissionCoefficientVentilation,
            c.h_ventilation_w_k,
        );
        registry.set_entry(RegistryKey::ThermalCapacityEnvelope, c.thermal_capacity_j_k);
        registry.set_entry(
            RegistryKey::SetHeatingTemperatureForBuilding,
            c.set_heating_temperature_c,
        );
        registry.set_entry(
            RegistryKey::SetCoolingTemperatureForBuilding,
            c.set_cooling_temperature_c,
        );
        Ok(())
    }

    fn evaluate(&mut self, ctx: &mut EvalContext<'_>) -> ComponentResult<()> {
        let ports = *declared(&self.ports, &self.config.name)?;
        let outside = ctx.input(ports.temperature_outside)?;
        let solar = ctx.input(ports.direct_normal_irradiance)? * self.config.solar_aperture_m2;
        let residents = ctx.input(ports.heating_by_residents)?;
        let delivered = ctx.input(ports.thermal_power_delivered)?;

        let start = self.temperature_c;
        let passive = solar + residents;
        let end = self.step_temperature(start, outside, passive + delivered, ctx.clock().dt_seconds());
        self.temperature_c = check_finite(end, "building temperature")?;

        ctx.set_output(ports.temperature_mean, start)?;
        ctx.set_output(
            ports.theoretical_demand,
            self.theoretical_demand(outside, passive),
        )?;
        Ok(())
    }

    fn save_state(&mut self) {
        self.saved_temperature_c = self.temperature_c;
    }

    fn restore_state(&mut self) {
        self.temperature_c = self.saved_temperature_c;
    }
}
