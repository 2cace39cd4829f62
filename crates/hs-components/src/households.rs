//! Ready-made households wiring the reference components together.

use hs_core::{CompId, ComponentType, FlowRole, LoadType, SourceWeight, Tag, Unit};
use hs_graph::{Assembly, DynamicInputSpec, DynamicOutputSpec, GraphResult};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::battery::{Battery, BatteryConfig};
use crate::building::{Building, BuildingConfig};
use crate::car::{Car, CarConfig};
use crate::car_battery::{CarBattery, CarBatteryConfig};
use crate::ems::{EmsConfig, EnergyManagementSystem};
use crate::ev_charge::{EvChargeController, EvChargeControllerConfig};
use crate::heat_pump::{HeatPump, HeatPumpConfig, HeatPumpController, HeatPumpControllerConfig};
use crate::meter::{ElectricityMeter, ElectricityMeterConfig};
use crate::occupancy::{Occupancy, OccupancyConfig};
use crate::pv::{PvSystem, PvSystemConfig};
use crate::weather::{Weather, WeatherConfig};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct HouseholdConfig {
    pub weather: WeatherConfig,
    pub occupancy: OccupancyConfig,
    pub pv: PvSystemConfig,
    pub building: BuildingConfig,
    pub heat_pump_controller: HeatPumpControllerConfig,
    pub heat_pump: HeatPumpConfig,
    pub meter: ElectricityMeterConfig,
}

/// Household with electric mobility and a home battery. Per-vehicle
/// configs are templates; names get an index suffix and car batteries
/// get weights `1..=n`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EvHouseholdConfig {
    pub base: HouseholdConfig,
    pub ems: EmsConfig,
    pub battery: BatteryConfig,
    pub car: CarConfig,
    pub car_battery: CarBatteryConfig,
    pub charge_controller: EvChargeControllerConfig,
}

/// Components of [`basic_household`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BasicHousehold {
    pub weather: CompId,
    pub occupancy: CompId,
    pub pv: CompId,
    pub building: CompId,
    pub heat_pump_controller: CompId,
    pub heat_pump: CompId,
    pub meter: CompId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Vehicle {
    pub car: CompId,
    pub car_battery: CompId,
    pub charge_controller: CompId,
    pub weight: SourceWeight,
}

/// Components of [`household_with_ev_and_battery`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvHousehold {
    pub base: BasicHousehold,
    pub ems: CompId,
    pub battery: CompId,
    pub vehicles: Vec<Vehicle>,
}

/// Weather, occupancy, PV and the heat-pump-heated building. The meter is
/// added but not yet fed.
fn thermal_core(asm: &mut Assembly, config: &HouseholdConfig) -> GraphResult<BasicHousehold> {
    let weather = asm.add_component(Weather::new(config.weather.clone()))?;
    let occupancy = asm.add_component(Occupancy::new(config.occupancy.clone()))?;
    let pv = asm.add_component(PvSystem::new(config.pv.clone()))?;
    let building = asm.add_component(Building::new(config.building.clone()))?;
    let heat_pump_controller =
        asm.add_component(HeatPumpController::new(config.heat_pump_controller.clone()))?;
    let heat_pump = asm.add_component(HeatPump::new(config.heat_pump.clone()))?;
    let meter = asm.add_component(ElectricityMeter::new(config.meter.clone()))?;

    asm.connect_predefined(pv, &[weather])?;
    asm.connect_predefined(building, &[weather, occupancy])?;
    asm.connect_predefined(heat_pump_controller, &[building, weather])?;
    asm.connect_predefined(heat_pump, &[heat_pump_controller, weather])?;
    asm.connect(
        building,
        Building::THERMAL_POWER_DELIVERED,
        heat_pump,
        HeatPump::THERMAL_POWER_DELIVERED,
    )?;

    Ok(BasicHousehold {
        weather,
        occupancy,
        pv,
        building,
        heat_pump_controller,
        heat_pump,
        meter,
    })
}

fn flow(role: FlowRole, weight: SourceWeight) -> DynamicInputSpec {
    DynamicInputSpec::new(LoadType::Electricity, Unit::Watt, weight).with_tags([role])
}

/// Feed PV production and the uncontrolled loads into `aggregator`.
fn connect_house_flows(
    asm: &mut Assembly,
    aggregator: CompId,
    house: &BasicHousehold,
    pv_weight: SourceWeight,
) -> GraphResult<()> {
    asm.add_dynamic_input_and_connect(
        aggregator,
        house.pv,
        PvSystem::ELECTRICITY_OUTPUT,
        flow(FlowRole::ElectricityProduction, pv_weight),
    )?;
    asm.add_dynamic_input_and_connect(
        aggregator,
        house.occupancy,
        Occupancy::ELECTRICITY_OUTPUT,
        flow(FlowRole::ElectricityConsumptionUncontrolled, SourceWeight::DEFAULT),
    )?;
    asm.add_dynamic_input_and_connect(
        aggregator,
        house.heat_pump,
        HeatPump::ELECTRICAL_INPUT_POWER,
        flow(FlowRole::ElectricityConsumptionUncontrolled, SourceWeight::DEFAULT),
    )?;
    Ok(())
}

/// PV, occupancy and a heat-pump-heated building metered at the grid
/// connection.
///
/// # Errors
/// Returns the first assembly error, e.g. `DuplicateComponent` when
/// `asm` already holds a component with one of the configured names.
pub fn basic_household(asm: &mut Assembly, config: &HouseholdConfig) -> GraphResult<BasicHousehold> {
    let house = thermal_core(asm, config)?;
    connect_house_flows(asm, house.meter, &house, config.pv.source_weight.into())?;
    debug!(components = asm.len(), "basic household assembled");
    Ok(house)
}

/// [`basic_household`] plus `vehicles` electric cars and a home battery
/// behind an energy management system.
///
/// Surplus is offered to the cars first, in order, then to the battery.
/// The meter sees the balance the energy management leaves.
///
/// # Arguments
/// * `asm` - Assembly the components are added to
/// * `config` - Templates for the shared and per-vehicle components
/// * `vehicles` - Number of cars; zero leaves only the battery behind the
///   energy management
///
/// # Errors
/// Returns the first assembly error. Components added before it stay in
/// `asm`, so a failed call should be followed by a fresh assembly.
pub fn household_with_ev_and_battery(
    asm: &mut Assembly,
    config: &EvHouseholdConfig,
    vehicles: usize,
) -> GraphResult<EvHousehold> {
    let base = thermal_core(asm, &config.base)?;
    let ems = asm.add_component(EnergyManagementSystem::new(config.ems.clone()))?;
    connect_house_flows(asm, ems, &base, config.base.pv.source_weight.into())?;

    let mut fleet = Vec::with_capacity(vehicles);
    for index in 1..=vehicles {
        let weight = SourceWeight(index as u32);
        let car = asm.add_component(Car::new(CarConfig {
            name: format!("{}_{index}", config.car.name),
            ..config.car.clone()
        }))?;
        let car_battery = asm.add_component(CarBattery::new(CarBatteryConfig {
            name: format!("{}_{index}", config.car_battery.name),
            source_weight: weight.value(),
            ..config.car_battery.clone()
        }))?;
        let charge_controller = asm.add_component(EvChargeController::new(
            EvChargeControllerConfig {
                name: format!("{}_{index}", config.charge_controller.name),
                ..config.charge_controller.clone()
            },
        ))?;

        asm.connect_predefined(car_battery, &[charge_controller, car])?;
        asm.connect_predefined(charge_controller, &[car, car_battery])?;

        let slot = asm.add_dynamic_output_and_register(
            ems,
            DynamicOutputSpec::new(LoadType::Electricity, Unit::Watt, weight)
                .with_tags([
                    Tag::from(ComponentType::CarBattery),
                    Tag::from(FlowRole::ElectricityTarget),
                ])
                .describe("Surplus offered to the wallbox"),
        )?;
        asm.register_dynamic_input_source(
            charge_controller,
            EvChargeController::ELECTRICITY_TARGET,
            &slot,
        )?;
        asm.add_dynamic_input_and_connect(
            ems,
            charge_controller,
            EvChargeController::BATTERY_CHARGING_POWER_TO_EMS,
            DynamicInputSpec::new(LoadType::Electricity, Unit::Watt, weight).with_tags([
                Tag::from(ComponentType::CarBattery),
                Tag::from(FlowRole::ElectricityReal),
            ]),
        )?;

        fleet.push(Vehicle {
            car,
            car_battery,
            charge_controller,
            weight,
        });
    }

    let battery_weight = SourceWeight(vehicles as u32 + 1);
    let battery = asm.add_component(Battery::new(BatteryConfig {
        source_weight: battery_weight.value(),
        ..config.battery.clone()
    }))?;
    let slot = asm.add_dynamic_output_and_register(
        ems,
        DynamicOutputSpec::new(LoadType::Electricity, Unit::Watt, battery_weight)
            .with_tags([
                Tag::from(ComponentType::Battery),
                Tag::from(FlowRole::ElectricityTarget),
            ])
            .describe("Charge or discharge request for the home battery"),
    )?;
    asm.register_dynamic_input_source(battery, Battery::LOADING_POWER_INPUT, &slot)?;
    asm.add_dynamic_input_and_connect(
        ems,
        battery,
        Battery::AC_BATTERY_POWER,
        DynamicInputSpec::new(LoadType::Electricity, Unit::Watt, battery_weight).with_tags([
            Tag::from(ComponentType::Battery),
            Tag::from(FlowRole::ElectricityReal),
        ]),
    )?;

    asm.add_dynamic_input_and_connect(
        base.meter,
        ems,
        EnergyManagementSystem::ELECTRICITY_TO_OR_FROM_GRID,
        flow(FlowRole::ElectricityProduction, SourceWeight::DEFAULT),
    )?;

    debug!(
        components = asm.len(),
        vehicles,
        "household with electric mobility assembled"
    );
    Ok(EvHousehold {
        base,
        ems,
        battery,
        vehicles: fleet,
    })
}
