//! hs-components: reference components for residential energy systems.
//!
//! Provides deliberately simple models to exercise the engine:
//! - Weather, occupancy and PV generation
//! - A lumped-capacity building heated by an air-source heat pump
//! - Electricity meter and an energy management system
//! - Home battery, cars, car batteries and wallbox controllers
//!
//! plus [`basic_household`] and [`household_with_ev_and_battery`], which
//! wire them into complete systems.
//!
//! # Example
//!
//! ```no_run
//! use hs_components::{HouseholdConfig, basic_household};
//! use hs_graph::{Assembly, AssemblyOptions};
//! use hs_registry::SharedRegistryHandle;
//! use hs_sim::{SchedulerOptions, SimulationParameters, Simulator};
//!
//! let mut asm = Assembly::new();
//! basic_household(&mut asm, &HouseholdConfig::default()).unwrap();
//! let mut sim = Simulator::from_assembly(
//!     asm,
//!     &AssemblyOptions::default(),
//!     SchedulerOptions::default(),
//!     SharedRegistryHandle::new(),
//! )
//! .unwrap();
//! let record = sim
//!     .run(&SimulationParameters::one_day_only(2021, 900).unwrap())
//!     .unwrap();
//! println!("{:?}", record.series("ElectricityMeter", "ElectricityToOrFromGrid"));
//! ```

pub mod battery;
pub mod building;
pub mod car;
pub mod car_battery;
pub mod common;
pub mod ems;
pub mod ev_charge;
pub mod heat_pump;
pub mod households;
pub mod meter;
pub mod occupancy;
pub mod pv;
pub mod weather;

// Re-exports
pub use battery::{Battery, BatteryConfig, StorageLimits};
pub use building::{Building, BuildingConfig};
pub use car::{Car, CarConfig};
pub use car_battery::{CarBattery, CarBatteryConfig};
pub use ems::{EmsConfig, EnergyManagementSystem};
pub use ev_charge::{EvChargeController, EvChargeControllerConfig};
pub use heat_pump::{HeatPump, HeatPumpConfig, HeatPumpController, HeatPumpControllerConfig};
pub use households::{
    BasicHousehold, EvHousehold, EvHouseholdConfig, HouseholdConfig, Vehicle, basic_household,
    household_with_ev_and_battery,
};
pub use meter::{ElectricityMeter, ElectricityMeterConfig};
pub use occupancy::{Occupancy, OccupancyConfig};
pub use pv::{PvSystem, PvSystemConfig};
pub use weather::{Weather, WeatherConfig};
