//! Commuter car driving profile.

use hs_core::{ComponentType, LoadType, PortId, Unit};
use hs_graph::{
    Component, ComponentResult, EvalContext, GraphResult, PortDeclarer, PortSpec, PrepareContext,
};
use serde::{Deserialize, Serialize};

use crate::common::{SECONDS_PER_HOUR, declared, require_positive};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CarConfig {
    pub name: String,
    /// Hour of day the car leaves home
    pub departure_hour: f64,
    /// Hour of day the car is back home
    pub return_hour: f64,
    /// One-way commute distance (km)
    pub commute_km: f64,
    /// Duration of one commute leg (h)
    pub trip_hours: f64,
    pub consumption_wh_per_km: f64,
}

impl Default for CarConfig {
    fn default() -> Self {
        Self {
            name: "Car".into(),
            departure_hour: 7.5,
            return_hour: 17.5,
            commute_km: 25.0,
            trip_hours: 0.5,
            consumption_wh_per_km: 180.0,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct CarPorts {
    location: PortId,
    electricity: PortId,
    distance: PortId,
}

/// Leaves in the morning, drives to work, comes back in the evening.
#[derive(Debug, Clone)]
pub struct Car {
    config: CarConfig,
    ports: Option<CarPorts>,
}

impl Car {
    pub const CAR_LOCATION: &'static str = "CarLocation";
    pub const ELECTRICITY_OUTPUT: &'static str = "ElectricityOutput";
    pub const DRIVEN_DISTANCE: &'static str = "DrivenDistance";

    pub fn new(config: CarConfig) -> Self {
        Self {
            config,
            ports: None,
        }
    }

    pub fn config(&self) -> &CarConfig {
        &self.config
    }

    pub fn is_home(&self, hour: f64) -> bool {
        hour < self.config.departure_hour || hour >= self.config.return_hour
    }

    pub fn is_driving(&self, hour: f64) -> bool {
        let c = &self.config;
        let outbound = hour >= c.departure_hour && hour < c.departure_hour + c.trip_hours;
        let inbound = hour >= c.return_hour - c.trip_hours && hour < c.return_hour;
        outbound || inbound
    }

    /// Average speed while on a commute leg (km/h).
    fn speed_km_h(&self) -> f64 {
        self.config.commute_km / self.config.trip_hours
    }
}

impl Component for Car {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn kind(&self) -> ComponentType {
        ComponentType::Car
    }

    fn declare_ports(&mut self, ports: &mut PortDeclarer<'_>) -> GraphResult<()> {
        self.ports = Some(CarPorts {
            location: ports.output(
                PortSpec::new(Self::CAR_LOCATION, LoadType::Any, Unit::Binary)
                    .describe("1 while the car is parked at home"),
            )?,
            electricity: ports.output(
                PortSpec::new(Self::ELECTRICITY_OUTPUT, LoadType::Electricity, Unit::Watt)
                    .describe("Traction power drawn from the car battery"),
            )?,
            distance: ports.output(PortSpec::new(
                Self::DRIVEN_DISTANCE,
                LoadType::Distance,
                Unit::Meter,
            ))?,
        });
        Ok(())
    }

    fn prepare(&mut self, _ctx: &mut PrepareContext<'_>) -> ComponentResult<()> {
        require_positive(self.config.trip_hours, "trip duration must be positive")?;
        if self.config.return_hour <= self.config.departure_hour + self.config.trip_hours {
            return Err(hs_graph::ComponentError::InvalidArg {
                what: "car must return after the outbound trip",
            });
        }
        Ok(())
    }

    fn evaluate(&mut self, ctx: &mut EvalContext<'_>) -> ComponentResult<()> {
        let ports = *declared(&self.ports, &self.config.name)?;
        let clock = ctx.clock();
        let hour = clock.hour_of_day();

        let (power, distance_m) = if self.is_driving(hour) {
            let speed = self.speed_km_h();
            let hours = clock.dt_seconds() / SECONDS_PER_HOUR;
            (
                speed * self.config.consumption_wh_per_km,
                speed * hours * 1_000.0,
            )
        } else {
            (0.0, 0.0)
        };

        ctx.set_output(ports.location, if self.is_home(hour) { 1.0 } else { 0.0 })?;
        ctx.set_output(ports.electricity, power)?;
        ctx.set_output(ports.distance, distance_m)
    }
}
