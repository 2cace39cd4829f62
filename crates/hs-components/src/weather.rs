//! Synthetic weather source.

use hs_core::{ComponentType, LoadType, PortId, Unit};
use hs_graph::{Component, ComponentResult, EvalContext, GraphResult, PortDeclarer, PortSpec, PrepareContext};
use hs_registry::RegistryKey;
use serde::{Deserialize, Serialize};

use crate::common::{daily_bump, declared};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherConfig {
    pub name: String,
    /// Written to the shared registry for downstream reporting.
    pub location: String,
    /// Annual mean outside temperature (°C)
    pub mean_temperature_c: f64,
    /// Half the summer/winter swing of the daily mean (K)
    pub annual_amplitude_k: f64,
    /// Half the day/night swing (K)
    pub daily_amplitude_k: f64,
    /// Clear-sky direct normal irradiance at solar noon in midsummer (W/m²)
    pub peak_irradiance_w_m2: f64,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            name: "Weather".into(),
            location: "Aachen".into(),
            mean_temperature_c: 10.0,
            annual_amplitude_k: 9.0,
            daily_amplitude_k: 4.0,
            peak_irradiance_w_m2: 850.0,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct WeatherPorts {
    temperature_outside: PortId,
    direct_normal_irradiance: PortId,
}

/// Outside temperature and irradiance as smooth functions of the calendar.
///
/// Coldest on 15 January and at 04:00, sunniest at solar noon in midsummer.
#[derive(Debug, Clone)]
pub struct Weather {
    config: WeatherConfig,
    ports: Option<WeatherPorts>,
}

impl Weather {
    pub const TEMPERATURE_OUTSIDE: &'static str = "TemperatureOutside";
    pub const DIRECT_NORMAL_IRRADIANCE: &'static str = "DirectNormalIrradiance";

    pub fn new(config: WeatherConfig) -> Self {
        Self {
            config,
            ports: None,
        }
    }

    /// Outside temperature at `day_of_year` and `hour`.
    pub fn temperature(&self, day_of_year: u32, hour: f64) -> f64 {
        use std::f64::consts::TAU;
        let c = &self.config;
        let seasonal = -(TAU * (f64::from(day_of_year) - 14.0) / 365.0).cos();
        let daily = -(TAU * (hour - 4.0) / 24.0).cos();
        c.mean_temperature_c + c.annual_amplitude_k * seasonal + c.daily_amplitude_k * daily
    }

    /// Direct normal irradiance at `day_of_year` and `hour`.
    pub fn irradiance(&self, day_of_year: u32, hour: f64) -> f64 {
        use std::f64::consts::TAU;
        // Day length between 8 h (winter) and 16 h (summer)
        let season = 0.5 * (1.0 - (TAU * (f64::from(day_of_year) + 10.0) / 365.0).cos());
        let half_day = 4.0 + 4.0 * season;
        let strength = 0.4 + 0.6 * season;
        self.config.peak_irradiance_w_m2 * strength * daily_bump(hour, 12.0, half_day)
    }
}

impl Component for Weather {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn kind(&self) -> ComponentType {
        ComponentType::Weather
    }

    fn declare_ports(&mut self, ports: &mut PortDeclarer<'_>) -> GraphResult<()> {
        self.ports = Some(WeatherPorts {
            temperature_outside: ports.output(
                PortSpec::new(Self::TEMPERATURE_OUTSIDE, LoadType::Temperature, Unit::Celsius)
                    .describe("Outside air temperature"),
            )?,
            direct_normal_irradiance: ports.output(
                PortSpec::new(
                    Self::DIRECT_NORMAL_IRRADIANCE,
                    LoadType::Irradiance,
                    Unit::WattPerSquareMeter,
                )
                .describe("Direct normal irradiance"),
            )?,
        });
        Ok(())
    }

    fn prepare(&mut self, ctx: &mut PrepareContext<'_>) -> ComponentResult<()> {
        ctx.registry()
            .set_entry(RegistryKey::Location, self.config.location.clone());
        Ok(())
    }

    fn evaluate(&mut self, ctx: &mut EvalContext<'_>) -> ComponentResult<()> {
        let ports = *declared(&self.ports, &self.config.name)?;
        let clock = ctx.clock();
        let (day, hour) = (clock.day_of_year(), clock.hour_of_day());
        ctx.set_output(ports.temperature_outside, self.temperature(day, hour))?;
        ctx.set_output(ports.direct_normal_irradiance, self.irradiance(day, hour))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn winter_nights_are_colder_than_summer_afternoons() {
        let weather = Weather::new(WeatherConfig::default());
        assert!(weather.temperature(14, 4.0) < weather.temperature(196, 15.0));
        assert!((weather.temperature(14, 4.0) - (10.0 - 9.0 - 4.0)).abs() < 1e-9);
    }

    #[test]
    fn no_sun_at_midnight() {
        let weather = Weather::new(WeatherConfig::default());
        assert_eq!(weather.irradiance(172, 0.0), 0.0);
        assert!(weather.irradiance(172, 12.0) > weather.irradiance(355, 12.0));
    }
}
