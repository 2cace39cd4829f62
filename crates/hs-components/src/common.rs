//! Helpers shared by the reference components.

use hs_core::{StepClock, ensure_finite, units};
use hs_graph::{ComponentError, ComponentResult};

/// Seconds per hour.
pub const SECONDS_PER_HOUR: f64 = 3_600.0;

/// Port table of a component, available once ports were declared.
pub(crate) fn declared<'a, T>(ports: &'a Option<T>, component: &str) -> ComponentResult<&'a T> {
    ports.as_ref().ok_or_else(|| ComponentError::Undeclared {
        component: component.to_string(),
    })
}

/// Ensure a value is finite, returning ComponentError if not.
pub fn check_finite(value: f64, what: &'static str) -> ComponentResult<f64> {
    ensure_finite(value, what).map_err(|_| ComponentError::NonPhysical {
        what: what.to_string(),
    })
}

/// Reject non-positive configuration values.
pub(crate) fn require_positive(value: f64, what: &'static str) -> ComponentResult<()> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(ComponentError::InvalidArg { what })
    }
}

/// Energy in Wh moved by `power_w` over one timestep.
pub fn energy_wh(power_w: f64, clock: &StepClock) -> f64 {
    units::as_watt_hours(units::watts(power_w) * units::seconds(clock.dt_seconds()))
}

/// Constant power in W that moves `energy_wh` within one timestep.
pub fn power_w(energy_wh: f64, clock: &StepClock) -> f64 {
    units::as_watts(units::watt_hours(energy_wh) / units::seconds(clock.dt_seconds()))
}

/// Smooth daily bump centred on `peak_hour`, 1 at the peak and 0 beyond
/// `half_width` hours from it.
pub fn daily_bump(hour: f64, peak_hour: f64, half_width: f64) -> f64 {
    let mut d = (hour - peak_hour).abs();
    if d > 12.0 {
        d = 24.0 - d;
    }
    if d >= half_width {
        0.0
    } else {
        0.5 * (1.0 + (std::f64::consts::PI * d / half_width).cos())
    }
}
