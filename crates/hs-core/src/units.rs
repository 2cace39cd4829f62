// hs-core/src/units.rs

use core::fmt;

use uom::si::f64::{Energy as UomEnergy, Power as UomPower, Time as UomTime};

/// Physical quantity category carried by a port.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LoadType {
    Electricity,
    Heat,
    MassFlow,
    Temperature,
    Irradiance,
    Distance,
    /// Accepts any load type when declared on an input.
    Any,
}

/// Unit of the scalar value carried by a port.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Unit {
    Watt,
    WattHour,
    Celsius,
    KgPerSec,
    WattPerSquareMeter,
    Meter,
    Percent,
    Binary,
    /// Unit-agnostic when declared on an input.
    Any,
}

impl Unit {
    pub fn symbol(self) -> &'static str {
        match self {
            Unit::Watt => "W",
            Unit::WattHour => "Wh",
            Unit::Celsius => "°C",
            Unit::KgPerSec => "kg/s",
            Unit::WattPerSquareMeter => "W/m²",
            Unit::Meter => "m",
            Unit::Percent => "%",
            Unit::Binary => "-",
            Unit::Any => "any",
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl fmt::Display for LoadType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

// Canonical uom types used by component models (SI, f64)
pub type Energy = UomEnergy;
pub type Power = UomPower;
pub type Time = UomTime;

#[inline]
pub fn watts(v: f64) -> Power {
    use uom::si::power::watt;
    Power::new::<watt>(v)
}

#[inline]
pub fn watt_hours(v: f64) -> Energy {
    use uom::si::energy::watt_hour;
    Energy::new::<watt_hour>(v)
}

#[inline]
pub fn seconds(v: f64) -> Time {
    use uom::si::time::second;
    Time::new::<second>(v)
}

#[inline]
pub fn as_watt_hours(e: Energy) -> f64 {
    use uom::si::energy::watt_hour;
    e.get::<watt_hour>()
}

#[inline]
pub fn as_watts(p: Power) -> f64 {
    use uom::si::power::watt;
    p.get::<watt>()
}

#[inline]
pub fn as_joules(e: Energy) -> f64 {
    use uom::si::energy::joule;
    e.get::<joule>()
}
