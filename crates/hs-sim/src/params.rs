//! Simulated period and timestep length.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Timelike};
use hs_core::StepClock;
use serde::{Deserialize, Serialize};

use crate::error::{SimError, SimResult};

/// Period to simulate.
///
/// The run covers `duration / seconds_per_timestep` timesteps (rounded
/// down) starting at `start_time`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationParameters {
    pub start_time: NaiveDateTime,
    #[serde(with = "duration_seconds")]
    pub duration: Duration,
    pub seconds_per_timestep: u32,
}

impl SimulationParameters {
    pub fn new(start_time: NaiveDateTime, duration: Duration, seconds_per_timestep: u32) -> Self {
        Self {
            start_time,
            duration,
            seconds_per_timestep,
        }
    }

    /// 1 January of `year`, one day.
    pub fn one_day_only(year: i32, seconds_per_timestep: u32) -> SimResult<Self> {
        Ok(Self::new(
            new_year(year)?,
            Duration::days(1),
            seconds_per_timestep,
        ))
    }

    /// 1 January of `year`, seven days.
    pub fn one_week_only(year: i32, seconds_per_timestep: u32) -> SimResult<Self> {
        Ok(Self::new(
            new_year(year)?,
            Duration::days(7),
            seconds_per_timestep,
        ))
    }

    /// The whole calendar year (366 days in leap years).
    pub fn full_year(year: i32, seconds_per_timestep: u32) -> SimResult<Self> {
        let start = new_year(year)?;
        let end = new_year(year + 1)?;
        Ok(Self::new(start, end - start, seconds_per_timestep))
    }

    pub fn validate(&self) -> SimResult<()> {
        if self.seconds_per_timestep == 0 {
            return Err(SimError::InvalidArg {
                what: "seconds_per_timestep must be positive",
            });
        }
        if self.duration < Duration::zero() {
            return Err(SimError::InvalidArg {
                what: "duration must be non-negative",
            });
        }
        if self.start_time.checked_add_signed(self.duration).is_none() {
            return Err(SimError::InvalidArg {
                what: "simulated period ends out of range",
            });
        }
        Ok(())
    }

    /// Number of whole timesteps in the period.
    pub fn timesteps(&self) -> usize {
        if self.seconds_per_timestep == 0 {
            return 0;
        }
        let secs = self.duration.num_seconds().max(0) as u64;
        (secs / u64::from(self.seconds_per_timestep)) as usize
    }

    /// Start time of timestep `index`.
    ///
    /// # Errors
    ///
    /// `InvalidArg` when the instant is not representable.
    pub fn timestamp(&self, index: usize) -> SimResult<NaiveDateTime> {
        i64::try_from(index)
            .ok()
            .and_then(|i| i.checked_mul(i64::from(self.seconds_per_timestep)))
            .and_then(Duration::try_seconds)
            .and_then(|offset| self.start_time.checked_add_signed(offset))
            .ok_or(SimError::InvalidArg {
                what: "timestamp out of range",
            })
    }

    /// Clock positioned at the first timestep.
    pub fn clock(&self) -> StepClock {
        StepClock {
            index: 0,
            seconds_per_timestep: self.seconds_per_timestep,
            start_second_of_day: self.start_time.num_seconds_from_midnight(),
            start_day_of_year: self.start_time.ordinal0(),
        }
    }
}

fn new_year(year: i32) -> SimResult<NaiveDateTime> {
    NaiveDate::from_ymd_opt(year, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .ok_or(SimError::InvalidArg {
            what: "year out of range",
        })
}

mod duration_seconds {
    use chrono::Duration;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_i64(d.num_seconds())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = i64::deserialize(d)?;
        Duration::try_seconds(secs)
            .ok_or_else(|| serde::de::Error::custom("duration out of range"))
    }
}
