//! Position of a timestep on the simulated calendar.

/// Read-only view of simulated time handed to components.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StepClock {
    /// 0-based timestep index within the run.
    pub index: usize,
    pub seconds_per_timestep: u32,
    /// Seconds after midnight at which the run starts.
    pub start_second_of_day: u32,
    /// 0-based day of year on which the run starts.
    pub start_day_of_year: u32,
}

impl StepClock {
    pub fn new(seconds_per_timestep: u32) -> Self {
        Self {
            index: 0,
            seconds_per_timestep,
            start_second_of_day: 0,
            start_day_of_year: 0,
        }
    }

    pub fn at(self, index: usize) -> Self {
        Self { index, ..self }
    }

    pub fn dt_seconds(&self) -> f64 {
        f64::from(self.seconds_per_timestep)
    }

    pub fn elapsed_seconds(&self) -> u64 {
        self.index as u64 * u64::from(self.seconds_per_timestep)
    }

    fn absolute_seconds(&self) -> u64 {
        u64::from(self.start_second_of_day) + self.elapsed_seconds()
    }

    /// Fractional hour of day in `[0, 24)`.
    pub fn hour_of_day(&self) -> f64 {
        (self.absolute_seconds() % 86_400) as f64 / 3_600.0
    }

    /// 0-based day of year, wrapping after 365 days.
    pub fn day_of_year(&self) -> u32 {
        let days = self.absolute_seconds() / 86_400;
        ((u64::from(self.start_day_of_year) + days) % 365) as u32
    }
}
