//! Recorded results of a run.

use chrono::NaiveDateTime;
use hs_core::{LoadType, Unit};
use serde::{Deserialize, Serialize};

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    Completed,
    /// Stopped by a [`CancelToken`](crate::CancelToken); only completed
    /// timesteps are recorded.
    Cancelled,
}

/// Stable values of one output port, one per completed timestep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputSeries {
    pub component: String,
    pub port: String,
    pub load_type: LoadType,
    pub unit: Unit,
    pub values: Vec<f64>,
}

/// Time series produced by a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimRecord {
    /// Start time of each completed timestep.
    pub timestamps: Vec<NaiveDateTime>,
    /// One series per output port, in component then declaration order.
    pub series: Vec<OutputSeries>,
    /// Fixed-point sweeps needed per timestep.
    pub iterations: Vec<usize>,
    pub status: RunStatus,
}

impl SimRecord {
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Values of `component.port`, if that output exists.
    pub fn series(&self, component: &str, port: &str) -> Option<&[f64]> {
        self.series
            .iter()
            .find(|s| s.component == component && s.port == port)
            .map(|s| s.values.as_slice())
    }

    pub fn max_iterations(&self) -> usize {
        self.iterations.iter().copied().max().unwrap_or(0)
    }
}
