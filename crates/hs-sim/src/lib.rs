//! Timestep execution for homesim systems.
//!
//! Provides:
//! - Simulation period and timestep parameters with calendar presets
//! - Scheduler evaluating components in dependency order with fixed-point
//!   iteration over cyclic couplings
//! - Run state machine, cooperative cancellation and progress callbacks
//! - Recorded per-output time series

pub mod cancel;
pub mod error;
pub mod params;
pub mod record;
pub mod scheduler;

// Re-exports for public API
pub use cancel::CancelToken;
pub use error::{SimError, SimResult};
pub use params::SimulationParameters;
pub use record::{OutputSeries, RunStatus, SimRecord};
pub use scheduler::{RunState, SchedulerOptions, SimProgress, Simulator};
