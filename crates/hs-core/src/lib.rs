//! hs-core: stable foundation for homesim.
//!
//! Contains:
//! - ids (arena handles and source weights)
//! - numeric (Real + tolerances + float helpers)
//! - units (load types, port units, uom constructors)
//! - tags (component types and flow roles used for classification)
//! - clock (simulated calendar position of a timestep)
//! - error (shared error types)

pub mod clock;
pub mod error;
pub mod ids;
pub mod numeric;
pub mod tags;
pub mod units;

// Re-exports: nice ergonomics for downstream crates
pub use clock::StepClock;
pub use error::{HsError, HsResult};
pub use ids::*;
pub use numeric::*;
pub use tags::*;
pub use units::{LoadType, Unit};
