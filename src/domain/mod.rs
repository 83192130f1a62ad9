//! Domain models - core crowd-safety types
//!
//! This module contains the canonical data types used throughout the system:
//! - `OccupancySample` - one live reading of crowd density
//! - `FacilityPoint` - static reference points on the temple grounds
//! - `classify` - the single occupancy threshold ladder
//! - `EmergencyAlert` - SOS alert with a forward-only status lifecycle

pub mod alert;
pub mod classify;
pub mod types;

// Re-export commonly used types at module level
pub use alert::{AlertStatus, EmergencyAlert, TransitionError};
pub use classify::{classify, prescriptive, Classification, ComfortLevel, Severity};
pub use types::{AlertId, FacilityPoint, LocationId, OccupancySample};
