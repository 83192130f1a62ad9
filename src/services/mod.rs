//! Services - business logic and state management
//!
//! This module contains the core dashboard services:
//! - `poller` - Live occupancy polling with ordered last-write-wins store
//! - `alert_feed` - SOS alert collection and status lifecycle
//! - `canvas` - Geospatial canvas with differential marker overlays
//! - `dashboard` - Pilgrim and staff views composing the above

pub mod alert_feed;
pub mod canvas;
pub mod dashboard;
pub mod poller;

// Re-export commonly used types
pub use alert_feed::{start_alert_refresh, AlertFeed, AlertRefreshHandle, Transition};
pub use canvas::{facility_intensity, CrowdCanvas, InMemorySurface, MapRegistry, MapSurface};
pub use dashboard::{CrowdSummary, PilgrimView, StaffView};
pub use poller::{PollerHandle, SampleStore, TelemetryPoller};
