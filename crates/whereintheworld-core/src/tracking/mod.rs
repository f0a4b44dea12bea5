//! The location tracking loop: a pure state machine plus the actor that
//! drives it.

mod engine;
mod state;

pub use engine::{LocationTracker, TrackerHandle, TrackerOptions, TrackerSnapshot};
pub use state::{AcceptedCoordinate, Resolution, TrackingPhase, TrackingState};
