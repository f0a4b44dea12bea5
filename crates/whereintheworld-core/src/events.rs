use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::location::LocationSource;
use crate::status::ComposedStatus;
use crate::tracking::TrackingPhase;

/// Every observable change in the tracking loop produces an Event.
/// The UI subscribes for labels; anything else may subscribe for diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    TrackingStateChanged {
        from: TrackingPhase,
        to: TrackingPhase,
        at: DateTime<Utc>,
    },
    TrackingToggled {
        active: bool,
        at: DateTime<Utc>,
    },
    /// Plain-text label for display.
    LabelChanged {
        label: String,
        source: LocationSource,
        at: DateTime<Utc>,
    },
    /// The selected geocoder cannot be used until settings change.
    LocationUnavailable {
        reason: String,
        at: DateTime<Utc>,
    },
    /// A transient geocoding failure; the previous label stays.
    ResolveFailed {
        message: String,
        at: DateTime<Utc>,
    },
    StatusPublished {
        status: ComposedStatus,
        at: DateTime<Utc>,
    },
    StatusPublishFailed {
        status: ComposedStatus,
        message: String,
        at: DateTime<Utc>,
    },
    SettingsApplied {
        at: DateTime<Utc>,
    },
}
