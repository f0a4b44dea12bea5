//! Tracking state machine.
//!
//! Pure and synchronous: the actor in [`super::engine`] owns one of these
//! and feeds it commands, coordinates and resolver results.
//!
//! ## State Transitions
//!
//! ```text
//! Stopped -> Starting -> Active -> Stopped
//!     any -> Reconfiguring -> previous
//! ```

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::events::Event;
use crate::geocoding::GeocodingConfig;
use crate::location::{match_known_location, Coordinate, ResolvedLocation};
use crate::settings::SettingsSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackingPhase {
    Stopped,
    /// Tracking switched on, no coordinate received yet.
    Starting,
    Active,
    /// Settings are being applied; always returns to the previous phase.
    Reconfiguring,
}

impl TrackingPhase {
    pub fn is_tracking(&self) -> bool {
        matches!(self, TrackingPhase::Starting | TrackingPhase::Active)
    }
}

/// A coordinate the state machine took in.
#[derive(Debug, Clone)]
pub struct AcceptedCoordinate {
    pub coordinate: Coordinate,
    /// Resolutions tagged with an older generation are stale.
    pub generation: u64,
    /// `Starting -> Active` on the first coordinate.
    pub transition: Option<Event>,
    /// Known-location hit; `None` means the coordinate needs geocoding.
    pub matched: Option<ResolvedLocation>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Applied { label_changed: bool },
    /// A newer coordinate or settings change superseded this result.
    Stale,
}

#[derive(Debug, Clone)]
pub struct TrackingState {
    phase: TrackingPhase,
    settings: Arc<SettingsSnapshot>,
    last_coordinate: Option<Coordinate>,
    last_resolved: Option<ResolvedLocation>,
    generation: u64,
}

impl TrackingState {
    pub fn new(settings: Arc<SettingsSnapshot>) -> Self {
        Self {
            phase: TrackingPhase::Stopped,
            settings,
            last_coordinate: None,
            last_resolved: None,
            generation: 0,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn phase(&self) -> TrackingPhase {
        self.phase
    }

    pub fn settings(&self) -> &SettingsSnapshot {
        &self.settings
    }

    pub fn geocoding(&self) -> GeocodingConfig {
        self.settings.geocoding()
    }

    pub fn last_coordinate(&self) -> Option<Coordinate> {
        self.last_coordinate
    }

    pub fn last_resolved(&self) -> Option<&ResolvedLocation> {
        self.last_resolved.as_ref()
    }

    pub fn is_current(&self, generation: u64) -> bool {
        generation == self.generation
    }

    // ── Commands ─────────────────────────────────────────────────────

    pub fn toggle_on(&mut self) -> Option<Event> {
        match self.phase {
            TrackingPhase::Stopped => Some(self.transition(TrackingPhase::Starting)),
            _ => None,
        }
    }

    /// Back to `Stopped`, forgetting the last coordinate and label so the
    /// next start waits for a fresh fix.
    pub fn toggle_off(&mut self) -> Option<Event> {
        match self.phase {
            TrackingPhase::Stopped => None,
            _ => {
                self.last_coordinate = None;
                self.last_resolved = None;
                self.generation += 1;
                Some(self.transition(TrackingPhase::Stopped))
            }
        }
    }

    /// Enter `Reconfiguring` and swap in the new settings. In-flight
    /// resolutions become stale. Returns the phase to go back to.
    pub fn begin_reconfigure(
        &mut self,
        settings: Arc<SettingsSnapshot>,
    ) -> (TrackingPhase, Option<Event>) {
        let previous = self.phase;
        self.settings = settings;
        self.generation += 1;
        let event = if previous == TrackingPhase::Reconfiguring {
            None
        } else {
            Some(self.transition(TrackingPhase::Reconfiguring))
        };
        (previous, event)
    }

    pub fn finish_reconfigure(&mut self, previous: TrackingPhase) -> Option<Event> {
        if self.phase != TrackingPhase::Reconfiguring || previous == TrackingPhase::Reconfiguring {
            return None;
        }
        Some(self.transition(previous))
    }

    /// Take in a coordinate while tracking. Ignored when stopped or when
    /// the coordinate is malformed.
    pub fn accept_coordinate(&mut self, coordinate: Coordinate) -> Option<AcceptedCoordinate> {
        if !self.phase.is_tracking() || !coordinate.is_valid() {
            return None;
        }

        let transition = if self.phase == TrackingPhase::Starting {
            Some(self.transition(TrackingPhase::Active))
        } else {
            None
        };

        self.generation += 1;
        self.last_coordinate = Some(coordinate);
        let matched = match_known_location(coordinate, &self.settings.known_locations)
            .map(ResolvedLocation::known);

        Some(AcceptedCoordinate {
            coordinate,
            generation: self.generation,
            transition,
            matched,
        })
    }

    /// Record a resolution unless it has been superseded.
    pub fn apply_resolution(&mut self, generation: u64, resolved: ResolvedLocation) -> Resolution {
        if !self.is_current(generation) || !self.phase.is_tracking() {
            return Resolution::Stale;
        }
        let label_changed = self
            .last_resolved
            .as_ref()
            .map_or(true, |prev| prev.label != resolved.label);
        self.last_resolved = Some(resolved);
        Resolution::Applied { label_changed }
    }

    fn transition(&mut self, to: TrackingPhase) -> Event {
        let from = self.phase;
        self.phase = to;
        Event::TrackingStateChanged {
            from,
            to,
            at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::{KnownLocation, LocationSource};

    fn state() -> TrackingState {
        TrackingState::new(Arc::new(SettingsSnapshot {
            known_locations: vec![KnownLocation::new("Office", 51.5, -0.12, 200.0)],
            ..Default::default()
        }))
    }

    fn phases(event: Option<Event>) -> Option<(TrackingPhase, TrackingPhase)> {
        match event? {
            Event::TrackingStateChanged { from, to, .. } => Some((from, to)),
            _ => None,
        }
    }

    #[test]
    fn starts_stopped() {
        assert_eq!(state().phase(), TrackingPhase::Stopped);
    }

    #[test]
    fn toggle_on_then_first_coordinate_activates() {
        let mut s = state();
        assert_eq!(
            phases(s.toggle_on()),
            Some((TrackingPhase::Stopped, TrackingPhase::Starting))
        );
        assert!(s.toggle_on().is_none());

        let accepted = s.accept_coordinate(Coordinate::new(51.5, -0.12)).unwrap();
        assert_eq!(
            phases(accepted.transition),
            Some((TrackingPhase::Starting, TrackingPhase::Active))
        );
        assert_eq!(accepted.matched.unwrap().label, "Office");

        let second = s.accept_coordinate(Coordinate::new(40.0, -3.7)).unwrap();
        assert!(second.transition.is_none());
        assert!(second.matched.is_none());
        assert!(second.generation > accepted.generation);
    }

    #[test]
    fn coordinates_ignored_while_stopped_or_invalid() {
        let mut s = state();
        assert!(s.accept_coordinate(Coordinate::new(51.5, -0.12)).is_none());
        s.toggle_on();
        assert!(s.accept_coordinate(Coordinate::new(f64::NAN, 0.0)).is_none());
        assert_eq!(s.phase(), TrackingPhase::Starting);
    }

    #[test]
    fn older_generation_is_stale() {
        let mut s = state();
        s.toggle_on();
        let first = s.accept_coordinate(Coordinate::new(10.0, 10.0)).unwrap();
        let second = s.accept_coordinate(Coordinate::new(11.0, 11.0)).unwrap();

        let r2 = ResolvedLocation::new("Second", LocationSource::GeocodedOsm);
        assert_eq!(
            s.apply_resolution(second.generation, r2),
            Resolution::Applied { label_changed: true }
        );
        let r1 = ResolvedLocation::new("First", LocationSource::GeocodedOsm);
        assert_eq!(s.apply_resolution(first.generation, r1), Resolution::Stale);
        assert_eq!(s.last_resolved().unwrap().label, "Second");
    }

    #[test]
    fn same_label_is_not_a_change() {
        let mut s = state();
        s.toggle_on();
        let a = s.accept_coordinate(Coordinate::new(10.0, 10.0)).unwrap();
        s.apply_resolution(a.generation, ResolvedLocation::new("Town", LocationSource::GeocodedGoogle));
        let b = s.accept_coordinate(Coordinate::new(10.001, 10.0)).unwrap();
        assert_eq!(
            s.apply_resolution(b.generation, ResolvedLocation::new("Town", LocationSource::GeocodedGoogle)),
            Resolution::Applied { label_changed: false }
        );
    }

    #[test]
    fn toggle_off_resets_to_stopped_and_forgets() {
        let mut s = state();
        s.toggle_on();
        let a = s.accept_coordinate(Coordinate::new(51.5, -0.12)).unwrap();
        s.apply_resolution(a.generation, a.matched.clone().unwrap());

        assert_eq!(
            phases(s.toggle_off()),
            Some((TrackingPhase::Active, TrackingPhase::Stopped))
        );
        assert!(s.last_resolved().is_none());
        assert!(s.last_coordinate().is_none());
        assert!(s.toggle_off().is_none());

        s.toggle_on();
        assert_eq!(s.phase(), TrackingPhase::Starting);
    }

    #[test]
    fn reconfigure_returns_to_previous_phase() {
        let mut s = state();
        s.toggle_on();
        let a = s.accept_coordinate(Coordinate::new(20.0, 20.0)).unwrap();

        let (previous, entered) = s.begin_reconfigure(Arc::new(SettingsSnapshot {
            use_open_street_map: true,
            ..Default::default()
        }));
        assert_eq!(previous, TrackingPhase::Active);
        assert_eq!(
            phases(entered),
            Some((TrackingPhase::Active, TrackingPhase::Reconfiguring))
        );
        assert!(s.geocoding().use_open_street_map);
        assert!(!s.is_current(a.generation));

        assert_eq!(
            phases(s.finish_reconfigure(previous)),
            Some((TrackingPhase::Reconfiguring, TrackingPhase::Active))
        );
    }

    #[test]
    fn reconfigure_while_stopped_stays_stopped() {
        let mut s = state();
        let (previous, _) = s.begin_reconfigure(Arc::new(SettingsSnapshot::default()));
        s.finish_reconfigure(previous);
        assert_eq!(s.phase(), TrackingPhase::Stopped);
    }
}
