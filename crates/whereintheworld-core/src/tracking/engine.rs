//! Location tracking loop.
//!
//! One tokio task owns the [`TrackingState`]. Commands from the UI,
//! coordinates from the [`LocationFeed`], and completions of spawned
//! geocoding / publish calls all pass through a single `select!` loop, so
//! nothing else ever mutates tracking state.
//!
//! ## Usage
//!
//! ```ignore
//! let handle = LocationTracker::spawn(snapshot, resolver, slack, feed.clone(), options);
//! let mut events = handle.subscribe();
//! handle.set_tracking_active(true).await?;
//! feed.push(Coordinate::new(51.5, -0.12));
//! ```

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::AbortHandle;
use tokio::time::Instant;
use tracing::{debug, info, trace, warn};

use super::state::{Resolution, TrackingPhase, TrackingState};
use crate::error::{CoreError, PublishError, ResolveError};
use crate::events::Event;
use crate::geocoding::{GeoResolver, GeocodingConfig};
use crate::integrations::{PresencePublisher, PresenceService};
use crate::location::{Coordinate, LocationFeed, LocationSource, ResolvedLocation};
use crate::settings::SettingsSnapshot;
use crate::status::{
    compose, prune_expired, push_manual, ComposedStatus, ManualStatus, StatusContribution,
    UNAVAILABLE_PLACEHOLDER, WAITING_PLACEHOLDER,
};
use crate::storage::TrackingConfig;

/// Tuning for a spawned tracker.
#[derive(Debug, Clone)]
pub struct TrackerOptions {
    /// Enter `Starting` on its own once `startup_delay` has passed.
    pub auto_start: bool,
    pub startup_delay: Duration,
    pub command_capacity: usize,
    pub event_capacity: usize,
}

impl Default for TrackerOptions {
    fn default() -> Self {
        Self::from_config(&TrackingConfig::default())
    }
}

impl TrackerOptions {
    pub fn from_config(config: &TrackingConfig) -> Self {
        Self {
            auto_start: config.auto_start,
            startup_delay: config.startup_delay(),
            command_capacity: 32,
            event_capacity: 64,
        }
    }
}

/// Point-in-time view of the tracker, for display and tests.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackerSnapshot {
    pub phase: TrackingPhase,
    pub last_resolved: Option<ResolvedLocation>,
    pub last_published: Option<ComposedStatus>,
    pub active_manual_status: Option<StatusContribution>,
    pub has_presence_credentials: bool,
    pub startup_pending: bool,
}

enum Command {
    SetTrackingActive(bool),
    SettingsChanged(SettingsSnapshot),
    SetManualStatus(StatusContribution),
    ClearManualStatus,
    Snapshot(oneshot::Sender<TrackerSnapshot>),
    Shutdown(oneshot::Sender<()>),
}

enum Completion {
    Resolved {
        generation: u64,
        result: Result<ResolvedLocation, ResolveError>,
    },
    Published {
        epoch: u64,
        status: ComposedStatus,
        result: Result<(), PublishError>,
    },
}

/// Cloneable inbound API of a running tracker.
#[derive(Clone)]
pub struct TrackerHandle {
    commands: mpsc::Sender<Command>,
    events: broadcast::Sender<Event>,
}

impl TrackerHandle {
    pub async fn set_tracking_active(&self, active: bool) -> Result<(), CoreError> {
        self.send(Command::SetTrackingActive(active)).await
    }

    pub async fn on_settings_changed(&self, snapshot: SettingsSnapshot) -> Result<(), CoreError> {
        self.send(Command::SettingsChanged(snapshot)).await
    }

    pub async fn set_manual_status(&self, status: StatusContribution) -> Result<(), CoreError> {
        self.send(Command::SetManualStatus(status)).await
    }

    pub async fn clear_manual_status(&self) -> Result<(), CoreError> {
        self.send(Command::ClearManualStatus).await
    }

    /// Also acts as a barrier: every command sent before it has been handled.
    pub async fn snapshot(&self) -> Result<TrackerSnapshot, CoreError> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Snapshot(tx)).await?;
        rx.await.map_err(|_| CoreError::TrackerClosed)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    /// Stop the loop and wait for it to acknowledge.
    pub async fn shutdown(&self) -> Result<(), CoreError> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Shutdown(tx)).await?;
        rx.await.map_err(|_| CoreError::TrackerClosed)
    }

    async fn send(&self, command: Command) -> Result<(), CoreError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| CoreError::TrackerClosed)
    }
}

pub struct LocationTracker<R, S> {
    state: TrackingState,
    resolver: Arc<R>,
    publisher: PresencePublisher<S>,
    feed: LocationFeed,
    subscription: Option<broadcast::Receiver<Coordinate>>,
    manual: Vec<ManualStatus>,
    events: broadcast::Sender<Event>,
    commands: mpsc::Receiver<Command>,
    completions_tx: mpsc::UnboundedSender<Completion>,
    completions_rx: mpsc::UnboundedReceiver<Completion>,
    resolve_in_flight: Option<AbortHandle>,
    publish_in_flight: bool,
    pending_publish: Option<ComposedStatus>,
    publish_epoch: u64,
    startup_deadline: Option<Instant>,
}

impl<R, S> LocationTracker<R, S>
where
    R: GeoResolver + 'static,
    S: PresenceService + 'static,
{
    /// Spawn the loop on the current tokio runtime.
    pub fn spawn(
        settings: SettingsSnapshot,
        resolver: Arc<R>,
        presence: Arc<S>,
        feed: LocationFeed,
        options: TrackerOptions,
    ) -> TrackerHandle {
        let (commands_tx, commands) = mpsc::channel(options.command_capacity.max(1));
        let (events, _) = broadcast::channel(options.event_capacity.max(1));
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();

        let publisher = PresencePublisher::new(presence, settings.slack_api_key.clone());
        let startup_deadline = if options.auto_start {
            let deadline = Instant::now().checked_add(options.startup_delay);
            if deadline.is_none() {
                warn!(
                    delay = ?options.startup_delay,
                    "startup delay out of range, waiting for an explicit start"
                );
            }
            deadline
        } else {
            None
        };

        let tracker = Self {
            state: TrackingState::new(Arc::new(settings)),
            resolver,
            publisher,
            feed,
            subscription: None,
            manual: Vec::new(),
            events: events.clone(),
            commands,
            completions_tx,
            completions_rx,
            resolve_in_flight: None,
            publish_in_flight: false,
            pending_publish: None,
            publish_epoch: 0,
            startup_deadline,
        };
        tokio::spawn(tracker.run());

        TrackerHandle {
            commands: commands_tx,
            events,
        }
    }

    async fn run(mut self) {
        debug!(startup_pending = self.startup_deadline.is_some(), "tracking loop started");
        loop {
            tokio::select! {
                biased;
                command = self.commands.recv() => match command {
                    Some(Command::Shutdown(ack)) => {
                        self.commands.close();
                        self.abort_resolve();
                        let _ = ack.send(());
                        break;
                    }
                    Some(command) => self.handle_command(command),
                    None => break,
                },
                Some(done) = self.completions_rx.recv() => self.handle_completion(done),
                _ = sleep_until(self.startup_deadline), if self.startup_deadline.is_some() => {
                    self.startup_deadline = None;
                    info!("startup delay elapsed, starting location tracking");
                    self.start_tracking();
                }
                coordinate = next_coordinate(&mut self.subscription) => match coordinate {
                    Some(coordinate) => self.handle_coordinate(coordinate),
                    None => {
                        warn!("location feed closed");
                        self.subscription = None;
                    }
                },
            }
        }
        debug!("tracking loop stopped");
    }

    // ── Commands ─────────────────────────────────────────────────────

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::SetTrackingActive(true) => {
                self.startup_deadline = None;
                self.start_tracking();
            }
            Command::SetTrackingActive(false) => {
                self.startup_deadline = None;
                self.stop_tracking();
            }
            Command::SettingsChanged(snapshot) => self.reconfigure(snapshot),
            Command::SetManualStatus(contribution) => {
                debug!(text = %contribution.text, "manual status set");
                push_manual(&mut self.manual, ManualStatus::activate(contribution, Utc::now()));
                self.publish_current();
            }
            Command::ClearManualStatus => {
                self.manual.clear();
                if self.state.last_resolved().is_none() {
                    self.request_publish(ComposedStatus::cleared());
                } else {
                    self.publish_current();
                }
            }
            Command::Snapshot(reply) => {
                let _ = reply.send(self.snapshot());
            }
            Command::Shutdown(_) => {}
        }
    }

    fn start_tracking(&mut self) {
        let Some(event) = self.state.toggle_on() else {
            return;
        };
        self.subscription = Some(self.feed.subscribe());
        self.emit(Event::TrackingToggled {
            active: true,
            at: Utc::now(),
        });
        self.emit(event);
        self.emit(Event::LabelChanged {
            label: WAITING_PLACEHOLDER.to_string(),
            source: LocationSource::Unknown,
            at: Utc::now(),
        });
    }

    fn stop_tracking(&mut self) {
        let Some(event) = self.state.toggle_off() else {
            return;
        };
        self.subscription = None;
        self.abort_resolve();
        // A status queued behind an in-flight publish belongs to the old run.
        self.pending_publish = None;
        self.emit(Event::TrackingToggled {
            active: false,
            at: Utc::now(),
        });
        self.emit(event);
    }

    fn reconfigure(&mut self, snapshot: SettingsSnapshot) {
        let slack_key = snapshot.slack_api_key.clone();
        let (previous, entered) = self.state.begin_reconfigure(Arc::new(snapshot));
        if let Some(event) = entered {
            self.emit(event);
        }

        self.abort_resolve();
        if self.publisher.set_api_key(slack_key) {
            self.publish_epoch += 1;
        }

        if let Some(event) = self.state.finish_reconfigure(previous) {
            self.emit(event);
        }
        self.emit(Event::SettingsApplied { at: Utc::now() });
        info!(phase = ?self.state.phase(), "settings applied");

        match self.state.last_coordinate() {
            Some(coordinate) if self.state.phase().is_tracking() => {
                self.handle_coordinate(coordinate)
            }
            _ => self.publish_current(),
        }
    }

    // ── Location pipeline ────────────────────────────────────────────

    fn handle_coordinate(&mut self, coordinate: Coordinate) {
        let Some(accepted) = self.state.accept_coordinate(coordinate) else {
            if !coordinate.is_valid() {
                warn!(%coordinate, "ignoring malformed coordinate");
            }
            return;
        };
        if let Some(event) = accepted.transition {
            self.emit(event);
        }
        self.abort_resolve();

        match accepted.matched {
            Some(known) => {
                debug!(%coordinate, label = %known.label, "known location matched");
                self.apply_resolution(accepted.generation, known);
            }
            None => {
                let config = self.state.geocoding();
                self.spawn_resolve(accepted.generation, coordinate, config);
            }
        }
    }

    fn spawn_resolve(&mut self, generation: u64, coordinate: Coordinate, config: GeocodingConfig) {
        let resolver = Arc::clone(&self.resolver);
        let completions = self.completions_tx.clone();
        let task = tokio::spawn(async move {
            let result = resolver.resolve(coordinate, &config).await;
            let _ = completions.send(Completion::Resolved { generation, result });
        });
        self.resolve_in_flight = Some(task.abort_handle());
    }

    fn abort_resolve(&mut self) {
        if let Some(task) = self.resolve_in_flight.take() {
            task.abort();
        }
    }

    fn handle_completion(&mut self, completion: Completion) {
        match completion {
            Completion::Resolved { generation, result } => {
                if !self.state.is_current(generation) {
                    trace!(generation, "dropping superseded resolution");
                    return;
                }
                self.resolve_in_flight = None;
                match result {
                    Ok(resolved) => self.apply_resolution(generation, resolved),
                    Err(err) => self.resolve_failed(err),
                }
            }
            Completion::Published {
                epoch,
                status,
                result,
            } => {
                self.publish_in_flight = false;
                if epoch != self.publish_epoch {
                    trace!(epoch, "dropping publish result from previous credentials");
                } else {
                    match result {
                        Ok(()) => {
                            self.publisher.record_success(status.clone());
                            self.emit(Event::StatusPublished {
                                status,
                                at: Utc::now(),
                            });
                        }
                        Err(err) => self.publish_failed(status, err),
                    }
                }
                if let Some(next) = self.pending_publish.take() {
                    self.request_publish(next);
                }
            }
        }
    }

    fn apply_resolution(&mut self, generation: u64, resolved: ResolvedLocation) {
        let label = resolved.label.clone();
        let source = resolved.source;
        match self.state.apply_resolution(generation, resolved) {
            Resolution::Stale => trace!(generation, "dropping superseded resolution"),
            Resolution::Applied { label_changed } => {
                if label_changed {
                    info!(%label, ?source, "location changed");
                    self.emit(Event::LabelChanged {
                        label,
                        source,
                        at: Utc::now(),
                    });
                }
                self.publish_current();
            }
        }
    }

    fn resolve_failed(&mut self, err: ResolveError) {
        warn!(error = %err, "could not resolve location");
        match err {
            ResolveError::MissingCredential { .. } => {
                self.emit(Event::LocationUnavailable {
                    reason: err.to_string(),
                    at: Utc::now(),
                });
                if self.state.last_resolved().is_none() {
                    self.emit(Event::LabelChanged {
                        label: UNAVAILABLE_PLACEHOLDER.to_string(),
                        source: LocationSource::Unknown,
                        at: Utc::now(),
                    });
                }
            }
            _ => self.emit(Event::ResolveFailed {
                message: err.to_string(),
                at: Utc::now(),
            }),
        }
        self.publish_current();
    }

    // ── Publishing ───────────────────────────────────────────────────

    /// Compose from current state and publish if there is anything to say.
    fn publish_current(&mut self) {
        let now = Utc::now();
        prune_expired(&mut self.manual, now);
        let label = self.state.last_resolved().map(|r| r.label.as_str());
        if label.is_none() && self.manual.is_empty() {
            return;
        }
        let permanent = self.state.settings().permanent_contributions();
        let status = compose(label, &permanent, &self.manual, now);
        self.request_publish(status);
    }

    /// At most one publish runs at a time; newer statuses wait as a single
    /// pending value.
    fn request_publish(&mut self, status: ComposedStatus) {
        if self.publish_in_flight {
            self.pending_publish = Some(status);
            return;
        }
        match self.publisher.prepare(&status) {
            Ok(None) => trace!(text = %status.text, "status unchanged"),
            Ok(Some(job)) => {
                self.publish_in_flight = true;
                let epoch = self.publish_epoch;
                let completions = self.completions_tx.clone();
                tokio::spawn(async move {
                    let (status, result) = job.run().await;
                    let _ = completions.send(Completion::Published {
                        epoch,
                        status,
                        result,
                    });
                });
            }
            Err(err) => self.publish_failed(status, err),
        }
    }

    fn publish_failed(&mut self, status: ComposedStatus, err: PublishError) {
        warn!(error = %err, text = %status.text, "status not published");
        self.emit(Event::StatusPublishFailed {
            status,
            message: err.to_string(),
            at: Utc::now(),
        });
    }

    // ── Helpers ──────────────────────────────────────────────────────

    fn snapshot(&self) -> TrackerSnapshot {
        let now = Utc::now();
        TrackerSnapshot {
            phase: self.state.phase(),
            last_resolved: self.state.last_resolved().cloned(),
            last_published: self.publisher.last_published().cloned(),
            active_manual_status: self
                .manual
                .iter()
                .rev()
                .find(|m| !m.is_expired(now))
                .map(|m| m.contribution.clone()),
            has_presence_credentials: self.publisher.has_credentials(),
            startup_pending: self.startup_deadline.is_some(),
        }
    }

    fn emit(&self, event: Event) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

async fn next_coordinate(
    subscription: &mut Option<broadcast::Receiver<Coordinate>>,
) -> Option<Coordinate> {
    let Some(rx) = subscription.as_mut() else {
        return std::future::pending().await;
    };
    loop {
        match rx.recv().await {
            Ok(coordinate) => return Some(coordinate),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                debug!(skipped, "location feed lagged, skipping to newest");
            }
            Err(broadcast::error::RecvError::Closed) => return None,
        }
    }
}
