use std::sync::Arc;
use std::time::Duration;

use clap::Args;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use whereintheworld_core::status::LOADING_PLACEHOLDER;
use whereintheworld_core::{
    Config, Coordinate, Credentials, Event, LocationFeed, LocationTracker, ReverseGeocoder,
    SlackPresence, TrackerOptions,
};

/// How long to keep draining events after stdin closes.
const EOF_GRACE: Duration = Duration::from_secs(2);

#[derive(Args)]
pub struct RunArgs {
    /// Start tracking immediately instead of after the startup delay
    #[arg(long)]
    now: bool,
    /// Print events as JSON lines instead of labels
    #[arg(long)]
    json: bool,
}

pub async fn run(args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let credentials = Credentials::load();
    if config.needs_setup(&credentials) {
        eprintln!(
            "hint: no Slack key (or no Google key with Google geocoding selected); \
             see `whereintheworld auth set --help`"
        );
    }

    let timeout = config.tracking.request_timeout();
    let resolver = Arc::new(ReverseGeocoder::new(timeout)?);
    let slack = Arc::new(SlackPresence::new(timeout)?);
    let feed = LocationFeed::new();
    let options = TrackerOptions::from_config(&config.tracking);

    let handle = LocationTracker::spawn(
        config.snapshot(&credentials),
        resolver,
        slack,
        feed.clone(),
        options,
    );
    let mut events = handle.subscribe();

    if !args.json {
        println!("{LOADING_PLACEHOLDER}");
    }
    if args.now || !config.tracking.auto_start {
        handle.set_tracking_active(true).await?;
    } else {
        info!(
            delay_secs = config.tracking.startup_delay_secs,
            "tracking starts after the startup delay"
        );
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => match line? {
                Some(line) => match parse_coordinate(&line) {
                    Some(coordinate) => {
                        debug!(%coordinate, "coordinate from stdin");
                        feed.push(coordinate);
                    }
                    None if line.trim().is_empty() => {}
                    None => warn!(line = %line.trim(), "expected \"lat,lon\""),
                },
                None => break,
            },
            event = events.recv() => {
                if !report(event, args.json)? {
                    break;
                }
            }
        }
    }

    // Let in-flight lookups and publishes finish.
    while let Ok(event) = tokio::time::timeout(EOF_GRACE, events.recv()).await {
        if !report(event, args.json)? {
            break;
        }
    }

    handle.shutdown().await?;
    Ok(())
}

/// Returns `false` once the event stream has closed.
fn report(
    event: Result<Event, broadcast::error::RecvError>,
    json: bool,
) -> Result<bool, Box<dyn std::error::Error>> {
    let event = match event {
        Ok(event) => event,
        Err(broadcast::error::RecvError::Lagged(skipped)) => {
            warn!(skipped, "event output fell behind");
            return Ok(true);
        }
        Err(broadcast::error::RecvError::Closed) => return Ok(false),
    };

    if json {
        println!("{}", serde_json::to_string(&event)?);
        return Ok(true);
    }

    match event {
        Event::LabelChanged { label, .. } => println!("{label}"),
        Event::StatusPublished { status, .. } => {
            info!(text = %status.text, icon = %status.icon, "Slack status updated")
        }
        Event::StatusPublishFailed { message, .. } => warn!(%message, "Slack status not updated"),
        Event::LocationUnavailable { reason, .. } => warn!(%reason, "location unavailable"),
        Event::ResolveFailed { message, .. } => warn!(%message, "lookup failed"),
        Event::TrackingStateChanged { from, to, .. } => debug!(?from, ?to, "tracking state"),
        Event::TrackingToggled { active, .. } => info!(active, "tracking toggled"),
        Event::SettingsApplied { .. } => debug!("settings applied"),
    }
    Ok(true)
}

fn parse_coordinate(line: &str) -> Option<Coordinate> {
    let (lat, lon) = line.trim().split_once(',')?;
    let coordinate = Coordinate::new(lat.trim().parse().ok()?, lon.trim().parse().ok()?);
    coordinate.is_valid().then_some(coordinate)
}
