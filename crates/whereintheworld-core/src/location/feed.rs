use tokio::sync::broadcast;

use super::Coordinate;

/// Push-based stream of coordinates from whatever supplies locations
/// (OS location service, stdin, tests).
///
/// Cloning shares the same stream. Slow subscribers lag and skip ahead to
/// the newest coordinates instead of blocking the source.
#[derive(Debug, Clone)]
pub struct LocationFeed {
    tx: broadcast::Sender<Coordinate>,
}

impl LocationFeed {
    pub fn new() -> Self {
        Self::with_capacity(16)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Push a coordinate. Returns how many subscribers will see it; 0 means
    /// nobody is tracking and the coordinate is dropped.
    pub fn push(&self, coordinate: Coordinate) -> usize {
        self.tx.send(coordinate).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Coordinate> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for LocationFeed {
    fn default() -> Self {
        Self::new()
    }
}
