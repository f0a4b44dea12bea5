//! Presence services the composed status is published to.

mod publisher;
pub mod slack;
pub mod traits;

pub use publisher::{PresencePublisher, PublishJob, PublishOutcome};
pub use slack::SlackPresence;
pub use traits::PresenceService;
