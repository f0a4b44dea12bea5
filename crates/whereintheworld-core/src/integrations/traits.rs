use crate::error::PublishError;
use crate::status::ComposedStatus;
use crate::BoxFuture;

/// A messaging service whose user presence can be set.
///
/// Implementations hold no credentials -- the key comes with every call,
/// so a settings change takes effect on the next publish without rebuilding
/// the service.
pub trait PresenceService: Send + Sync {
    /// Unique identifier (e.g. "slack").
    fn name(&self) -> &str;

    /// Human-readable display name.
    fn display_name(&self) -> &str;

    /// One outbound call setting text, icon and expiration.
    fn set_status<'a>(
        &'a self,
        status: &'a ComposedStatus,
        api_key: &'a str,
    ) -> BoxFuture<'a, Result<(), PublishError>>;
}
