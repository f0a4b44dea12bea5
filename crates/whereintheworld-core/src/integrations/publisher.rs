//! Deduplicating front for a [`PresenceService`].

use std::sync::Arc;

use tracing::debug;

use crate::error::PublishError;
use crate::integrations::traits::PresenceService;
use crate::status::ComposedStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    /// One call was made and succeeded.
    Published,
    /// Same as the last successful publish; no call was made.
    Unchanged,
}

/// Tracks the presence API key and the last successfully published status.
///
/// Never retries on its own: a failed publish is retried only when the
/// caller publishes again.
pub struct PresencePublisher<S> {
    service: Arc<S>,
    api_key: String,
    last_published: Option<ComposedStatus>,
}

/// One outbound call, detached from the publisher so it can run on
/// another task.
pub struct PublishJob<S> {
    service: Arc<S>,
    api_key: String,
    status: ComposedStatus,
}

impl<S: PresenceService> PublishJob<S> {
    pub async fn run(self) -> (ComposedStatus, Result<(), PublishError>) {
        let result = self.service.set_status(&self.status, &self.api_key).await;
        (self.status, result)
    }
}

impl<S: PresenceService> PresencePublisher<S> {
    pub fn new(service: Arc<S>, api_key: impl Into<String>) -> Self {
        Self {
            service,
            api_key: api_key.into(),
            last_published: None,
        }
    }

    /// Takes effect on the next publish. A different key may point at a
    /// different workspace, so the dedupe memory is cleared. Returns whether
    /// the key changed.
    pub fn set_api_key(&mut self, api_key: impl Into<String>) -> bool {
        let api_key = api_key.into();
        if api_key == self.api_key {
            return false;
        }
        self.api_key = api_key;
        self.last_published = None;
        true
    }

    pub fn has_credentials(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    pub fn last_published(&self) -> Option<&ComposedStatus> {
        self.last_published.as_ref()
    }

    /// Dedupe and credential check. `Ok(None)` means nothing to send.
    pub fn prepare(&self, status: &ComposedStatus) -> Result<Option<PublishJob<S>>, PublishError> {
        if self.last_published.as_ref() == Some(status) {
            return Ok(None);
        }
        if !self.has_credentials() {
            return Err(PublishError::MissingCredential);
        }
        Ok(Some(PublishJob {
            service: Arc::clone(&self.service),
            api_key: self.api_key.clone(),
            status: status.clone(),
        }))
    }

    pub fn record_success(&mut self, status: ComposedStatus) {
        self.last_published = Some(status);
    }

    /// Publish in place: prepare, run, record.
    pub async fn publish(&mut self, status: &ComposedStatus) -> Result<PublishOutcome, PublishError> {
        let Some(job) = self.prepare(status)? else {
            debug!(text = %status.text, "status unchanged, skipping publish");
            return Ok(PublishOutcome::Unchanged);
        };
        let (status, result) = job.run().await;
        result?;
        debug!(service = self.service.name(), text = %status.text, icon = %status.icon, "status published");
        self.record_success(status);
        Ok(PublishOutcome::Published)
    }

    /// Remove the status from the presence service.
    pub async fn clear_status(&mut self) -> Result<PublishOutcome, PublishError> {
        self.publish(&ComposedStatus::cleared()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BoxFuture;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct CountingService {
        calls: AtomicUsize,
        fail_with: Mutex<Option<PublishError>>,
    }

    impl PresenceService for CountingService {
        fn name(&self) -> &str {
            "counting"
        }

        fn display_name(&self) -> &str {
            "Counting"
        }

        fn set_status<'a>(
            &'a self,
            _status: &'a ComposedStatus,
            _api_key: &'a str,
        ) -> BoxFuture<'a, Result<(), PublishError>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let result = match self.fail_with.lock().unwrap().clone() {
                Some(err) => Err(err),
                None => Ok(()),
            };
            Box::pin(async move { result })
        }
    }

    fn office() -> ComposedStatus {
        ComposedStatus {
            text: "Office".into(),
            icon: ":zoom::around:".into(),
            expiration: 0,
        }
    }

    #[tokio::test]
    async fn identical_publish_makes_one_call() {
        let service = Arc::new(CountingService::default());
        let mut publisher = PresencePublisher::new(Arc::clone(&service), "xoxp-test");

        assert_eq!(publisher.publish(&office()).await.unwrap(), PublishOutcome::Published);
        assert_eq!(publisher.publish(&office()).await.unwrap(), PublishOutcome::Unchanged);
        assert_eq!(service.calls.load(Ordering::SeqCst), 1);
        assert_eq!(publisher.last_published(), Some(&office()));
    }

    #[tokio::test]
    async fn missing_key_makes_no_call() {
        let service = Arc::new(CountingService::default());
        let mut publisher = PresencePublisher::new(Arc::clone(&service), "");

        assert!(!publisher.has_credentials());
        assert_eq!(
            publisher.publish(&office()).await.unwrap_err(),
            PublishError::MissingCredential
        );
        assert_eq!(service.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn failure_does_not_record_last_published() {
        let service = Arc::new(CountingService::default());
        *service.fail_with.lock().unwrap() = Some(PublishError::Unavailable("ratelimited".into()));
        let mut publisher = PresencePublisher::new(Arc::clone(&service), "xoxp-test");

        assert!(publisher.publish(&office()).await.is_err());
        assert!(publisher.last_published().is_none());

        *service.fail_with.lock().unwrap() = None;
        assert_eq!(publisher.publish(&office()).await.unwrap(), PublishOutcome::Published);
        assert_eq!(service.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn new_key_applies_without_rebuilding() {
        let service = Arc::new(CountingService::default());
        let mut publisher = PresencePublisher::new(Arc::clone(&service), "");
        assert!(publisher.publish(&office()).await.is_err());

        assert!(publisher.set_api_key("xoxp-new"));
        assert!(!publisher.set_api_key("xoxp-new"));
        assert_eq!(publisher.publish(&office()).await.unwrap(), PublishOutcome::Published);

        publisher.set_api_key("xoxp-other");
        assert!(publisher.last_published().is_none());
    }

    #[tokio::test]
    async fn clear_publishes_empty_status() {
        let service = Arc::new(CountingService::default());
        let mut publisher = PresencePublisher::new(Arc::clone(&service), "xoxp-test");
        publisher.clear_status().await.unwrap();
        assert_eq!(publisher.last_published(), Some(&ComposedStatus::cleared()));
    }
}
