use std::sync::Arc;

use log::debug;

use crate::error::FetchError;
use crate::release::Release;
use crate::transport::ReleaseTransport;

pub const DEFAULT_API_BASE: &str = "https://api.github.com";
pub const LATEST_RELEASE: &str = "latest";

/// Fetches releases of one `account/repository` through an injected
/// transport.
///
/// An empty or missing repository is accepted here so that configuration can
/// be fixed up later, but every fetch fails with
/// [`FetchError::InvalidRepository`] until it is set.
#[derive(Clone)]
pub struct ReleaseChecker {
    account: Option<String>,
    repository: Option<String>,
    base_url: String,
    transport: Arc<dyn ReleaseTransport>,
}

impl std::fmt::Debug for ReleaseChecker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReleaseChecker")
            .field("account", &self.account)
            .field("repository", &self.repository)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl ReleaseChecker {
    pub fn new(
        account: Option<String>,
        repository: Option<String>,
        transport: Arc<dyn ReleaseTransport>,
    ) -> Self {
        Self {
            account,
            repository,
            base_url: DEFAULT_API_BASE.to_string(),
            transport,
        }
    }

    /// Point the checker at another API root, e.g. a GitHub Enterprise host.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    #[must_use]
    pub fn account(&self) -> Option<&str> {
        self.account.as_deref()
    }

    #[must_use]
    pub fn repository(&self) -> Option<&str> {
        self.repository.as_deref()
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// URL of the releases API entry for `release_id` (`"latest"` or a
    /// numeric release id).
    #[must_use]
    pub fn release_api_url(&self, release_id: &str) -> String {
        format!(
            "{}/repos/{}/{}/releases/{}",
            self.base_url,
            self.account.as_deref().unwrap_or_default(),
            self.repository.as_deref().unwrap_or_default(),
            release_id
        )
    }

    /// Fetch and decode one release.
    ///
    /// # Errors
    /// [`FetchError::InvalidRepository`] without touching the network when no
    /// repository is configured, otherwise the transport or decode failure.
    pub async fn fetch_release(&self, release_id: &str) -> Result<Release, FetchError> {
        let repository = self
            .repository
            .as_deref()
            .map(str::trim)
            .filter(|repository| !repository.is_empty())
            .ok_or(FetchError::InvalidRepository)?;

        let url = self.release_api_url(release_id);
        debug!("Fetching release from {url}");

        let body = self.transport.get(&url, repository).await?;
        Ok(Release::from_json(&body)?)
    }

    /// Shorthand for [`ReleaseChecker::fetch_release`] with `"latest"`.
    ///
    /// # Errors
    /// See [`ReleaseChecker::fetch_release`].
    pub async fn fetch_latest(&self) -> Result<Release, FetchError> {
        self.fetch_release(LATEST_RELEASE).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::{LATEST_RELEASE, ReleaseChecker};
    use crate::error::{DecodeError, FetchError, TransportError};
    use crate::transport::ReleaseTransport;

    #[derive(Default)]
    struct RecordingTransport {
        calls: AtomicUsize,
        user_agents: Mutex<Vec<String>>,
        response: Option<Result<Vec<u8>, TransportError>>,
    }

    impl RecordingTransport {
        fn responding(response: Result<Vec<u8>, TransportError>) -> Self {
            Self {
                response: Some(response),
                ..Self::default()
            }
        }
    }

    #[async_trait]
    impl ReleaseTransport for RecordingTransport {
        async fn get(&self, _url: &str, user_agent: &str) -> Result<Vec<u8>, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.user_agents
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .push(user_agent.to_string());
            self.response
                .clone()
                .unwrap_or_else(|| Err(TransportError::request_from("unset", "no response")))
        }
    }

    fn checker(
        account: Option<&str>,
        repository: Option<&str>,
        transport: Arc<RecordingTransport>,
    ) -> ReleaseChecker {
        ReleaseChecker::new(
            account.map(ToString::to_string),
            repository.map(ToString::to_string),
            transport,
        )
    }

    #[test]
    fn release_api_url_for_latest_release() {
        let checker = checker(
            Some("nachmore"),
            Some("AmazonChimeHelper"),
            Arc::default(),
        );

        assert_eq!(
            checker.release_api_url(LATEST_RELEASE),
            "https://api.github.com/repos/nachmore/AmazonChimeHelper/releases/latest"
        );
    }

    #[test]
    fn release_api_url_for_specific_release_is_deterministic() {
        let checker = checker(
            Some("nachmore"),
            Some("AmazonChimeHelper"),
            Arc::default(),
        );

        let first = checker.release_api_url("23205966");
        let second = checker.release_api_url("23205966");

        assert_eq!(
            first,
            "https://api.github.com/repos/nachmore/AmazonChimeHelper/releases/23205966"
        );
        assert_eq!(first, second);
    }

    #[test]
    fn release_api_url_honours_custom_base_and_missing_account() {
        let checker = checker(None, Some("whatever"), Arc::default())
            .with_base_url("https://ghe.example.com/api/v3/");

        assert_eq!(
            checker.release_api_url(LATEST_RELEASE),
            "https://ghe.example.com/api/v3/repos//whatever/releases/latest"
        );
    }

    #[test]
    fn construction_keeps_account_and_repository() {
        let checker = checker(Some("nachmore"), None, Arc::default());

        assert_eq!(checker.account(), Some("nachmore"));
        assert_eq!(checker.repository(), None);
    }

    #[tokio::test]
    async fn missing_or_blank_repository_fails_before_network() {
        let transport = Arc::new(RecordingTransport::default());

        for repository in [None, Some(""), Some("   ")] {
            let checker = checker(Some("nachmore"), repository, Arc::clone(&transport));
            let result = checker.fetch_latest().await;
            assert_eq!(result, Err(FetchError::InvalidRepository));
        }

        assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn fetch_sends_repository_as_user_agent_and_decodes() {
        let body = br#"{
            "name": "Chime Helper 1.3",
            "html_url": "https://github.com/nachmore/AmazonChimeHelper/releases/tag/v1.3",
            "tag_name": "v1.3",
            "assets": []
        }"#;
        let transport = Arc::new(RecordingTransport::responding(Ok(body.to_vec())));
        let checker = checker(
            Some("nachmore"),
            Some("AmazonChimeHelper"),
            Arc::clone(&transport),
        );

        let release = checker
            .fetch_latest()
            .await
            .expect("release should be fetched");

        assert_eq!(release.version, "v1.3");
        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            *transport
                .user_agents
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner),
            vec!["AmazonChimeHelper".to_string()]
        );
    }

    #[tokio::test]
    async fn fetch_maps_transport_and_decode_failures() {
        let status = TransportError::HttpStatus {
            url: "u".to_string(),
            status: 404,
            body_snippet: String::new(),
        };
        let failing = checker(
            Some("nachmore"),
            Some("AmazonChimeHelper"),
            Arc::new(RecordingTransport::responding(Err(status.clone()))),
        );
        assert_eq!(
            failing.fetch_release("0").await,
            Err(FetchError::Transport(status))
        );

        let garbage = checker(
            Some("nachmore"),
            Some("AmazonChimeHelper"),
            Arc::new(RecordingTransport::responding(Ok(b"{}".to_vec()))),
        );
        assert!(matches!(
            garbage.fetch_latest().await,
            Err(FetchError::Decode(DecodeError::Json { .. }))
        ));
    }
}
