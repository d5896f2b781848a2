use std::time::Duration;

use async_trait::async_trait;

use crate::error::TransportError;

const ACCEPT_GITHUB_JSON: &str = "application/vnd.github+json";
const BODY_SNIPPET_CHARS: usize = 160;

/// Fetch-by-URL capability used by [`crate::ReleaseChecker`].
///
/// Implementations return the raw response body of a successful (2xx)
/// response and map everything else to a [`TransportError`].
#[async_trait]
pub trait ReleaseTransport: Send + Sync {
    async fn get(&self, url: &str, user_agent: &str) -> Result<Vec<u8>, TransportError>;
}

/// [`ReleaseTransport`] backed by a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Build a transport whose requests time out after `timeout`.
    ///
    /// # Errors
    /// Returns [`TransportError::ClientBuild`] if the TLS backend cannot be
    /// initialised.
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .map_err(|error| TransportError::ClientBuild {
                details: error.to_string(),
            })?;
        Ok(Self { client })
    }

    #[must_use]
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ReleaseTransport for HttpTransport {
    async fn get(&self, url: &str, user_agent: &str) -> Result<Vec<u8>, TransportError> {
        let response = self
            .client
            .get(url)
            .header(reqwest::header::USER_AGENT, user_agent)
            .header(reqwest::header::ACCEPT, ACCEPT_GITHUB_JSON)
            .send()
            .await
            .map_err(|error| TransportError::request_from(url, error))?;

        let status = response.status();
        if !status.is_success() {
            let body_snippet = response
                .text()
                .await
                .ok()
                .map(|body| response_snippet(&body, BODY_SNIPPET_CHARS))
                .unwrap_or_default();
            return Err(TransportError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
                body_snippet,
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|error| TransportError::request_from(url, error))?;
        Ok(body.to_vec())
    }
}

fn response_snippet(body: &str, max_chars: usize) -> String {
    let snippet: String = body.chars().take(max_chars).collect();
    if snippet.is_empty() {
        String::new()
    } else {
        format!(": {snippet}")
    }
}

#[cfg(test)]
mod tests {
    use super::response_snippet;

    #[test]
    fn response_snippet_truncates_and_prefixes() {
        assert_eq!(response_snippet("Not Found", 160), ": Not Found");
        assert_eq!(response_snippet("abcdef", 3), ": abc");
        assert_eq!(response_snippet("", 160), "");
    }
}
