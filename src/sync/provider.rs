//! HTTP entitlement provider

use crate::sync::{EntitlementProvider, SyncError};
use async_trait::async_trait;

/// Provider URL with credentials and query stripped, for logs
///
/// Anything that does not parse as a URL is replaced wholesale.
pub fn redact_url(url: &str) -> String {
    match reqwest::Url::parse(url) {
        Ok(mut parsed) => {
            let _ = parsed.set_username("");
            let _ = parsed.set_password(None);
            parsed.set_query(None);
            parsed.set_fragment(None);
            parsed.to_string()
        }
        Err(_) => "<invalid url>".to_string(),
    }
}

/// Fetches the entitlement document with a plain GET
pub struct HttpProvider {
    url: String,
    /// Loggable form of `url`
    source: String,
    client: reqwest::Client,
}

impl HttpProvider {
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_client(url, reqwest::Client::new())
    }

    pub fn with_client(url: impl Into<String>, client: reqwest::Client) -> Self {
        let url = url.into();
        Self {
            source: redact_url(&url),
            url,
            client,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl EntitlementProvider for HttpProvider {
    async fn fetch(&self) -> Result<Vec<u8>, SyncError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| SyncError::Fetch(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SyncError::Status(status.as_u16()));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| SyncError::Fetch(e.to_string()))?;

        Ok(body.to_vec())
    }

    fn source(&self) -> &str {
        &self.source
    }
}
