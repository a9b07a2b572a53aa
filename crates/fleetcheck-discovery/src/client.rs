//! HTTP discovery client.
//!
//! Reads the whole announcement directory from `GET <base>/state`, a JSON
//! array of announcement objects.

use std::future::Future;
use std::time::Duration;

use fleetcheck_core::Announcement;
use fleetcheck_http::HttpClient;
use http::header::{ACCEPT, HeaderMap, HeaderValue};
use tracing::debug;
use url::Url;

use crate::error::DiscoveryError;
use crate::source::{AnnouncementSource, DiscoverySnapshot};

/// Response header naming the discovery backend that served the request.
pub const BACKEND_HEADER: &str = "x-discovery-server";

/// Timeout for discovery requests.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

const STATE_PATH: &str = "/state";

/// Client for a discovery server's state endpoint.
#[derive(Debug, Clone)]
pub struct DiscoveryClient {
    base: Url,
    http: HttpClient,
}

impl DiscoveryClient {
    pub fn new(base: Url, http: HttpClient) -> Self {
        Self { base, http }
    }

    /// Create a client with the default discovery timeout.
    pub fn with_default_timeout(base: Url) -> Result<Self, DiscoveryError> {
        Ok(Self::new(base, HttpClient::new(DEFAULT_TIMEOUT)?))
    }

    /// The state endpoint. `/state` is absolute, so any base path is replaced.
    pub fn state_url(&self) -> Result<Url, DiscoveryError> {
        Ok(self.base.join(STATE_PATH)?)
    }

    /// Fetch every announcement currently registered.
    pub async fn find_announcements(&self) -> Result<DiscoverySnapshot, DiscoveryError> {
        let url = self.state_url()?;
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let resp = self.http.get(&url, &headers).await?;
        if !resp.status.is_success() {
            return Err(DiscoveryError::Status {
                url: url.to_string(),
                status: resp.status,
            });
        }

        let announcements: Vec<Announcement> = serde_json::from_slice(&resp.body)?;
        let backend = resp
            .headers
            .get(BACKEND_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| self.base.to_string());

        debug!(
            %url,
            %backend,
            announcements = announcements.len(),
            "fetched discovery state"
        );

        Ok(DiscoverySnapshot {
            announcements,
            backend,
        })
    }
}

impl AnnouncementSource for DiscoveryClient {
    fn fetch(&self) -> impl Future<Output = Result<DiscoverySnapshot, DiscoveryError>> + Send {
        self.find_announcements()
    }
}
