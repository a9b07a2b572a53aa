//! Discovery fetch errors.

use fleetcheck_http::TransportError;
use http::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("invalid discovery URL: {0}")]
    Url(#[from] url::ParseError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("discovery server {url} returned {status}")]
    Status { url: String, status: StatusCode },

    #[error("failed to decode discovery state: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("discovery fetch cancelled")]
    Cancelled,
}
