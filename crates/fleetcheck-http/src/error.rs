//! Transport error types.

use std::time::Duration;

use thiserror::Error;

/// Failures that prevent a response from being received.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("unsupported URL scheme {0:?}")]
    UnsupportedScheme(String),

    #[error("URL has no host: {0}")]
    MissingHost(String),

    #[error("dns lookup for {host} failed: {source}")]
    Dns {
        host: String,
        source: std::io::Error,
    },

    #[error("dns lookup for {0} returned no addresses")]
    NoAddresses(String),

    #[error("connect to {addr} failed: {source}")]
    Connect {
        addr: String,
        source: std::io::Error,
    },

    #[error("invalid tls server name {0:?}")]
    ServerName(String),

    #[error("tls handshake with {host} failed: {source}")]
    Tls {
        host: String,
        source: std::io::Error,
    },

    #[error("tls configuration error: {0}")]
    TlsConfig(String),

    #[error("http handshake failed: {0}")]
    Handshake(#[source] hyper::Error),

    #[error("invalid request: {0}")]
    Request(#[from] http::Error),

    #[error("request failed: {0}")]
    Send(#[source] hyper::Error),

    #[error("connection error: {0}")]
    Connection(#[source] hyper::Error),

    #[error("failed to read response body: {0}")]
    Body(#[source] hyper::Error),

    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

impl TransportError {
    /// Whether the failure was the client-side timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, TransportError::Timeout(_))
    }
}
