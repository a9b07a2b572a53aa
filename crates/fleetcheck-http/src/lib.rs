//! fleetcheck-http — minimal HTTP/1.1 client used by fleetcheck.
//!
//! Each request opens a fresh connection (plain TCP or rustls TLS),
//! performs a single GET through hyper's low-level `conn::http1` API and
//! collects the body. The whole exchange is bounded by the client timeout.
//! Nothing is pooled or cached between requests.

pub mod error;
pub mod tls;
pub mod transport;

#[cfg(any(test, feature = "test-util"))]
pub mod test_server;

pub use error::TransportError;
pub use tls::TlsConfig;
pub use transport::{HttpClient, HttpResponse};
