//! One-shot HTTP GET over a fresh TCP or TLS connection.

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use bytes::Bytes;
use http::header::{HOST, HeaderMap};
use http::{Method, Request, StatusCode};
use http_body_util::{BodyExt, Empty};
use hyper::rt::{Read, Write};
use hyper_util::rt::TokioIo;
use rustls::pki_types::ServerName;
use tokio::net::TcpStream;
use tracing::debug;
use url::{Host, Position, Url};

use crate::error::TransportError;
use crate::tls::TlsConfig;

/// A fully received response.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// The URL that was requested.
    pub url: Url,
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
    /// Time from connection start until the response head arrived.
    pub elapsed: Duration,
}

/// HTTP/1.1 client performing single GET requests with a fixed timeout.
///
/// Cheap to clone; the TLS configuration is shared.
#[derive(Debug, Clone)]
pub struct HttpClient {
    timeout: Duration,
    tls: TlsConfig,
}

impl HttpClient {
    /// Create a client trusting the webpki root store.
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        Ok(Self::with_tls(timeout, TlsConfig::with_webpki_roots()?))
    }

    /// Create a client with a custom TLS configuration.
    pub fn with_tls(timeout: Duration, tls: TlsConfig) -> Self {
        Self { timeout, tls }
    }

    /// Issue a GET for `url` with the given extra headers.
    ///
    /// DNS lookup, connect, TLS handshake, request and body are all covered
    /// by the client timeout. Non-2xx responses are returned, not errors.
    pub async fn get(&self, url: &Url, headers: &HeaderMap) -> Result<HttpResponse, TransportError> {
        match tokio::time::timeout(self.timeout, self.exchange(url, headers)).await {
            Ok(result) => result,
            Err(_) => {
                debug!(%url, timeout = ?self.timeout, "request timed out");
                Err(TransportError::Timeout(self.timeout))
            }
        }
    }

    async fn exchange(&self, url: &Url, headers: &HeaderMap) -> Result<HttpResponse, TransportError> {
        let use_tls = match url.scheme() {
            "http" => false,
            "https" => true,
            other => return Err(TransportError::UnsupportedScheme(other.to_string())),
        };
        let host = match url.host() {
            Some(Host::Domain(domain)) => domain.to_string(),
            Some(Host::Ipv4(ip)) => ip.to_string(),
            Some(Host::Ipv6(ip)) => ip.to_string(),
            None => return Err(TransportError::MissingHost(url.to_string())),
        };
        let port = url
            .port_or_known_default()
            .ok_or_else(|| TransportError::MissingHost(url.to_string()))?;

        let request = build_request(url, headers)?;
        let started = Instant::now();
        let stream = connect(&host, port).await?;

        let received = if use_tls {
            let server_name = ServerName::try_from(host.as_str())
                .map_err(|_| TransportError::ServerName(host.clone()))?
                .to_owned();
            let connector = self.tls.connector();
            let stream = connector
                .connect(server_name, stream)
                .await
                .map_err(|source| TransportError::Tls {
                    host: host.clone(),
                    source,
                })?;
            send(TokioIo::new(stream), request, started).await?
        } else {
            send(TokioIo::new(stream), request, started).await?
        };

        debug!(
            %url,
            status = received.status.as_u16(),
            elapsed_ms = received.elapsed.as_millis() as u64,
            "request complete"
        );

        Ok(HttpResponse {
            url: url.clone(),
            status: received.status,
            headers: received.headers,
            body: received.body,
            elapsed: received.elapsed,
        })
    }
}

struct Received {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
    elapsed: Duration,
}

fn build_request(url: &Url, headers: &HeaderMap) -> Result<Request<Empty<Bytes>>, TransportError> {
    let authority = &url[Position::BeforeHost..Position::AfterPort];
    let target = &url[Position::BeforePath..Position::AfterQuery];

    let mut builder = Request::builder()
        .method(Method::GET)
        .uri(target)
        .header(HOST, authority);
    if let Some(map) = builder.headers_mut() {
        for (name, value) in headers {
            if *name != HOST {
                map.append(name.clone(), value.clone());
            }
        }
    }
    Ok(builder.body(Empty::new())?)
}

/// Resolve `host` and connect to the first address that accepts.
async fn connect(host: &str, port: u16) -> Result<TcpStream, TransportError> {
    let addrs: Vec<SocketAddr> = tokio::net::lookup_host((host, port))
        .await
        .map_err(|source| TransportError::Dns {
            host: host.to_string(),
            source,
        })?
        .collect();

    let mut last_err = None;
    for addr in addrs {
        match TcpStream::connect(addr).await {
            Ok(stream) => {
                let _ = stream.set_nodelay(true);
                return Ok(stream);
            }
            Err(source) => {
                debug!(%addr, error = %source, "connect attempt failed");
                last_err = Some(TransportError::Connect {
                    addr: addr.to_string(),
                    source,
                });
            }
        }
    }
    Err(last_err.unwrap_or_else(|| TransportError::NoAddresses(host.to_string())))
}

/// Run one request over `io`, driving the connection alongside it.
async fn send<T>(
    io: T,
    request: Request<Empty<Bytes>>,
    started: Instant,
) -> Result<Received, TransportError>
where
    T: Read + Write + Unpin,
{
    let (mut sender, conn) = hyper::client::conn::http1::handshake(io)
        .await
        .map_err(TransportError::Handshake)?;

    let exchange = async move {
        let response = sender
            .send_request(request)
            .await
            .map_err(TransportError::Send)?;
        let elapsed = started.elapsed();
        let (parts, body) = response.into_parts();
        let body = body
            .collect()
            .await
            .map_err(TransportError::Body)?
            .to_bytes();
        Ok::<_, TransportError>(Received {
            status: parts.status,
            headers: parts.headers,
            body,
            elapsed,
        })
    };

    tokio::pin!(conn);
    tokio::pin!(exchange);
    tokio::select! {
        biased;
        result = &mut exchange => return result,
        result = &mut conn => result.map_err(TransportError::Connection)?,
    }
    // The connection closed cleanly first; whatever it delivered is buffered.
    exchange.await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_server::{TestServer, respond, unused_addr};
    use http::HeaderValue;

    fn client(timeout: Duration) -> HttpClient {
        HttpClient::new(timeout).unwrap()
    }

    #[tokio::test]
    async fn get_returns_status_and_body() {
        let server = TestServer::spawn(|req| {
            assert_eq!(req.uri().path(), "/health");
            respond(200, "all good")
        })
        .await
        .unwrap();

        let url = Url::parse(&server.url("/health")).unwrap();
        let resp = client(Duration::from_secs(2))
            .get(&url, &HeaderMap::new())
            .await
            .unwrap();

        assert_eq!(resp.status, StatusCode::OK);
        assert_eq!(&resp.body[..], b"all good");
        assert_eq!(resp.url, url);
    }

    #[tokio::test]
    async fn non_success_status_is_not_an_error() {
        let server = TestServer::spawn(|_| respond(503, "down")).await.unwrap();
        let url = Url::parse(&server.url("/")).unwrap();
        let resp = client(Duration::from_secs(2))
            .get(&url, &HeaderMap::new())
            .await
            .unwrap();
        assert_eq!(resp.status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn sends_host_query_and_extra_headers() {
        let server = TestServer::spawn(|req| {
            let ua = req
                .headers()
                .get("user-agent")
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string();
            let host = req
                .headers()
                .get("host")
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string();
            let query = req.uri().query().unwrap_or_default().to_string();
            respond(200, &format!("{ua}|{host}|{query}"))
        })
        .await
        .unwrap();

        let mut headers = HeaderMap::new();
        headers.insert("user-agent", HeaderValue::from_static("fleetcheck-test"));
        let url = Url::parse(&server.url("/status?verbose=1")).unwrap();
        let resp = client(Duration::from_secs(2)).get(&url, &headers).await.unwrap();

        let body = String::from_utf8(resp.body.to_vec()).unwrap();
        assert_eq!(
            body,
            format!("fleetcheck-test|127.0.0.1:{}|verbose=1", server.addr().port())
        );
    }

    #[tokio::test]
    async fn connection_refused_is_connect_error() {
        let addr = unused_addr().await;
        let url = Url::parse(&format!("http://{addr}/health")).unwrap();
        let err = client(Duration::from_secs(2))
            .get(&url, &HeaderMap::new())
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Connect { .. }), "got {err}");
    }

    #[tokio::test]
    async fn silent_server_times_out() {
        let server = TestServer::silent().await.unwrap();
        let url = Url::parse(&server.url("/health")).unwrap();
        let err = client(Duration::from_millis(200))
            .get(&url, &HeaderMap::new())
            .await
            .unwrap_err();
        assert!(err.is_timeout(), "got {err}");
    }

    #[tokio::test]
    async fn unsupported_scheme_rejected() {
        let url = Url::parse("ftp://files.example/health").unwrap();
        let err = client(Duration::from_secs(1))
            .get(&url, &HeaderMap::new())
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::UnsupportedScheme(s) if s == "ftp"));
    }

    #[tokio::test]
    async fn tls_to_plaintext_peer_fails_handshake() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            use tokio::io::AsyncWriteExt;
            if let Ok((mut stream, _)) = listener.accept().await {
                let _ = stream
                    .write_all(b"HTTP/1.1 400 Bad Request\r\ncontent-length: 0\r\n\r\n")
                    .await;
            }
        });

        let url = Url::parse(&format!("https://{addr}/health")).unwrap();
        let err = client(Duration::from_secs(2))
            .get(&url, &HeaderMap::new())
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Tls { .. }), "got {err}");
    }
}
