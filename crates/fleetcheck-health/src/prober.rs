//! Concurrent health probes, one per matched announcement.
//!
//! Every announcement produces exactly one [`ProbeOutcome`]. Probes share
//! nothing but the [`ResultAggregator`]; each is bounded by the HTTP
//! client timeout and by the run's cancellation signal.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use fleetcheck_core::{Announcement, Header, Severity, append_headers};
use fleetcheck_http::{HttpClient, TransportError};
use http::StatusCode;
use http::header::{HeaderMap, HeaderValue, USER_AGENT as USER_AGENT_HEADER};
use tokio::sync::{OwnedSemaphorePermit, Semaphore, watch};
use tokio::task::{Id, JoinSet};
use tracing::{debug, error};
use url::Url;

use crate::aggregator::ResultAggregator;
use crate::cancel::{cancelled, is_cancelled};
use crate::outcome::ProbeOutcome;

/// Identifying `User-Agent` sent with every probe.
pub const USER_AGENT: &str = concat!("fleetcheck/", env!("CARGO_PKG_VERSION"));

/// What happened to one probe.
#[derive(Debug)]
pub enum ProbeResult {
    /// The endpoint answered with a status code.
    Response {
        url: Url,
        status: StatusCode,
        elapsed: Duration,
    },
    /// No response: DNS, connect, TLS, protocol error or timeout.
    TransportFailure { url: Url, error: TransportError },
    /// The probe URL could not be built from the announcement.
    ConfigurationFailure {
        service_uri: String,
        error: url::ParseError,
    },
    /// The run was cancelled before the probe finished.
    Cancelled { url: Url },
}

impl ProbeResult {
    pub fn severity(&self) -> Severity {
        match self {
            ProbeResult::Response { status, .. } => classify_status(*status),
            ProbeResult::TransportFailure { .. } => Severity::Warn,
            ProbeResult::ConfigurationFailure { .. } => Severity::Warn,
            ProbeResult::Cancelled { .. } => Severity::Unknown,
        }
    }

    pub fn into_outcome(self, announcement: Announcement) -> ProbeOutcome {
        let severity = self.severity();
        let message = match self {
            ProbeResult::Response {
                url,
                status,
                elapsed,
            } => format!(
                "status code: {}, duration: {} ms, endpoint: {url}",
                status.as_u16(),
                elapsed.as_millis()
            ),
            ProbeResult::TransportFailure { url, error } => {
                format!("failed to fetch announced endpoint {url}: {error}")
            }
            ProbeResult::ConfigurationFailure { service_uri, error } => {
                format!("failed to build probe URL for {service_uri}: {error}")
            }
            ProbeResult::Cancelled { url } => {
                format!("probe of {url} cancelled before completion")
            }
        };
        ProbeOutcome::new(severity, message).for_announcement(announcement)
    }
}

/// Map a response status to a severity: 2xx OK, 4xx WARN, anything else CRIT.
pub fn classify_status(status: StatusCode) -> Severity {
    if status.is_success() {
        Severity::Ok
    } else if status.is_client_error() {
        Severity::Warn
    } else {
        Severity::Crit
    }
}

/// Resolve `endpoint` against an announcement's base URI.
///
/// Standard reference resolution: a relative path is joined onto the base,
/// an absolute URL replaces it.
pub fn resolve_probe_url(service_uri: &str, endpoint: &str) -> Result<Url, url::ParseError> {
    Url::parse(service_uri)?.join(endpoint)
}

/// Probes the health endpoint of each announcement.
#[derive(Debug, Clone)]
pub struct HealthProber {
    http: HttpClient,
    endpoint: String,
    headers: HeaderMap,
    max_in_flight: Option<usize>,
}

impl HealthProber {
    /// `extra` headers are sent after the identifying `User-Agent`.
    pub fn new(http: HttpClient, endpoint: impl Into<String>, extra: &[Header]) -> Self {
        let mut headers = HeaderMap::with_capacity(extra.len() + 1);
        headers.insert(USER_AGENT_HEADER, HeaderValue::from_static(USER_AGENT));
        append_headers(&mut headers, extra);
        Self {
            http,
            endpoint: endpoint.into(),
            headers,
            max_in_flight: None,
        }
    }

    /// Bound the number of probes in flight. Outcomes are unchanged.
    pub fn with_max_in_flight(mut self, limit: usize) -> Self {
        self.max_in_flight = Some(limit.max(1));
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Probe a single announcement.
    pub async fn probe(
        &self,
        announcement: &Announcement,
        cancel: &mut watch::Receiver<bool>,
    ) -> ProbeResult {
        let url = match resolve_probe_url(&announcement.service_uri, &self.endpoint) {
            Ok(url) => url,
            Err(error) => {
                return ProbeResult::ConfigurationFailure {
                    service_uri: announcement.service_uri.clone(),
                    error,
                };
            }
        };
        if is_cancelled(cancel) {
            return ProbeResult::Cancelled { url };
        }

        let response = tokio::select! {
            result = self.http.get(&url, &self.headers) => Some(result),
            _ = cancelled(cancel) => None,
        };

        let result = match response {
            Some(Ok(resp)) => ProbeResult::Response {
                url,
                status: resp.status,
                elapsed: resp.elapsed,
            },
            Some(Err(error)) => ProbeResult::TransportFailure { url, error },
            None => ProbeResult::Cancelled { url },
        };
        debug!(
            announcement = %announcement.announcement_id,
            severity = %result.severity(),
            "probe finished"
        );
        result
    }

    /// Probe every announcement concurrently and feed `aggregator`.
    ///
    /// Returns once every probe has reported. A probe task that dies
    /// without reporting is recorded as UNKNOWN for its announcement.
    pub async fn probe_all(
        &self,
        announcements: &[Announcement],
        aggregator: &ResultAggregator,
        cancel: &watch::Receiver<bool>,
    ) {
        let limiter = self.max_in_flight.map(|n| Arc::new(Semaphore::new(n)));
        let mut tasks = JoinSet::new();
        let mut pending: HashMap<Id, Announcement> = HashMap::with_capacity(announcements.len());

        for announcement in announcements {
            let prober = self.clone();
            let aggregator = aggregator.clone();
            let limiter = limiter.clone();
            let mut cancel = cancel.clone();
            let target = announcement.clone();

            let handle = tasks.spawn(async move {
                let _permit = match limiter {
                    Some(sem) => acquire(sem, &mut cancel).await,
                    None => None,
                };
                let result = prober.probe(&target, &mut cancel).await;
                aggregator.add(result.into_outcome(target));
            });
            pending.insert(handle.id(), announcement.clone());
        }

        debug!(probes = pending.len(), "probes dispatched");
        join_probes(tasks, pending, aggregator).await;
    }
}

/// Wait for every probe task. `pending` maps task ids to announcements; a
/// task that ends without reporting (panic or abort) is recorded as
/// UNKNOWN for its announcement.
async fn join_probes(
    mut tasks: JoinSet<()>,
    mut pending: HashMap<Id, Announcement>,
    aggregator: &ResultAggregator,
) {
    while let Some(joined) = tasks.join_next_with_id().await {
        match joined {
            Ok((id, ())) => {
                pending.remove(&id);
            }
            Err(err) => {
                let Some(announcement) = pending.remove(&err.id()) else {
                    continue;
                };
                error!(
                    announcement = %announcement.announcement_id,
                    error = %err,
                    "probe task failed"
                );
                let message = format!("probe of {} aborted: {err}", announcement.service_uri);
                aggregator.add(
                    ProbeOutcome::new(Severity::Unknown, message).for_announcement(announcement),
                );
            }
        }
    }
}

/// Wait for a fan-out permit, giving up if the run is cancelled.
async fn acquire(
    sem: Arc<Semaphore>,
    cancel: &mut watch::Receiver<bool>,
) -> Option<OwnedSemaphorePermit> {
    tokio::select! {
        permit = sem.acquire_owned() => permit.ok(),
        _ = cancelled(cancel) => None,
    }
}
