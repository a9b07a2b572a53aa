//! One check run: fetch, quota, probe, aggregate, reconcile.

use std::fmt;

use fleetcheck_core::{CheckConfig, Severity, Thresholds};
use fleetcheck_discovery::{AnnouncementSource, DiscoveryError};
use fleetcheck_http::{HttpClient, TransportError};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::aggregator::ResultAggregator;
use crate::cancel::{cancelled, is_cancelled};
use crate::outcome::AggregateVerdict;
use crate::prober::HealthProber;
use crate::quota::evaluate_quota;
use crate::reconcile::ReconciliationGuard;

/// Phases a run moves through, in order. Bracketed phases are optional:
///
/// `Collecting → QuotaEvaluated → [Probing → Aggregated] → [Reconciling → Final] → Done`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Collecting,
    QuotaEvaluated,
    Probing,
    Aggregated,
    Reconciling,
    Final,
    Done,
}

impl RunPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            RunPhase::Collecting => "collecting",
            RunPhase::QuotaEvaluated => "quota-evaluated",
            RunPhase::Probing => "probing",
            RunPhase::Aggregated => "aggregated",
            RunPhase::Reconciling => "reconciling",
            RunPhase::Final => "final",
            RunPhase::Done => "done",
        }
    }
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A configured check of one service type.
#[derive(Debug, Clone)]
pub struct ServiceCheck {
    service: String,
    thresholds: Thresholds,
    skip_healthcheck: bool,
    prober: HealthProber,
}

impl ServiceCheck {
    pub fn new(service: impl Into<String>, thresholds: Thresholds, prober: HealthProber) -> Self {
        Self {
            service: service.into(),
            thresholds,
            skip_healthcheck: false,
            prober,
        }
    }

    /// Only evaluate the quota; no probes and no reconciliation.
    pub fn skip_healthcheck(mut self, skip: bool) -> Self {
        self.skip_healthcheck = skip;
        self
    }

    pub fn from_config(config: &CheckConfig) -> Result<Self, TransportError> {
        let http = HttpClient::new(config.probe_timeout)?;
        let mut prober = HealthProber::new(http, config.endpoint.clone(), &config.headers);
        if let Some(limit) = config.max_in_flight {
            prober = prober.with_max_in_flight(limit);
        }
        Ok(Self::new(config.service.clone(), config.thresholds, prober)
            .skip_healthcheck(config.skip_healthcheck))
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    /// Run the check to completion and return exactly one verdict.
    ///
    /// `source` is queried at most twice: once for the initial snapshot
    /// and once more if a CRIT verdict needs reconciling.
    pub async fn run<S: AnnouncementSource>(
        &self,
        source: &S,
        mut cancel: watch::Receiver<bool>,
    ) -> AggregateVerdict {
        self.enter(RunPhase::Collecting);
        let fetched = if is_cancelled(&cancel) {
            Err(DiscoveryError::Cancelled)
        } else {
            tokio::select! {
                // A fetch that has already finished wins over the signal.
                biased;
                result = source.fetch() => result,
                _ = cancelled(&mut cancel) => Err(DiscoveryError::Cancelled),
            }
        };
        let snapshot = match fetched {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(service = %self.service, error = %e, "initial discovery fetch failed");
                self.enter(RunPhase::Done);
                return AggregateVerdict::unknown(format!("failed to fetch discovery state: {e}"));
            }
        };

        let matched = snapshot.matching(&self.service);
        debug!(
            service = %self.service,
            backend = %snapshot.backend,
            listed = snapshot.announcements.len(),
            matched = matched.len(),
            "discovery snapshot"
        );

        let aggregator = ResultAggregator::new();
        aggregator.add(evaluate_quota(&self.service, &matched, self.thresholds));
        self.enter(RunPhase::QuotaEvaluated);

        if !self.skip_healthcheck {
            self.enter(RunPhase::Probing);
            self.prober.probe_all(&matched, &aggregator, &cancel).await;
            self.enter(RunPhase::Aggregated);
        }

        let mut verdict = aggregator.to_verdict();

        // A cancelled run does not re-fetch; reconcile records the CRIT as
        // unverified instead.
        if !self.skip_healthcheck && verdict.severity() == Severity::Crit {
            self.enter(RunPhase::Reconciling);
            let reconciliation = ReconciliationGuard::new(source)
                .reconcile(&mut verdict, &mut cancel)
                .await;
            debug!(service = %self.service, ?reconciliation, "reconciliation finished");
            self.enter(RunPhase::Final);
        }

        self.enter(RunPhase::Done);
        info!(
            service = %self.service,
            severity = %verdict.severity(),
            outcomes = verdict.outcomes().len(),
            "check finished"
        );
        verdict
    }

    fn enter(&self, phase: RunPhase) {
        debug!(service = %self.service, %phase, "run phase");
    }
}
