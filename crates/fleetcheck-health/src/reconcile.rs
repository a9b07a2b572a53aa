//! Anti-flap re-verification of critical outcomes.
//!
//! An instance that deregisters during a run usually fails its probe
//! hard. Before a CRIT verdict is final, the critical probe outcomes are
//! checked against a fresh discovery snapshot and the ones whose
//! announcement is gone are downgraded to WARN.

use std::cmp::Reverse;

use fleetcheck_core::Severity;
use fleetcheck_discovery::{AnnouncementSource, DiscoveryError, DiscoverySnapshot};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::cancel::{cancelled, is_cancelled};
use crate::outcome::{AggregateVerdict, ProbeOutcome};

/// What a reconciliation pass did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciliation {
    /// The verdict was not CRIT; nothing was fetched.
    NotNeeded,
    /// Every critical announcement is still registered.
    Confirmed,
    /// This many critical outcomes were downgraded.
    Downgraded(usize),
    /// The fresh fetch failed; critical outcomes were kept.
    FetchFailed,
}

/// Re-verifies CRIT outcomes against a fresh snapshot from `source`.
pub struct ReconciliationGuard<'a, S> {
    source: &'a S,
}

impl<'a, S: AnnouncementSource> ReconciliationGuard<'a, S> {
    pub fn new(source: &'a S) -> Self {
        Self { source }
    }

    /// Reconcile `verdict` in place.
    ///
    /// A failed or cancelled fetch, including a run cancelled before the
    /// fetch starts, adds a WARN diagnostic and leaves every CRIT outcome
    /// as it was.
    pub async fn reconcile(
        &self,
        verdict: &mut AggregateVerdict,
        cancel: &mut watch::Receiver<bool>,
    ) -> Reconciliation {
        if verdict.severity() != Severity::Crit {
            return Reconciliation::NotNeeded;
        }

        let fetched = if is_cancelled(cancel) {
            Err(DiscoveryError::Cancelled)
        } else {
            tokio::select! {
                // A fetch that has already finished wins over the signal.
                biased;
                result = self.source.fetch() => result,
                _ = cancelled(cancel) => Err(DiscoveryError::Cancelled),
            }
        };
        let fresh = match fetched {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(error = %e, "reconciliation fetch failed, keeping critical results");
                verdict.push(ProbeOutcome::new(
                    Severity::Warn,
                    format!("failed to re-verify critical results against discovery: {e}"),
                ));
                return Reconciliation::FetchFailed;
            }
        };

        let downgraded = downgrade_vanished(verdict, &fresh);
        if downgraded == 0 {
            debug!(backend = %fresh.backend, "critical results confirmed");
            return Reconciliation::Confirmed;
        }

        verdict.push(ProbeOutcome::new(
            Severity::Warn,
            format!(
                "{downgraded} critical result(s) downgraded: instances no longer announced by {}",
                fresh.backend
            ),
        ));
        verdict.recompute();

        info!(
            downgraded,
            backend = %fresh.backend,
            severity = %verdict.severity(),
            "downgraded critical results for deregistered instances"
        );
        Reconciliation::Downgraded(downgraded)
    }
}

/// Downgrade CRIT outcomes whose announcement is absent from `fresh`.
///
/// Outcomes are visited worst-first and the scan stops at the first
/// non-CRIT one. Outcomes without an announcement, or whose announcement
/// has an empty id, cannot be matched against `fresh` and are kept.
pub fn downgrade_vanished(verdict: &mut AggregateVerdict, fresh: &DiscoverySnapshot) -> usize {
    let outcomes = verdict.outcomes_mut();
    let mut order: Vec<usize> = (0..outcomes.len()).collect();
    order.sort_by_key(|&i| Reverse(outcomes[i].severity()));

    let mut downgraded = 0;
    for i in order {
        let outcome = &mut outcomes[i];
        if outcome.severity() != Severity::Crit {
            break;
        }
        let Some(id) = outcome.announcement().map(|a| a.announcement_id.clone()) else {
            continue;
        };
        if id.is_empty() {
            debug!(outcome = outcome.message(), "critical outcome has no announcement id, keeping it");
            continue;
        }
        if fresh.contains_id(&id) {
            continue;
        }
        outcome.downgrade(
            Severity::Warn,
            &format!("(downgraded: announcement {id} is no longer registered)"),
        );
        downgraded += 1;
    }
    downgraded
}
