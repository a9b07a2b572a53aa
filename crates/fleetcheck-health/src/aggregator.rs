//! Thread-safe result sink shared by concurrent probes.
//!
//! Outcomes are stored in the order producers call [`ResultAggregator::add`],
//! i.e. probe completion order. That order is not deterministic across runs;
//! only the worst severity is, since it is the max over a total order.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use fleetcheck_core::{Measurement, Severity};

use crate::outcome::{AggregateVerdict, ProbeOutcome};

#[derive(Debug, Default)]
struct Inner {
    worst: Severity,
    outcomes: Vec<ProbeOutcome>,
    measurements: Vec<Measurement>,
}

/// Cloneable handle to a mutex-guarded outcome collection.
#[derive(Debug, Clone, Default)]
pub struct ResultAggregator {
    inner: Arc<Mutex<Inner>>,
}

impl ResultAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one outcome.
    pub fn add(&self, outcome: ProbeOutcome) {
        let mut inner = self.lock();
        inner.worst = inner.worst.worse(outcome.severity());
        inner
            .measurements
            .extend(outcome.measurements().iter().cloned());
        inner.outcomes.push(outcome);
    }

    /// Worst severity recorded so far.
    pub fn worst(&self) -> Severity {
        self.lock().worst
    }

    pub fn len(&self) -> usize {
        self.lock().outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot the collected outcomes as a verdict.
    pub fn to_verdict(&self) -> AggregateVerdict {
        let inner = self.lock();
        AggregateVerdict::from_parts(
            inner.worst,
            inner.outcomes.clone(),
            inner.measurements.clone(),
        )
    }

    // The state is append-only, so a panic mid-`add` cannot leave it
    // inconsistent; keep using it after poisoning.
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
