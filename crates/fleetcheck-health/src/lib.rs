//! fleetcheck-health — the evaluation engine behind `fleetcheck`.
//!
//! A run checks one service type against a discovery snapshot and folds
//! every finding into a single worst-case [`Severity`].
//!
//! # Architecture
//!
//! ```text
//! ServiceCheck::run
//!   ├── AnnouncementSource::fetch()         (initial snapshot)
//!   ├── quota::evaluate_quota()             → 1 ProbeOutcome
//!   ├── HealthProber::probe_all()           → 1 ProbeOutcome per announcement
//!   │     └── one task per announcement, joined before continuing
//!   ├── ResultAggregator                    (shared, mutex-guarded sink)
//!   └── ReconciliationGuard::reconcile()    (only when the verdict is CRIT)
//!         └── AnnouncementSource::fetch()   (fresh snapshot)
//! ```
//!
//! # Reconciliation
//!
//! Instances that deregister while being probed tend to fail their probe.
//! Before a CRIT verdict is final, the critical outcomes are re-checked
//! against a fresh snapshot; those whose announcement has disappeared are
//! downgraded to WARN. If the fresh fetch fails, nothing is downgraded.
//!
//! [`Severity`]: fleetcheck_core::Severity

pub mod aggregator;
mod cancel;
pub mod check;
pub mod outcome;
pub mod prober;
pub mod quota;
pub mod reconcile;

pub use aggregator::ResultAggregator;
pub use check::{RunPhase, ServiceCheck};
pub use outcome::{AggregateVerdict, ProbeOutcome};
pub use prober::{HealthProber, ProbeResult, USER_AGENT};
pub use quota::{count_instances, evaluate_quota};
pub use reconcile::{Reconciliation, ReconciliationGuard};
