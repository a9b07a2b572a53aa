//! Instance quota evaluation.

use std::collections::HashSet;

use fleetcheck_core::{Announcement, Measurement, Severity, Thresholds};

use crate::outcome::ProbeOutcome;

/// Count distinct instances.
///
/// Announcements without a dedup token always count. Announcements that
/// share a token count once.
pub fn count_instances(announcements: &[Announcement]) -> usize {
    let mut seen = HashSet::new();
    announcements
        .iter()
        .filter(|a| match a.server_token() {
            Some(token) => seen.insert(token),
            None => true,
        })
        .count()
}

/// Classify the instance count of `service` against the thresholds.
///
/// `announcements` must already be filtered to `service`.
pub fn evaluate_quota(
    service: &str,
    announcements: &[Announcement],
    thresholds: Thresholds,
) -> ProbeOutcome {
    let count = count_instances(announcements);
    let n = count as u64;

    let (severity, message) = if thresholds.crit > 0 && n < u64::from(thresholds.crit) {
        (
            Severity::Crit,
            format!(
                "{count} instances of {service} found, expected at least {}",
                thresholds.crit
            ),
        )
    } else if thresholds.warn > 0 && n < u64::from(thresholds.warn) {
        (
            Severity::Warn,
            format!(
                "{count} instances of {service} found, expected at least {}",
                thresholds.warn
            ),
        )
    } else {
        (Severity::Ok, format!("{count} instances of {service} found"))
    };

    ProbeOutcome::new(severity, message)
        .with_measurement(Measurement::new("instances", count as f64, ""))
}
