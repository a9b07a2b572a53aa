//! Check outcomes and the aggregate verdict.

use fleetcheck_core::{Announcement, Measurement, Severity};

/// Result of the quota evaluation or of one health probe.
///
/// Immutable once built, except for the reconciliation downgrade.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeOutcome {
    severity: Severity,
    message: String,
    measurements: Vec<Measurement>,
    /// Originating announcement. `None` for the quota outcome.
    announcement: Option<Announcement>,
}

impl ProbeOutcome {
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
            measurements: Vec::new(),
            announcement: None,
        }
    }

    pub fn with_measurement(mut self, measurement: Measurement) -> Self {
        self.measurements.push(measurement);
        self
    }

    pub fn for_announcement(mut self, announcement: Announcement) -> Self {
        self.announcement = Some(announcement);
        self
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn measurements(&self) -> &[Measurement] {
        &self.measurements
    }

    pub fn announcement(&self) -> Option<&Announcement> {
        self.announcement.as_ref()
    }

    /// Lower the severity and note why on the message.
    pub(crate) fn downgrade(&mut self, severity: Severity, annotation: &str) {
        self.severity = severity;
        self.message.push(' ');
        self.message.push_str(annotation);
    }
}

/// Final result of a run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregateVerdict {
    severity: Severity,
    outcomes: Vec<ProbeOutcome>,
    measurements: Vec<Measurement>,
}

impl AggregateVerdict {
    pub(crate) fn from_parts(
        severity: Severity,
        outcomes: Vec<ProbeOutcome>,
        measurements: Vec<Measurement>,
    ) -> Self {
        Self {
            severity,
            outcomes,
            measurements,
        }
    }

    /// A verdict for a run that could not be evaluated.
    pub fn unknown(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Unknown,
            outcomes: vec![ProbeOutcome::new(Severity::Unknown, message)],
            measurements: Vec::new(),
        }
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    /// Outcomes in the order they were recorded.
    pub fn outcomes(&self) -> &[ProbeOutcome] {
        &self.outcomes
    }

    pub fn messages(&self) -> impl Iterator<Item = &str> {
        self.outcomes.iter().map(ProbeOutcome::message)
    }

    pub fn measurements(&self) -> &[Measurement] {
        &self.measurements
    }

    pub(crate) fn outcomes_mut(&mut self) -> &mut [ProbeOutcome] {
        &mut self.outcomes
    }

    pub(crate) fn push(&mut self, outcome: ProbeOutcome) {
        self.severity = self.severity.worse(outcome.severity);
        self.measurements.extend(outcome.measurements.iter().cloned());
        self.outcomes.push(outcome);
    }

    /// Recompute the severity as the max over the current outcomes.
    pub(crate) fn recompute(&mut self) {
        self.severity = self
            .outcomes
            .iter()
            .map(ProbeOutcome::severity)
            .max()
            .unwrap_or_default();
    }
}
