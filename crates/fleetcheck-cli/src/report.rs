//! Nagios plugin output.
//!
//! ```text
//! CRITICAL: 2 instances of foo found | instances=2
//! status code: 200, duration: 3 ms, endpoint: http://10.0.0.1:8080/health
//! status code: 503, duration: 5 ms, endpoint: http://10.0.0.2:8080/health
//! ```

use std::fmt::Write;

use fleetcheck_health::AggregateVerdict;

/// Render `verdict` as plugin output: a status line, then one line per
/// remaining outcome message.
pub fn render(verdict: &AggregateVerdict) -> String {
    let mut messages = verdict.messages();
    let first = messages.next().unwrap_or("no results");

    let mut out = format!("{}: {first}", verdict.severity().label());
    if !verdict.measurements().is_empty() {
        out.push_str(" |");
        for m in verdict.measurements() {
            let _ = write!(out, " {m}");
        }
    }
    out.push('\n');

    for message in messages {
        out.push_str(message);
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleetcheck_core::{Measurement, Severity};
    use fleetcheck_health::{ProbeOutcome, ResultAggregator};

    #[test]
    fn status_line_carries_perfdata_then_long_output() {
        let acc = ResultAggregator::new();
        acc.add(
            ProbeOutcome::new(Severity::Ok, "2 instances of foo found")
                .with_measurement(Measurement::new("instances", 2.0, "")),
        );
        acc.add(ProbeOutcome::new(Severity::Ok, "status code: 200"));
        acc.add(ProbeOutcome::new(Severity::Crit, "status code: 503"));

        assert_eq!(
            render(&acc.to_verdict()),
            "CRITICAL: 2 instances of foo found | instances=2\n\
             status code: 200\n\
             status code: 503\n"
        );
    }

    #[test]
    fn unknown_verdict_is_a_single_line() {
        let verdict = AggregateVerdict::unknown("failed to fetch discovery state: refused");
        assert_eq!(
            render(&verdict),
            "UNKNOWN: failed to fetch discovery state: refused\n"
        );
    }

    #[test]
    fn empty_verdict_still_renders() {
        assert_eq!(render(&AggregateVerdict::default()), "OK: no results\n");
    }
}
