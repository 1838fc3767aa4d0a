use serde::{Deserialize, Serialize};

use crate::probe::outcome::{OutcomeKind, ProbeOutcome};

/// Outcomes worth handing to reporting, split by purpose.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Findings {
    /// Endpoints that answered with something other than "not found".
    pub interesting: Vec<ProbeOutcome>,
    /// Requests that were skipped or cut short, so analysts can see what
    /// was never checked.
    pub audit: Vec<ProbeOutcome>,
    pub summary: Summary,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub total: usize,
    pub responses: usize,
    pub network_failures: usize,
    pub timeouts: usize,
    pub skipped: usize,
    pub cancelled: usize,
}

/// 2xx, 3xx, 401 and 403.
pub fn is_interesting_status(status: u16) -> bool {
    matches!(status, 200..=399 | 401 | 403)
}

pub fn is_interesting(outcome: &ProbeOutcome) -> bool {
    outcome.status().is_some_and(is_interesting_status)
}

/// Pure reduction over a finished outcome sequence. Input order is kept.
pub fn aggregate(outcomes: &[ProbeOutcome]) -> Findings {
    let mut findings = Findings::default();
    findings.summary.total = outcomes.len();

    for outcome in outcomes {
        match outcome.kind {
            OutcomeKind::Response { .. } => findings.summary.responses += 1,
            OutcomeKind::NetworkFailure { .. } => findings.summary.network_failures += 1,
            OutcomeKind::Timeout => findings.summary.timeouts += 1,
            OutcomeKind::SkippedCapReached => findings.summary.skipped += 1,
            OutcomeKind::Cancelled => findings.summary.cancelled += 1,
        }
        if is_interesting(outcome) {
            findings.interesting.push(outcome.clone());
        } else if outcome.is_audit() {
            findings.audit.push(outcome.clone());
        }
    }
    findings
}
