use crate::correlate::correlate;
use crate::finding::{Finding, Severity};
use crate::gate::{apply_suppressions, evaluate, GatePolicy, GateResult};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The unified output of one pipeline run.
///
/// Field order is the serialization order; findings arrive pre-sorted
/// from the correlator and counts live in a BTreeMap, so two runs over
/// identical inputs serialize byte-identically apart from
/// `generated_at`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatedReport {
    pub generated_at: DateTime<Utc>,
    /// True when at least one tool's output could not be ingested.
    pub partial: bool,
    pub gate_result: GateResult,
    /// Non-suppressed findings per severity.
    pub summary_counts: BTreeMap<Severity, usize>,
    /// Deduplicated findings, severity descending. Suppressed findings
    /// are retained here for audit.
    pub findings: Vec<Finding>,
    /// Tools whose output failed to parse or timed out.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tool_errors: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl AggregatedReport {
    pub fn total_active(&self) -> usize {
        self.summary_counts.values().sum()
    }

    pub fn suppressed_count(&self) -> usize {
        self.findings.iter().filter(|f| f.suppressed).count()
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.summary_counts.get(&severity).copied().unwrap_or(0)
    }
}

/// Run the aggregation pipeline over normalized findings: correlate,
/// suppress, count, gate.
///
/// `today` is supplied by the caller (ignore-entry expiry must not
/// depend on hidden clock reads); `partial`, `tool_errors` and
/// `warnings` carry what the parse phase already knows.
pub fn aggregate(
    findings: Vec<Finding>,
    policy: &GatePolicy,
    today: NaiveDate,
    partial: bool,
    tool_errors: BTreeMap<String, String>,
    mut warnings: Vec<String>,
) -> AggregatedReport {
    let mut findings = correlate(findings);
    warnings.extend(apply_suppressions(&mut findings, policy, today));

    let mut summary_counts = BTreeMap::new();
    for finding in findings.iter().filter(|f| !f.suppressed) {
        *summary_counts.entry(finding.severity).or_insert(0) += 1;
    }

    let gate_result = evaluate(&findings, policy);

    AggregatedReport {
        generated_at: Utc::now(),
        partial,
        gate_result,
        summary_counts,
        findings,
        tool_errors,
        warnings,
    }
}
