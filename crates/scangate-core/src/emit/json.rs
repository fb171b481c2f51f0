use crate::report::AggregatedReport;

/// Render the machine-readable artifact.
///
/// Output is stable for diffing across runs: struct declaration order,
/// BTreeMap counts, pre-sorted findings. Only `generated_at` varies
/// between identical runs.
pub fn render(report: &AggregatedReport) -> serde_json::Result<String> {
    serde_json::to_string_pretty(report)
}
