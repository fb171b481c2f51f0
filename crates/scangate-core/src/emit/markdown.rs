use crate::finding::Severity;
use crate::gate::GateResult;
use crate::report::AggregatedReport;
use std::fmt::Write;

/// Render the condensed summary posted as a single merge-request
/// comment: verdict, counts, findings grouped by severity descending,
/// suppressed findings in a collapsed audit section.
pub fn render(report: &AggregatedReport) -> String {
    let mut out = String::new();

    match &report.gate_result {
        GateResult::Pass => {
            let _ = writeln!(out, "## :white_check_mark: Security gate: PASS");
        }
        GateResult::Fail { rule, offending } => {
            let _ = writeln!(out, "## :no_entry: Security gate: FAIL");
            let _ = writeln!(out);
            let _ = writeln!(out, "Failed policy rule: `{}`", rule);
            for item in offending {
                let _ = writeln!(out, "- {}", item);
            }
        }
    }
    let _ = writeln!(out);

    if report.partial {
        let _ = writeln!(
            out,
            "> :warning: **Partial run** — some tools did not contribute:"
        );
        for (tool, error) in &report.tool_errors {
            let _ = writeln!(out, "> - `{}`: {}", tool, error);
        }
        let _ = writeln!(out);
    }

    let _ = writeln!(out, "| Severity | Open findings |");
    let _ = writeln!(out, "| --- | ---: |");
    for severity in Severity::ALL_DESC {
        let _ = writeln!(out, "| {} | {} |", severity.symbol(), report.count(*severity));
    }
    let _ = writeln!(out);

    let active: Vec<_> = report.findings.iter().filter(|f| !f.suppressed).collect();
    if active.is_empty() {
        let _ = writeln!(out, "No open findings.");
    } else {
        for severity in Severity::ALL_DESC {
            let at_level: Vec<_> = active
                .iter()
                .filter(|f| f.severity == *severity)
                .collect();
            if at_level.is_empty() {
                continue;
            }
            let _ = writeln!(out, "### {}", severity.symbol());
            for finding in at_level {
                let tools: Vec<&str> = finding
                    .contributing_tools
                    .iter()
                    .map(|t| t.label())
                    .collect();
                let _ = writeln!(
                    out,
                    "- `{}` at `{}` ({}) — {}",
                    finding.rule_id,
                    finding.location,
                    tools.join(", "),
                    finding.message
                );
            }
            let _ = writeln!(out);
        }
    }

    let suppressed: Vec<_> = report.findings.iter().filter(|f| f.suppressed).collect();
    if !suppressed.is_empty() {
        let _ = writeln!(out, "<details>");
        let _ = writeln!(
            out,
            "<summary>Suppressed findings ({})</summary>",
            suppressed.len()
        );
        let _ = writeln!(out);
        for finding in suppressed {
            let _ = writeln!(
                out,
                "- `{}` at `{}` ({})",
                finding.rule_id,
                finding.location,
                finding.severity.symbol()
            );
        }
        let _ = writeln!(out);
        let _ = writeln!(out, "</details>");
        let _ = writeln!(out);
    }

    if !report.warnings.is_empty() {
        let _ = writeln!(out, "**Warnings**");
        for warning in &report.warnings {
            let _ = writeln!(out, "- {}", warning);
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::finding::{Finding, Location, SourceTool};
    use crate::gate::{GatePolicy, IgnoreEntry};
    use crate::report::aggregate;
    use chrono::NaiveDate;
    use std::collections::BTreeMap;

    fn build_report(policy: &GatePolicy) -> AggregatedReport {
        aggregate(
            vec![
                Finding::new(
                    SourceTool::Trivy,
                    "CVE-2023-1111",
                    Severity::Critical,
                    Location::package("openssl", "1.1.1"),
                    "openssl vuln",
                ),
                Finding::new(
                    SourceTool::Grype,
                    "CVE-2023-1111",
                    Severity::High,
                    Location::package("openssl", "1.1.1"),
                    "same vuln",
                ),
            ],
            policy,
            NaiveDate::from_ymd_opt(2026, 6, 1).unwrap(),
            false,
            BTreeMap::new(),
            Vec::new(),
        )
    }

    #[test]
    fn test_fail_verdict_names_rule_and_finding() {
        let md = render(&build_report(&GatePolicy::default()));
        assert!(md.contains("Security gate: FAIL"));
        assert!(md.contains("`max_severity_allowed`"));
        assert!(md.contains("CVE-2023-1111"));
    }

    #[test]
    fn test_merged_finding_lists_both_tools() {
        let md = render(&build_report(&GatePolicy::default()));
        assert!(md.contains("trivy, grype"));
    }

    #[test]
    fn test_suppressed_section() {
        let policy = GatePolicy {
            ignore_entries: vec![IgnoreEntry {
                rule_id: Some("CVE-2023-1111".into()),
                message_regex: None,
                path_prefix: None,
                justification: None,
                expires: None,
            }],
            ..Default::default()
        };
        let md = render(&build_report(&policy));
        assert!(md.contains("Security gate: PASS"));
        assert!(md.contains("Suppressed findings (1)"));
    }

    #[test]
    fn test_render_does_not_mutate() {
        let report = build_report(&GatePolicy::default());
        let first = render(&report);
        let second = render(&report);
        assert_eq!(first, second);
    }

    #[test]
    fn test_partial_note() {
        let mut report = build_report(&GatePolicy::default());
        report.partial = true;
        report
            .tool_errors
            .insert("semgrep".into(), "parse timed out after 30s".into());
        let md = render(&report);
        assert!(md.contains("Partial run"));
        assert!(md.contains("semgrep"));
    }
}
