use chrono::NaiveDate;
use scangate_core::gate::load_policy;
use scangate_core::normalize::Mode;
use scangate_core::runner::{self, RunOutcome};
use scangate_core::{
    aggregate, emit, GatePolicy, GateResult, RunnerOptions, Severity, SourceTool, ToolInput,
};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Workspace root is two levels up from scangate-core's manifest dir.
fn fixtures_dir() -> PathBuf {
    let manifest_dir = env!("CARGO_MANIFEST_DIR");
    Path::new(manifest_dir)
        .parent()
        .unwrap() // crates/
        .parent()
        .unwrap() // workspace root
        .join("tests/fixtures")
}

fn input(tool: SourceTool, file: &str) -> ToolInput {
    ToolInput {
        tool,
        path: fixtures_dir().join(file),
    }
}

fn all_inputs() -> Vec<ToolInput> {
    vec![
        input(SourceTool::Trivy, "trivy.json"),
        input(SourceTool::Grype, "grype.json"),
        input(SourceTool::Checkov, "checkov.json"),
        input(SourceTool::Semgrep, "semgrep.json"),
        input(SourceTool::Gitleaks, "gitleaks.txt"),
        input(SourceTool::Tflint, "tflint.txt"),
        input(SourceTool::AnsibleLint, "ansible-lint.txt"),
    ]
}

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 6, 1).unwrap()
}

async fn ingest(inputs: Vec<ToolInput>) -> RunOutcome {
    let (_tx, rx) = runner::cancellation();
    runner::run(inputs, RunnerOptions::default(), rx)
        .await
        .unwrap()
}

// ─── Correlation scenarios ───

#[tokio::test]
async fn test_trivy_and_grype_report_of_same_cve_merges() {
    let outcome = ingest(vec![
        input(SourceTool::Trivy, "trivy.json"),
        input(SourceTool::Grype, "grype.json"),
    ])
    .await;
    assert!(!outcome.partial);

    let report = aggregate(
        outcome.findings,
        &GatePolicy::default(),
        today(),
        outcome.partial,
        outcome.tool_errors,
        outcome.warnings,
    );

    let cve: Vec<_> = report
        .findings
        .iter()
        .filter(|f| f.rule_id == "CVE-2023-1111")
        .collect();
    assert_eq!(cve.len(), 1, "both tools' reports must merge to one record");
    assert_eq!(
        cve[0].contributing_tools,
        vec![SourceTool::Trivy, SourceTool::Grype]
    );
    // Max of trivy HIGH and grype Critical.
    assert_eq!(cve[0].severity, Severity::Critical);
    assert_eq!(cve[0].secondary_notes.len(), 1);
}

#[tokio::test]
async fn test_full_run_counts() {
    let outcome = ingest(all_inputs()).await;
    assert!(!outcome.partial);
    // 16 raw findings, one cross-tool duplicate.
    assert_eq!(outcome.findings.len(), 16);

    let report = aggregate(
        outcome.findings,
        &GatePolicy::default(),
        today(),
        false,
        BTreeMap::new(),
        Vec::new(),
    );
    assert_eq!(report.findings.len(), 15);
    // Criticals: merged CVE, trivy misconfiguration, two gitleaks secrets.
    assert_eq!(report.count(Severity::Critical), 4);
    assert!(!report.gate_result.passed());
}

#[tokio::test]
async fn test_correlation_is_commutative_over_input_order() {
    let forward = ingest(all_inputs()).await;
    let mut reversed_inputs = all_inputs();
    reversed_inputs.reverse();
    let backward = ingest(reversed_inputs).await;

    let report_a = aggregate(
        forward.findings,
        &GatePolicy::default(),
        today(),
        false,
        BTreeMap::new(),
        Vec::new(),
    );
    let report_b = aggregate(
        backward.findings,
        &GatePolicy::default(),
        today(),
        false,
        BTreeMap::new(),
        Vec::new(),
    );

    assert_eq!(report_a.findings, report_b.findings);
    assert_eq!(report_a.summary_counts, report_b.summary_counts);
    assert_eq!(report_a.gate_result, report_b.gate_result);
}

#[tokio::test]
async fn test_repeated_runs_render_identically_modulo_timestamp() {
    let first = ingest(all_inputs()).await;
    let second = ingest(all_inputs()).await;

    let mut report_a = aggregate(
        first.findings,
        &GatePolicy::default(),
        today(),
        false,
        BTreeMap::new(),
        Vec::new(),
    );
    let report_b = aggregate(
        second.findings,
        &GatePolicy::default(),
        today(),
        false,
        BTreeMap::new(),
        Vec::new(),
    );
    report_a.generated_at = report_b.generated_at;

    assert_eq!(
        emit::json::render(&report_a).unwrap(),
        emit::json::render(&report_b).unwrap()
    );
}

// ─── Policy and gating ───

#[tokio::test]
async fn test_suppression_policy_from_fixture() {
    let policy = load_policy(&fixtures_dir().join("policies/allow-openssl.toml")).unwrap();
    let outcome = ingest(all_inputs()).await;
    let report = aggregate(
        outcome.findings,
        &policy,
        today(),
        false,
        BTreeMap::new(),
        Vec::new(),
    );

    // CVE-2023-1111 by rule id, five path findings under terraform/.
    assert_eq!(report.suppressed_count(), 6);
    // The expired CVE-2023-2650 entry warns and does not suppress.
    assert!(report.warnings.iter().any(|w| w.contains("CVE-2023-2650")));
    assert!(report
        .findings
        .iter()
        .any(|f| f.rule_id == "CVE-2023-2650" && !f.suppressed));
    // Secrets are still critical and fail the severity threshold.
    match &report.gate_result {
        GateResult::Fail { rule, offending } => {
            assert_eq!(rule, "max_severity_allowed");
            assert!(offending.iter().all(|o| !o.contains("CVE-2023-1111")));
        }
        GateResult::Pass => panic!("expected gate failure"),
    }
}

#[tokio::test]
async fn test_gate_passes_when_nothing_above_threshold() {
    let outcome = ingest(vec![
        input(SourceTool::Tflint, "tflint.txt"),
        input(SourceTool::AnsibleLint, "ansible-lint.txt"),
    ])
    .await;
    let report = aggregate(
        outcome.findings,
        &GatePolicy::default(),
        today(),
        false,
        BTreeMap::new(),
        Vec::new(),
    );
    // Highest is High, which equals the default threshold.
    assert!(report.gate_result.passed());
}

#[tokio::test]
async fn test_fail_on_new_secrets_fires_even_below_threshold() {
    let policy = GatePolicy {
        max_severity_allowed: Severity::Critical,
        fail_on_new_secrets: true,
        ..Default::default()
    };
    let outcome = ingest(vec![input(SourceTool::Gitleaks, "gitleaks.txt")]).await;
    let report = aggregate(
        outcome.findings,
        &policy,
        today(),
        false,
        BTreeMap::new(),
        Vec::new(),
    );
    assert!(
        matches!(report.gate_result, GateResult::Fail { ref rule, .. } if rule == "fail_on_new_secrets")
    );
}

#[test]
fn test_broken_policy_is_fatal() {
    let err = load_policy(&fixtures_dir().join("policies/broken.toml"));
    assert!(err.is_err());
}

// ─── Degraded runs ───

#[tokio::test]
async fn test_missing_tool_output_yields_partial_report() {
    let mut inputs = vec![
        input(SourceTool::Trivy, "trivy.json"),
        input(SourceTool::Grype, "grype.json"),
    ];
    inputs.push(ToolInput {
        tool: SourceTool::Semgrep,
        path: fixtures_dir().join("does-not-exist.json"),
    });

    let outcome = ingest(inputs).await;
    assert!(outcome.partial);
    assert!(outcome.tool_errors.contains_key("semgrep"));
    assert!(!outcome.findings.is_empty());

    let report = aggregate(
        outcome.findings,
        &GatePolicy::default(),
        today(),
        outcome.partial,
        outcome.tool_errors,
        outcome.warnings,
    );
    assert!(report.partial);
    // Gate still evaluated against what did arrive.
    assert!(!report.gate_result.passed());
}

#[tokio::test]
async fn test_strict_mode_accepts_well_formed_fixtures() {
    let (_tx, rx) = runner::cancellation();
    let options = RunnerOptions {
        mode: Mode::Strict,
        ..Default::default()
    };
    let outcome = runner::run(all_inputs(), options, rx).await.unwrap();
    assert_eq!(outcome.findings.len(), 16);
}
