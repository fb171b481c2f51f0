//! Gate policy: suppression and the pass/fail decision.

use crate::error::PolicyError;
use crate::finding::{Finding, Location, Severity, SourceTool};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Gate configuration loaded from `scangate.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatePolicy {
    /// Highest severity that still passes the gate. Anything strictly
    /// above it fails.
    #[serde(default = "default_max_severity")]
    pub max_severity_allowed: Severity,

    /// Fail the gate whenever gitleaks contributed a non-suppressed
    /// finding, regardless of severity threshold.
    #[serde(default)]
    pub fail_on_new_secrets: bool,

    #[serde(default, rename = "ignore")]
    pub ignore_entries: Vec<IgnoreEntry>,
}

fn default_max_severity() -> Severity {
    Severity::High
}

impl Default for GatePolicy {
    fn default() -> Self {
        GatePolicy {
            max_severity_allowed: Severity::High,
            fail_on_new_secrets: false,
            ignore_entries: Vec::new(),
        }
    }
}

/// One suppression rule. Exactly one of the three pattern fields must
/// be set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IgnoreEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_regex: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path_prefix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub justification: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires: Option<NaiveDate>,
}

impl IgnoreEntry {
    fn pattern_display(&self) -> String {
        self.rule_id
            .clone()
            .or_else(|| self.message_regex.clone())
            .or_else(|| self.path_prefix.clone())
            .unwrap_or_else(|| "<empty>".to_string())
    }

    fn validate(&self) -> Result<(), PolicyError> {
        let set = [
            self.rule_id.is_some(),
            self.message_regex.is_some(),
            self.path_prefix.is_some(),
        ]
        .iter()
        .filter(|b| **b)
        .count();
        if set != 1 {
            return Err(PolicyError::InvalidIgnore {
                pattern: self.pattern_display(),
                detail: "exactly one of rule_id, message_regex, path_prefix must be set"
                    .to_string(),
            });
        }
        if let Some(pattern) = &self.message_regex {
            regex::Regex::new(pattern).map_err(|e| PolicyError::InvalidIgnore {
                pattern: pattern.clone(),
                detail: e.to_string(),
            })?;
        }
        Ok(())
    }

    pub fn is_expired(&self, today: NaiveDate) -> bool {
        self.expires.is_some_and(|d| d < today)
    }

    /// Whether this entry matches a finding. Expiry is checked by the
    /// caller; this is pure pattern matching.
    pub fn matches(&self, finding: &Finding) -> bool {
        if let Some(rule_id) = &self.rule_id {
            return finding.rule_id.eq_ignore_ascii_case(rule_id);
        }
        if let Some(pattern) = &self.message_regex {
            // Validated at load time.
            return regex::Regex::new(pattern)
                .map(|re| re.is_match(&finding.message))
                .unwrap_or(false);
        }
        if let Some(prefix) = &self.path_prefix {
            if let Location::Path { file, .. } = &finding.location {
                return file.starts_with(prefix.trim_start_matches("./"));
            }
        }
        false
    }
}

/// The gate verdict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "lowercase")]
pub enum GateResult {
    Pass,
    Fail {
        /// The policy rule that tripped.
        rule: String,
        /// rule_id + location of each offending finding.
        offending: Vec<String>,
    },
}

impl GateResult {
    pub fn passed(&self) -> bool {
        matches!(self, GateResult::Pass)
    }
}

/// Load gate policy from a TOML file. Malformed policy is fatal — a
/// gate cannot safely guess a default for a file that exists but does
/// not parse.
pub fn load_policy(path: &Path) -> Result<GatePolicy, PolicyError> {
    let content = std::fs::read_to_string(path).map_err(|e| PolicyError::Read {
        path: path.display().to_string(),
        source: e,
    })?;
    let policy: GatePolicy = toml::from_str(&content).map_err(|e| PolicyError::Parse {
        path: path.display().to_string(),
        source: e,
    })?;
    for entry in &policy.ignore_entries {
        entry.validate()?;
    }
    Ok(policy)
}

/// Generate a starter policy file.
pub fn generate_default_policy() -> String {
    r#"# scangate gate policy

# Highest severity that still passes the gate.
# One of: info, low, medium, high, critical
max_severity_allowed = "high"

# Fail whenever gitleaks reports a non-suppressed secret.
fail_on_new_secrets = true

# Suppressions. Each entry sets exactly one of:
#   rule_id, message_regex, path_prefix
#
# [[ignore]]
# rule_id = "CVE-2023-1111"
# justification = "fixed upstream, waiting on base image rebuild"
# expires = "2026-10-01"
"#
    .to_string()
}

/// Mark findings matched by a non-expired ignore entry as suppressed.
///
/// Suppressed findings stay in the set for auditability; they are
/// excluded from counts and gate evaluation downstream. Returns
/// warnings for expired entries, which never suppress anything.
pub fn apply_suppressions(
    findings: &mut [Finding],
    policy: &GatePolicy,
    today: NaiveDate,
) -> Vec<String> {
    let mut warnings = Vec::new();
    let mut active = Vec::new();

    for entry in &policy.ignore_entries {
        if entry.is_expired(today) {
            warnings.push(format!(
                "ignore entry '{}' expired on {} and no longer suppresses",
                entry.pattern_display(),
                entry.expires.expect("expired entries have a date"),
            ));
        } else {
            active.push(entry);
        }
    }

    for finding in findings.iter_mut() {
        if active.iter().any(|entry| entry.matches(finding)) {
            finding.suppressed = true;
        }
    }

    warnings
}

/// Compute the gate verdict. Pure function of (findings, policy):
/// deterministic, no side effects, total for well-formed input.
pub fn evaluate(findings: &[Finding], policy: &GatePolicy) -> GateResult {
    let over_threshold: Vec<String> = findings
        .iter()
        .filter(|f| !f.suppressed && f.severity > policy.max_severity_allowed)
        .map(|f| format!("{} at {}", f.rule_id, f.location))
        .collect();
    if !over_threshold.is_empty() {
        return GateResult::Fail {
            rule: "max_severity_allowed".to_string(),
            offending: over_threshold,
        };
    }

    if policy.fail_on_new_secrets {
        let secrets: Vec<String> = findings
            .iter()
            .filter(|f| {
                !f.suppressed && f.contributing_tools.contains(&SourceTool::Gitleaks)
            })
            .map(|f| format!("{} at {}", f.rule_id, f.location))
            .collect();
        if !secrets.is_empty() {
            return GateResult::Fail {
                rule: "fail_on_new_secrets".to_string(),
                offending: secrets,
            };
        }
    }

    GateResult::Pass
}
