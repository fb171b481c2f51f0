//! Canonicalization of severities, rule ids, and locations.
//!
//! Every tool's native severity scale gets an explicit, total mapping
//! table. An unmapped value is a bug in the table or a tool upgrade:
//! strict mode surfaces it, tolerant mode degrades it to Medium and
//! records a warning so the run still completes.

use crate::error::NormalizeError;
use crate::finding::{Finding, Location, Severity, SourceTool};
use crate::parser::RawFinding;

/// How to treat severity values the mapping tables do not cover.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Degrade unknown severities to Medium with a warning.
    #[default]
    Tolerant,
    /// Fail on unknown severities. For development and tests.
    Strict,
}

/// Map a tool's native severity string onto the shared scale.
///
/// Tables are per-tool and total over each tool's documented scale.
pub fn map_severity(tool: SourceTool, native: &str) -> Option<Severity> {
    let native = native.trim().to_ascii_lowercase();
    match tool {
        SourceTool::Trivy => match native.as_str() {
            "critical" => Some(Severity::Critical),
            "high" => Some(Severity::High),
            "medium" => Some(Severity::Medium),
            "low" => Some(Severity::Low),
            "unknown" => Some(Severity::Medium),
            _ => None,
        },
        SourceTool::Grype => match native.as_str() {
            "critical" => Some(Severity::Critical),
            "high" => Some(Severity::High),
            "medium" => Some(Severity::Medium),
            "low" => Some(Severity::Low),
            "negligible" => Some(Severity::Info),
            "unknown" => Some(Severity::Medium),
            _ => None,
        },
        SourceTool::Checkov => match native.as_str() {
            "critical" => Some(Severity::Critical),
            "high" => Some(Severity::High),
            "medium" => Some(Severity::Medium),
            "low" => Some(Severity::Low),
            "info" => Some(Severity::Info),
            _ => None,
        },
        SourceTool::Semgrep => match native.as_str() {
            "error" => Some(Severity::High),
            "warning" => Some(Severity::Medium),
            "info" => Some(Severity::Info),
            _ => None,
        },
        SourceTool::Tflint => match native.as_str() {
            "error" => Some(Severity::High),
            "warning" => Some(Severity::Medium),
            "notice" => Some(Severity::Info),
            _ => None,
        },
        SourceTool::AnsibleLint => match native.as_str() {
            "blocker" => Some(Severity::Critical),
            "critical" => Some(Severity::High),
            "major" => Some(Severity::Medium),
            "minor" => Some(Severity::Low),
            "info" => Some(Severity::Info),
            _ => None,
        },
        // Gitleaks has no severity scale of its own.
        SourceTool::Gitleaks => None,
    }
}

/// Severity assigned when a tool reports none at all.
///
/// A missing severity is a degraded-but-expected input (Checkov OSS runs
/// report null), not an unknown value, so it never warns. Leaked secrets
/// carry no scale and are always Critical.
pub fn default_severity(tool: SourceTool) -> Severity {
    match tool {
        SourceTool::Gitleaks => Severity::Critical,
        _ => Severity::Medium,
    }
}

/// Normalize one raw finding into the canonical representation.
pub fn normalize(
    raw: RawFinding,
    mode: Mode,
) -> Result<(Finding, Option<String>), NormalizeError> {
    let mut warning = None;

    let severity = match &raw.native_severity {
        Some(native) => match map_severity(raw.tool, native) {
            Some(sev) => sev,
            None => match mode {
                Mode::Strict => {
                    return Err(NormalizeError::UnknownSeverity {
                        tool: raw.tool,
                        value: native.clone(),
                    })
                }
                Mode::Tolerant => {
                    warning = Some(format!(
                        "{}: unknown severity '{}' mapped to medium",
                        raw.tool, native
                    ));
                    Severity::Medium
                }
            },
        },
        None => default_severity(raw.tool),
    };

    let finding = Finding::new(
        raw.tool,
        raw.rule_id.trim(),
        severity,
        canonicalize_location(raw.location),
        raw.message,
    );
    Ok((finding, warning))
}

/// Normalize a whole parse result, collecting degradation warnings.
pub fn normalize_all(
    raws: Vec<RawFinding>,
    mode: Mode,
) -> Result<(Vec<Finding>, Vec<String>), NormalizeError> {
    let mut findings = Vec::with_capacity(raws.len());
    let mut warnings = Vec::new();
    for raw in raws {
        let (finding, warning) = normalize(raw, mode)?;
        findings.push(finding);
        warnings.extend(warning);
    }
    Ok((findings, warnings))
}

/// Rewrite a location into canonical form.
///
/// Paths become repo-relative with forward slashes; package names are
/// lowercased and versions lose tool-specific `v`/`=` prefixes. This is
/// what makes fingerprints line up across tools.
pub fn canonicalize_location(location: Location) -> Location {
    match location {
        Location::Path {
            file,
            line_start,
            line_end,
        } => Location::Path {
            file: canonicalize_path(&file),
            line_start,
            line_end,
        },
        Location::Package {
            name,
            version,
            image,
        } => Location::Package {
            name: name.trim().to_ascii_lowercase(),
            version: canonicalize_version(&version),
            image,
        },
    }
}

fn canonicalize_path(path: &str) -> String {
    let mut path = path.trim().replace('\\', "/");
    while let Some(stripped) = path
        .strip_prefix("./")
        .or_else(|| path.strip_prefix('/'))
    {
        path = stripped.to_string();
    }
    path
}

fn canonicalize_version(version: &str) -> String {
    let version = version.trim();
    version
        .strip_prefix('v')
        .or_else(|| version.strip_prefix('='))
        .unwrap_or(version)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::RawFinding;

    fn raw(tool: SourceTool, severity: Option<&str>) -> RawFinding {
        RawFinding {
            tool,
            rule_id: "CVE-2023-1111".into(),
            native_severity: severity.map(str::to_string),
            location: Location::package("OpenSSL", "v1.1.1"),
            message: "test".into(),
        }
    }

    #[test]
    fn test_known_severity_maps() {
        let (finding, warning) = normalize(raw(SourceTool::Trivy, Some("HIGH")), Mode::Strict).unwrap();
        assert_eq!(finding.severity, Severity::High);
        assert!(warning.is_none());
    }

    #[test]
    fn test_unknown_severity_strict_fails() {
        let err = normalize(raw(SourceTool::Trivy, Some("SEVERE")), Mode::Strict).unwrap_err();
        assert!(matches!(err, NormalizeError::UnknownSeverity { .. }));
    }

    #[test]
    fn test_unknown_severity_tolerant_degrades_to_medium() {
        let (finding, warning) =
            normalize(raw(SourceTool::Trivy, Some("SEVERE")), Mode::Tolerant).unwrap();
        assert_eq!(finding.severity, Severity::Medium);
        assert!(warning.unwrap().contains("SEVERE"));
    }

    #[test]
    fn test_missing_severity_uses_tool_default_without_warning() {
        let (finding, warning) = normalize(raw(SourceTool::Checkov, None), Mode::Strict).unwrap();
        assert_eq!(finding.severity, Severity::Medium);
        assert!(warning.is_none());

        let (finding, _) = normalize(raw(SourceTool::Gitleaks, None), Mode::Strict).unwrap();
        assert_eq!(finding.severity, Severity::Critical);
    }

    #[test]
    fn test_package_canonicalization() {
        let (finding, _) = normalize(raw(SourceTool::Grype, Some("High")), Mode::Strict).unwrap();
        assert_eq!(finding.location, Location::package("openssl", "1.1.1"));
    }

    #[test]
    fn test_path_canonicalization() {
        let loc = canonicalize_location(Location::file("./modules\\vpc/main.tf"));
        assert_eq!(loc, Location::file("modules/vpc/main.tf"));
        let loc = canonicalize_location(Location::file("/s3.tf"));
        assert_eq!(loc, Location::file("s3.tf"));
    }

    #[test]
    fn test_canonical_locations_fingerprint_identically_across_tools() {
        let (trivy, _) = normalize(raw(SourceTool::Trivy, Some("HIGH")), Mode::Strict).unwrap();
        let (grype, _) = normalize(raw(SourceTool::Grype, Some("Critical")), Mode::Strict).unwrap();
        assert_eq!(trivy.fingerprint, grype.fingerprint);
    }

    #[test]
    fn test_semgrep_scale_total() {
        for native in ["ERROR", "WARNING", "INFO"] {
            assert!(map_severity(SourceTool::Semgrep, native).is_some());
        }
    }
}
