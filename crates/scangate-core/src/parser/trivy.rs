use super::RawFinding;
use crate::error::ParseError;
use crate::finding::{Location, SourceTool};
use serde_json::Value;

/// Parser for Trivy JSON reports (`trivy image --format json`,
/// `trivy config --format json`).
///
/// Vulnerability entries become package locations tagged with the
/// scanned artifact; misconfiguration entries become path locations.
pub fn parse(raw: &str) -> Result<Vec<RawFinding>, ParseError> {
    let tool = SourceTool::Trivy;
    let root = super::parse_json_object(tool, raw)?;

    let results = match root.get("Results").and_then(Value::as_array) {
        Some(results) => results,
        // A clean scan emits no Results key at all.
        None => return Ok(Vec::new()),
    };

    let artifact = root
        .get("ArtifactName")
        .and_then(Value::as_str)
        .map(str::to_string);

    let mut findings = Vec::new();

    for result in results {
        let target = result.get("Target").and_then(Value::as_str).unwrap_or("");

        if let Some(vulns) = result.get("Vulnerabilities").and_then(Value::as_array) {
            for vuln in vulns {
                let Some(id) = vuln.get("VulnerabilityID").and_then(Value::as_str) else {
                    continue;
                };
                let pkg = vuln.get("PkgName").and_then(Value::as_str).unwrap_or("");
                let version = vuln
                    .get("InstalledVersion")
                    .and_then(Value::as_str)
                    .unwrap_or("");
                let message = vuln
                    .get("Title")
                    .or_else(|| vuln.get("Description"))
                    .and_then(Value::as_str)
                    .unwrap_or(id)
                    .to_string();

                findings.push(RawFinding {
                    tool,
                    rule_id: id.to_string(),
                    native_severity: vuln
                        .get("Severity")
                        .and_then(Value::as_str)
                        .map(str::to_string),
                    location: Location::Package {
                        name: pkg.to_string(),
                        version: version.to_string(),
                        image: artifact.clone(),
                    },
                    message,
                });
            }
        }

        if let Some(misconfigs) = result.get("Misconfigurations").and_then(Value::as_array) {
            for misconf in misconfigs {
                let Some(id) = misconf.get("ID").and_then(Value::as_str) else {
                    continue;
                };
                let start = misconf
                    .get("CauseMetadata")
                    .and_then(|m| m.get("StartLine"))
                    .and_then(Value::as_u64)
                    .map(|l| l as u32);
                let end = misconf
                    .get("CauseMetadata")
                    .and_then(|m| m.get("EndLine"))
                    .and_then(Value::as_u64)
                    .map(|l| l as u32);
                let message = misconf
                    .get("Message")
                    .or_else(|| misconf.get("Title"))
                    .and_then(Value::as_str)
                    .unwrap_or(id)
                    .to_string();

                findings.push(RawFinding {
                    tool,
                    rule_id: id.to_string(),
                    native_severity: misconf
                        .get("Severity")
                        .and_then(Value::as_str)
                        .map(str::to_string),
                    location: Location::Path {
                        file: target.to_string(),
                        line_start: start,
                        line_end: end,
                    },
                    message,
                });
            }
        }
    }

    Ok(findings)
}

#[cfg(test)]
mod tests {
    use super::*;

    const VULN_REPORT: &str = r#"{
        "ArtifactName": "alpine:3.18",
        "Results": [{
            "Target": "alpine:3.18 (alpine 3.18.0)",
            "Vulnerabilities": [{
                "VulnerabilityID": "CVE-2023-1111",
                "PkgName": "openssl",
                "InstalledVersion": "1.1.1t-r0",
                "Severity": "HIGH",
                "Title": "openssl: X.400 address type confusion"
            }]
        }]
    }"#;

    #[test]
    fn test_parse_vulnerabilities() {
        let findings = parse(VULN_REPORT).unwrap();
        assert_eq!(findings.len(), 1);
        let f = &findings[0];
        assert_eq!(f.rule_id, "CVE-2023-1111");
        assert_eq!(f.native_severity.as_deref(), Some("HIGH"));
        assert_eq!(
            f.location,
            Location::Package {
                name: "openssl".into(),
                version: "1.1.1t-r0".into(),
                image: Some("alpine:3.18".into()),
            }
        );
    }

    #[test]
    fn test_parse_misconfigurations() {
        let raw = r#"{
            "Results": [{
                "Target": "main.tf",
                "Misconfigurations": [{
                    "ID": "AVD-AWS-0107",
                    "Severity": "CRITICAL",
                    "Message": "Security group allows ingress from 0.0.0.0/0",
                    "CauseMetadata": {"StartLine": 12, "EndLine": 18}
                }]
            }]
        }"#;
        let findings = parse(raw).unwrap();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].rule_id, "AVD-AWS-0107");
        assert_eq!(
            findings[0].location,
            Location::Path {
                file: "main.tf".into(),
                line_start: Some(12),
                line_end: Some(18),
            }
        );
    }

    #[test]
    fn test_missing_line_degrades_to_file_only() {
        let raw = r#"{
            "Results": [{
                "Target": "main.tf",
                "Misconfigurations": [{"ID": "AVD-AWS-0001", "Severity": "LOW"}]
            }]
        }"#;
        let findings = parse(raw).unwrap();
        assert_eq!(
            findings[0].location,
            Location::Path {
                file: "main.tf".into(),
                line_start: None,
                line_end: None,
            }
        );
    }

    #[test]
    fn test_clean_scan_has_no_findings() {
        let findings = parse(r#"{"ArtifactName": "alpine:3.18"}"#).unwrap();
        assert!(findings.is_empty());
    }
}
