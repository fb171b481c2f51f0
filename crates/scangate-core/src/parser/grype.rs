use super::RawFinding;
use crate::error::ParseError;
use crate::finding::{Location, SourceTool};
use serde_json::Value;

/// Parser for Grype JSON reports (`grype sbom:./sbom.json -o json`).
pub fn parse(raw: &str) -> Result<Vec<RawFinding>, ParseError> {
    let tool = SourceTool::Grype;
    let root = super::parse_json_object(tool, raw)?;

    let matches = root
        .get("matches")
        .and_then(Value::as_array)
        .ok_or_else(|| ParseError::UnexpectedSchema {
            tool,
            detail: "missing 'matches' array".to_string(),
        })?;

    let image = root
        .get("source")
        .and_then(|s| s.get("target"))
        .and_then(|t| t.get("userInput"))
        .and_then(Value::as_str)
        .map(str::to_string);

    let mut findings = Vec::new();

    for entry in matches {
        let Some(vuln) = entry.get("vulnerability") else {
            continue;
        };
        let Some(id) = vuln.get("id").and_then(Value::as_str) else {
            continue;
        };
        let artifact = entry.get("artifact");
        let name = artifact
            .and_then(|a| a.get("name"))
            .and_then(Value::as_str)
            .unwrap_or("");
        let version = artifact
            .and_then(|a| a.get("version"))
            .and_then(Value::as_str)
            .unwrap_or("");
        let message = vuln
            .get("description")
            .and_then(Value::as_str)
            .unwrap_or(id)
            .to_string();

        findings.push(RawFinding {
            tool,
            rule_id: id.to_string(),
            native_severity: vuln
                .get("severity")
                .and_then(Value::as_str)
                .map(str::to_string),
            location: Location::Package {
                name: name.to_string(),
                version: version.to_string(),
                image: image.clone(),
            },
            message,
        });
    }

    Ok(findings)
}
