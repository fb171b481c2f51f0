use super::RawFinding;
use crate::error::ParseError;
use crate::finding::{Location, SourceTool};
use serde_json::Value;

/// Parser for Checkov JSON reports (`checkov -o json`).
///
/// Only `failed_checks` become findings; passed and skipped checks are
/// not issues. Checkov frequently reports `severity: null` on OSS runs,
/// which is treated as a missing severity, not an unknown one.
pub fn parse(raw: &str) -> Result<Vec<RawFinding>, ParseError> {
    let tool = SourceTool::Checkov;
    let root = super::parse_json_object(tool, raw)?;

    let failed = root
        .get("results")
        .and_then(|r| r.get("failed_checks"))
        .and_then(Value::as_array)
        .ok_or_else(|| ParseError::UnexpectedSchema {
            tool,
            detail: "missing 'results.failed_checks' array".to_string(),
        })?;

    let mut findings = Vec::new();

    for check in failed {
        let Some(id) = check.get("check_id").and_then(Value::as_str) else {
            continue;
        };
        let file = check
            .get("file_path")
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string();
        let (line_start, line_end) = match check
            .get("file_line_range")
            .and_then(Value::as_array)
        {
            Some(range) => (
                range.first().and_then(Value::as_u64).map(|l| l as u32),
                range.get(1).and_then(Value::as_u64).map(|l| l as u32),
            ),
            None => (None, None),
        };
        let message = check
            .get("check_name")
            .and_then(Value::as_str)
            .unwrap_or(id)
            .to_string();

        findings.push(RawFinding {
            tool,
            rule_id: id.to_string(),
            native_severity: check
                .get("severity")
                .and_then(Value::as_str)
                .map(str::to_string),
            location: Location::Path {
                file,
                line_start,
                line_end,
            },
            message,
        });
    }

    Ok(findings)
}
