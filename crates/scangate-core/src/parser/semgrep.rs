use super::RawFinding;
use crate::error::ParseError;
use crate::finding::{Location, SourceTool};
use serde_json::Value;

/// Parser for Semgrep JSON reports (`semgrep --json`).
pub fn parse(raw: &str) -> Result<Vec<RawFinding>, ParseError> {
    let tool = SourceTool::Semgrep;
    let root = super::parse_json_object(tool, raw)?;

    let results = root
        .get("results")
        .and_then(Value::as_array)
        .ok_or_else(|| ParseError::UnexpectedSchema {
            tool,
            detail: "missing 'results' array".to_string(),
        })?;

    let mut findings = Vec::new();

    for result in results {
        let Some(check_id) = result.get("check_id").and_then(Value::as_str) else {
            continue;
        };
        let file = result
            .get("path")
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string();
        let line_start = result
            .get("start")
            .and_then(|s| s.get("line"))
            .and_then(Value::as_u64)
            .map(|l| l as u32);
        let line_end = result
            .get("end")
            .and_then(|e| e.get("line"))
            .and_then(Value::as_u64)
            .map(|l| l as u32);
        let extra = result.get("extra");
        let message = extra
            .and_then(|e| e.get("message"))
            .and_then(Value::as_str)
            .unwrap_or(check_id)
            .to_string();

        findings.push(RawFinding {
            tool,
            rule_id: check_id.to_string(),
            native_severity: extra
                .and_then(|e| e.get("severity"))
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
