//! Per-tool adapters turning native scanner output into raw findings.
//!
//! Each tool gets one submodule; `parse` is the single dispatch point so
//! callers never branch on the tool themselves. JSON tools are parsed
//! through `serde_json::Value` so a scanner omitting an optional field
//! degrades the location granularity instead of failing the whole parse.

pub mod ansible_lint;
pub mod checkov;
pub mod gitleaks;
pub mod grype;
pub mod semgrep;
pub mod tflint;
pub mod trivy;

use crate::error::ParseError;
use crate::finding::{Location, SourceTool};

/// A finding as reported by a tool, before severity mapping and
/// location canonicalization.
#[derive(Debug, Clone, PartialEq)]
pub struct RawFinding {
    pub tool: SourceTool,
    pub rule_id: String,
    /// The tool's own severity string, if it reported one.
    pub native_severity: Option<String>,
    pub location: Location,
    pub message: String,
}

/// Parse a tool's raw output into findings.
pub fn parse(tool: SourceTool, raw: &str) -> Result<Vec<RawFinding>, ParseError> {
    if raw.trim().is_empty() {
        return Err(ParseError::Empty { tool });
    }
    match tool {
        SourceTool::Trivy => trivy::parse(raw),
        SourceTool::Grype => grype::parse(raw),
        SourceTool::Checkov => checkov::parse(raw),
        SourceTool::Semgrep => semgrep::parse(raw),
        SourceTool::Gitleaks => gitleaks::parse(raw),
        SourceTool::Tflint => tflint::parse(raw),
        SourceTool::AnsibleLint => ansible_lint::parse(raw),
    }
}

/// Parse JSON output and require a top-level object.
pub(crate) fn parse_json_object(
    tool: SourceTool,
    raw: &str,
) -> Result<serde_json::Value, ParseError> {
    let value: serde_json::Value =
        serde_json::from_str(raw).map_err(|e| ParseError::Malformed {
            tool,
            detail: e.to_string(),
        })?;
    if !value.is_object() {
        return Err(ParseError::UnexpectedSchema {
            tool,
            detail: "expected a top-level JSON object".to_string(),
        });
    }
    Ok(value)
}
