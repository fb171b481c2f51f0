use super::RawFinding;
use crate::error::ParseError;
use crate::finding::{Location, SourceTool};
use regex::Regex;
use std::sync::OnceLock;

/// Parser for tflint compact output (`tflint --format compact`):
///
/// ```text
/// main.tf:2:3: Warning - "t1.2xlarge" is an invalid value (aws_instance_invalid_type)
/// ```
pub fn parse(raw: &str) -> Result<Vec<RawFinding>, ParseError> {
    static LINE_RE: OnceLock<Regex> = OnceLock::new();
    let re = LINE_RE.get_or_init(|| {
        Regex::new(
            r"^(?P<file>[^:]+):(?P<line>\d+)(?::\d+)?:\s*(?P<sev>\w+)\s*-\s*(?P<msg>.*?)\s*\((?P<rule>[^()]+)\)\s*$",
        )
        .unwrap()
    });

    let tool = SourceTool::Tflint;
    let mut findings = Vec::new();
    let mut saw_noise = false;

    for line in raw.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let Some(caps) = re.captures(line) else {
            // Summary lines like "3 issue(s) found:" are expected noise.
            saw_noise = true;
            continue;
        };
        let file = caps["file"].to_string();
        let line_no: u32 = caps["line"].parse().map_err(|_| ParseError::Malformed {
            tool,
            detail: format!("bad line number in '{}'", line),
        })?;
        findings.push(RawFinding {
            tool,
            rule_id: caps["rule"].to_string(),
            native_severity: Some(caps["sev"].to_string()),
            location: Location::file_line(file, line_no),
            message: caps["msg"].to_string(),
        });
    }

    if findings.is_empty() && saw_noise && !looks_like_clean_run(raw) {
        return Err(ParseError::UnexpectedSchema {
            tool,
            detail: "no issue lines matched the tflint compact format".to_string(),
        });
    }

    Ok(findings)
}

fn looks_like_clean_run(raw: &str) -> bool {
    raw.contains("0 issue(s)")
}
