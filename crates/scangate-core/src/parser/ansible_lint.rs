use super::RawFinding;
use crate::error::ParseError;
use crate::finding::{Location, SourceTool};
use regex::Regex;
use std::sync::OnceLock;

/// Parser for ansible-lint pep8-style output (`ansible-lint -p`):
///
/// ```text
/// playbook.yml:17: risky-file-permissions File permissions unset or incorrect
/// ```
///
/// Newer releases append a severity tag in brackets
/// (`... incorrect [major]`), which is picked up when present.
pub fn parse(raw: &str) -> Result<Vec<RawFinding>, ParseError> {
    static LINE_RE: OnceLock<Regex> = OnceLock::new();
    let re = LINE_RE.get_or_init(|| {
        Regex::new(r"^(?P<file>[^:\s][^:]*):(?P<line>\d+):\s*(?P<rule>[\w\[\]-]+)\s+(?P<msg>.*)$")
            .unwrap()
    });
    static SEV_RE: OnceLock<Regex> = OnceLock::new();
    let sev_re =
        SEV_RE.get_or_init(|| Regex::new(r"\s*\[(?P<sev>blocker|critical|major|minor|info)\]\s*$").unwrap());

    let tool = SourceTool::AnsibleLint;
    let mut findings = Vec::new();
    let mut saw_noise = false;

    for line in raw.lines() {
        let line = line.trim_end();
        if line.trim().is_empty() {
            continue;
        }
        let Some(caps) = re.captures(line) else {
            saw_noise = true;
            continue;
        };
        let line_no: u32 = caps["line"].parse().map_err(|_| ParseError::Malformed {
            tool,
            detail: format!("bad line number in '{}'", line),
        })?;

        let mut message = caps["msg"].to_string();
        let native_severity = sev_re
            .captures(&message)
            .map(|sev_caps| sev_caps["sev"].to_string());
        if native_severity.is_some() {
            message = sev_re.replace(&message, "").to_string();
        }

        findings.push(RawFinding {
            tool,
            rule_id: caps["rule"].to_string(),
            native_severity,
            location: Location::file_line(caps["file"].to_string(), line_no),
            message,
        });
    }

    if findings.is_empty() && saw_noise {
        return Err(ParseError::UnexpectedSchema {
            tool,
            detail: "no lines matched the ansible-lint pep8 format".to_string(),
        });
    }

    Ok(findings)
}
