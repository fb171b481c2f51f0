use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

/// A scanner whose output scangate knows how to ingest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceTool {
    Tflint,
    AnsibleLint,
    Trivy,
    Checkov,
    Semgrep,
    Gitleaks,
    Grype,
}

impl SourceTool {
    pub const ALL: &'static [SourceTool] = &[
        SourceTool::Tflint,
        SourceTool::AnsibleLint,
        SourceTool::Trivy,
        SourceTool::Checkov,
        SourceTool::Semgrep,
        SourceTool::Gitleaks,
        SourceTool::Grype,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            SourceTool::Tflint => "tflint",
            SourceTool::AnsibleLint => "ansible-lint",
            SourceTool::Trivy => "trivy",
            SourceTool::Checkov => "checkov",
            SourceTool::Semgrep => "semgrep",
            SourceTool::Gitleaks => "gitleaks",
            SourceTool::Grype => "grype",
        }
    }
}

impl fmt::Display for SourceTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for SourceTool {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "tflint" => Ok(SourceTool::Tflint),
            "ansible-lint" | "ansible_lint" | "ansiblelint" => Ok(SourceTool::AnsibleLint),
            "trivy" => Ok(SourceTool::Trivy),
            "checkov" => Ok(SourceTool::Checkov),
            "semgrep" => Ok(SourceTool::Semgrep),
            "gitleaks" => Ok(SourceTool::Gitleaks),
            "grype" => Ok(SourceTool::Grype),
            other => Err(format!("unknown tool '{}'", other)),
        }
    }
}

/// Shared severity scale every tool's native scale maps onto.
///
/// Ordering is total and fixed: Info < Low < Medium < High < Critical.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub const ALL_DESC: &'static [Severity] = &[
        Severity::Critical,
        Severity::High,
        Severity::Medium,
        Severity::Low,
        Severity::Info,
    ];

    pub fn symbol(&self) -> &'static str {
        match self {
            Severity::Critical => "CRITICAL",
            Severity::High => "HIGH",
            Severity::Medium => "MEDIUM",
            Severity::Low => "LOW",
            Severity::Info => "INFO",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "info" => Ok(Severity::Info),
            "low" => Ok(Severity::Low),
            "medium" => Ok(Severity::Medium),
            "high" => Ok(Severity::High),
            "critical" => Ok(Severity::Critical),
            other => Err(format!("unknown severity '{}'", other)),
        }
    }
}

/// Where a finding points: a spot in the scanned tree, or a package
/// inside an image/SBOM.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Location {
    Path {
        file: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        line_start: Option<u32>,
        #[serde(skip_serializing_if = "Option::is_none")]
        line_end: Option<u32>,
    },
    Package {
        name: String,
        version: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        image: Option<String>,
    },
}

impl Location {
    pub fn file(file: impl Into<String>) -> Self {
        Location::Path {
            file: file.into(),
            line_start: None,
            line_end: None,
        }
    }

    pub fn file_line(file: impl Into<String>, line: u32) -> Self {
        Location::Path {
            file: file.into(),
            line_start: Some(line),
            line_end: None,
        }
    }

    pub fn package(name: impl Into<String>, version: impl Into<String>) -> Self {
        Location::Package {
            name: name.into(),
            version: version.into(),
            image: None,
        }
    }

    /// Stable string used for fingerprinting.
    ///
    /// Line numbers are excluded: edits shift lines without changing the
    /// underlying issue, and the same secret reported at two offsets by
    /// two tools must still collapse to one record. Image digests are
    /// excluded for the same reason — the same CVE on the same package
    /// seen through an image scan and through an SBOM scan is one issue.
    pub fn canonical_key(&self) -> String {
        match self {
            Location::Path { file, .. } => format!("path:{}", file),
            Location::Package { name, version, .. } => {
                format!("pkg:{}@{}", name, version)
            }
        }
    }

    pub fn display_short(&self) -> String {
        match self {
            Location::Path {
                file, line_start, ..
            } => match line_start {
                Some(line) => format!("{}:{}", file, line),
                None => file.clone(),
            },
            Location::Package {
                name,
                version,
                image,
            } => match image {
                Some(img) => format!("{}@{} ({})", name, version, img),
                None => format!("{}@{}", name, version),
            },
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_short())
    }
}

/// One reported issue, in the shared representation every parser emits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub source_tool: SourceTool,
    pub rule_id: String,
    pub severity: Severity,
    pub location: Location,
    pub message: String,
    /// Messages from other tools merged into this record.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub secondary_notes: Vec<String>,
    /// All tools that reported this issue. Always contains `source_tool`.
    pub contributing_tools: Vec<SourceTool>,
    pub suppressed: bool,
    pub fingerprint: String,
}

impl Finding {
    pub fn new(
        source_tool: SourceTool,
        rule_id: impl Into<String>,
        severity: Severity,
        location: Location,
        message: impl Into<String>,
    ) -> Self {
        let rule_id = rule_id.into();
        let fingerprint = compute_fingerprint(&rule_id, &location);
        Finding {
            source_tool,
            rule_id,
            severity,
            location,
            message: message.into(),
            secondary_notes: Vec::new(),
            contributing_tools: vec![source_tool],
            suppressed: false,
            fingerprint,
        }
    }

    /// Recompute the fingerprint after rule_id or location changed.
    pub fn refresh_fingerprint(&mut self) {
        self.fingerprint = compute_fingerprint(&self.rule_id, &self.location);
    }
}

/// SHA-256 hex digest over the normalized rule id and canonical location.
///
/// Pure function of its inputs: identical (rule_id, location) pairs
/// always fingerprint identically, across tools and across runs.
pub fn compute_fingerprint(rule_id: &str, location: &Location) -> String {
    let mut hasher = Sha256::new();
    hasher.update(rule_id.trim().as_bytes());
    hasher.update(b"\x1f");
    hasher.update(location.canonical_key().as_bytes());
    hex::encode(hasher.finalize())
}
