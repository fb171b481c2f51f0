use crate::finding::SourceTool;
use thiserror::Error;

/// A tool's output could not be turned into findings.
///
/// Parse errors are always recovered locally: the tool contributes
/// nothing, the run is marked partial, and aggregation continues with
/// whatever the other tools produced.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("malformed {tool} output: {detail}")]
    Malformed { tool: SourceTool, detail: String },

    #[error("{tool} output has an unexpected shape: {detail}")]
    UnexpectedSchema { tool: SourceTool, detail: String },

    #[error("{tool} output is empty")]
    Empty { tool: SourceTool },

    #[error("{tool} parse timed out after {seconds}s")]
    Timeout { tool: SourceTool, seconds: u64 },
}

impl ParseError {
    pub fn tool(&self) -> SourceTool {
        match self {
            ParseError::Malformed { tool, .. }
            | ParseError::UnexpectedSchema { tool, .. }
            | ParseError::Empty { tool }
            | ParseError::Timeout { tool, .. } => *tool,
        }
    }
}

/// Normalization failure. Only surfaced in strict mode; tolerant mode
/// degrades unknown severities to Medium with a warning instead.
#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("{tool} reported unknown severity '{value}'")]
    UnknownSeverity { tool: SourceTool, value: String },
}

/// Gate policy problems are fatal: a gate cannot safely default.
#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("failed to read policy file '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse policy file '{path}': {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid ignore entry '{pattern}': {detail}")]
    InvalidIgnore { pattern: String, detail: String },
}
