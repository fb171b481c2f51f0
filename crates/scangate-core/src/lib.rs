pub mod correlate;
pub mod emit;
pub mod error;
pub mod finding;
pub mod gate;
pub mod normalize;
pub mod parser;
pub mod report;
pub mod runner;

pub use error::{NormalizeError, ParseError, PolicyError};
pub use finding::{Finding, Location, Severity, SourceTool};
pub use gate::{GatePolicy, GateResult, IgnoreEntry};
pub use report::{aggregate, AggregatedReport};
pub use runner::{RunOutcome, RunnerOptions, ToolInput};
