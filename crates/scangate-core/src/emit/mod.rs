//! Report rendering. Emission never mutates the report; any number of
//! formats can be produced from one in-memory report.

pub mod json;
pub mod markdown;
