//! Log parsing for benchmark driver output.

pub mod error;
pub mod parse;
pub mod pattern;
pub mod row;
pub mod schema;
pub mod throughput;

pub use error::{ParseError, UnrecognizedLine};
pub use parse::{LogParser, ParsedLog, ParserConfig, parse_lines, parse_log_file, parse_str};
pub use pattern::HeaderKind;
pub use row::{ProblemSize, RunRecord};
pub use schema::ColumnRole;
pub use throughput::{ThroughputLog, ThroughputParser, ThroughputRow, parse_throughput_file};
