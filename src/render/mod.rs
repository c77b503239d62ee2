//! Export of record sets as delimited text or JSON.

pub mod csv;
pub mod json;

pub use self::csv::{write_best, write_derived, write_run_records, write_throughput};
pub use self::json::render_json;

use serde::Deserialize;

/// Column names and sentinel texts used by the CSV export.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct OutputColumns {
    pub problem_size: String,
    pub thread_count: String,
    pub policy: String,
    pub phase: String,
    pub metric_value: String,
    pub mean_value: String,
    pub samples: String,
    pub speedup: String,
    pub efficiency: String,
    pub serial_fraction: String,
    pub candidates: String,
    pub size: String,
    pub standard: String,
    pub buffered: String,
    /// Cell text for a metric with no baseline.
    pub missing: String,
    /// Cell text for a metric that is not defined.
    pub undefined: String,
}

impl Default for OutputColumns {
    fn default() -> Self {
        OutputColumns {
            problem_size: "problem_size".to_string(),
            thread_count: "thread_count".to_string(),
            policy: "policy".to_string(),
            phase: "phase".to_string(),
            metric_value: "metric_value".to_string(),
            mean_value: "mean_value".to_string(),
            samples: "samples".to_string(),
            speedup: "speedup".to_string(),
            efficiency: "efficiency".to_string(),
            serial_fraction: "serial_fraction".to_string(),
            candidates: "candidates".to_string(),
            size: "Size".to_string(),
            standard: "Standard_Throughput".to_string(),
            buffered: "Buffered_Throughput".to_string(),
            missing: String::new(),
            undefined: "undefined".to_string(),
        }
    }
}
