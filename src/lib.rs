//! Parse parallel-benchmark driver logs into run records and derive
//! speedup, efficiency and serial-fraction comparisons from them.

pub mod config;
pub mod log;
pub mod model;
pub mod render;

pub type Result<T> = anyhow::Result<T>;

pub use config::{AnalysisConfig, ValidatedConfig};
pub use model::{BestBy, BestPick, DeriveConfig, DerivedRecord, Metric, derive, select_best};
