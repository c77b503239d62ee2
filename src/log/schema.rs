//! Column schemas: how the positional fields of a data row map onto a
//! RunRecord.

use serde::Deserialize;
use std::collections::BTreeMap;

/// What a column of a data row holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnRole {
    ProblemSize,
    Threads,
    Policy,
    Value,
    /// A per-phase measurement; the column name names the phase.
    Phase,
    Ignore,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub role: ColumnRole,
}

/// Ordered columns of a data row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    pub columns: Vec<Column>,
}

impl Schema {
    /// Schema used before any column header is seen: `problem_size, metric_value`.
    pub fn default_order() -> Self {
        Schema {
            columns: vec![
                Column {
                    name: "problem_size".to_string(),
                    role: ColumnRole::ProblemSize,
                },
                Column {
                    name: "metric_value".to_string(),
                    role: ColumnRole::Value,
                },
            ],
        }
    }

    /// Bind a column-header literal to roles. Unknown names are ignored
    /// columns.
    ///
    /// A usable schema has at most one problem-size, threads and policy
    /// column, and either a single value column or one or more phase
    /// columns. A missing problem-size column must come from the caller.
    /// Roles a row does not carry come from parser context.
    pub fn bind(
        literal: &str,
        separator: char,
        roles: &BTreeMap<String, ColumnRole>,
    ) -> Result<Self, String> {
        let columns: Vec<Column> = literal
            .split(separator)
            .map(|name| {
                let name = name.trim();
                Column {
                    name: name.to_string(),
                    role: roles.get(name).copied().unwrap_or(ColumnRole::Ignore),
                }
            })
            .collect();

        let count = |role: ColumnRole| columns.iter().filter(|c| c.role == role).count();

        if [ColumnRole::ProblemSize, ColumnRole::Threads, ColumnRole::Policy]
            .into_iter()
            .any(|role| count(role) > 1)
        {
            return Err(format!(
                "column header {:?} has more than one problem_size, threads or policy column",
                literal
            ));
        }
        match (count(ColumnRole::Value), count(ColumnRole::Phase)) {
            (1, 0) => {}
            (0, phases) if phases > 0 => {}
            _ => {
                return Err(format!(
                    "column header {:?} needs one value column or phase columns, not both",
                    literal
                ));
            }
        }

        Ok(Schema { columns })
    }

    pub fn supplies(&self, role: ColumnRole) -> bool {
        self.columns.iter().any(|c| c.role == role)
    }

    /// Number of records one row of this schema produces.
    pub fn records_per_row(&self) -> usize {
        self.columns
            .iter()
            .filter(|c| matches!(c.role, ColumnRole::Value | ColumnRole::Phase))
            .count()
    }
}

/// Phase label for a phase column: the column name without a `_time` suffix.
pub fn phase_label(column: &str) -> &str {
    column.strip_suffix("_time").unwrap_or(column)
}

/// Field-name roles for the column headers the benchmark drivers print.
///
/// `num_buckets` is treated as the configuration label so bucket-sort runs
/// with different bucket counts stay apart.
pub fn default_roles() -> BTreeMap<String, ColumnRole> {
    use ColumnRole::*;

    [
        ("chunk_size", ProblemSize),
        ("array_size", ProblemSize),
        ("dataSize", ProblemSize),
        ("Size", ProblemSize),
        ("average_time", Value),
        ("time", Value),
        ("Time (s)", Value),
        ("threads", Threads),
        ("num_threads", Threads),
        ("Processors", Threads),
        ("schedule", Policy),
        ("confId", Policy),
        ("num_buckets", Policy),
        ("initial_bucket_capacity", Ignore),
        ("random_time", Phase),
        ("distribute_time", Phase),
        ("sort_time", Phase),
        ("rewrite_time", Phase),
        ("total_time", Phase),
    ]
    .into_iter()
    .map(|(name, role)| (name.to_string(), role))
    .collect()
}
