//! Metric derivation: reduce run records into per-configuration comparisons.
//!
//! Records are grouped by (problem_size, thread_count, policy, phase) and
//! averaged. Each group is then compared against its baseline group: same
//! problem size and phase, `baseline_threads` threads, and the policy chosen
//! by the baseline rule.

pub mod baseline;
pub mod best;

pub use baseline::{Aggregation, BaselinePolicy, DeriveConfig};
pub use best::{BestBy, BestPick, select_best};

use crate::log::{ProblemSize, RunRecord};
use log::{debug, warn};
use serde::Serialize;
use std::collections::BTreeMap;

/// A derived quantity that may be absent for a reason worth reporting.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Metric {
    Value(f64),
    /// No baseline group exists for this key.
    Missing,
    /// The quantity is not defined here (serial fraction at one thread,
    /// or a zero mean time).
    Undefined,
}

impl Metric {
    pub fn value(self) -> Option<f64> {
        match self {
            Metric::Value(v) => Some(v),
            Metric::Missing | Metric::Undefined => None,
        }
    }

    fn and_then(self, f: impl FnOnce(f64) -> Metric) -> Metric {
        match self {
            Metric::Value(v) => f(v),
            other => other,
        }
    }

    /// Keep only finite results; anything else is undefined.
    fn finite(v: f64) -> Metric {
        if v.is_finite() {
            Metric::Value(v)
        } else {
            Metric::Undefined
        }
    }
}

impl Serialize for Metric {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Metric::Value(v) => serializer.serialize_f64(*v),
            Metric::Missing => serializer.serialize_none(),
            Metric::Undefined => serializer.serialize_str("undefined"),
        }
    }
}

/// One computed comparison for a (problem_size, thread_count, policy, phase) key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DerivedRecord {
    pub problem_size: ProblemSize,
    pub thread_count: u32,
    pub policy: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,
    pub mean_value: f64,
    /// Number of trials averaged into `mean_value`.
    pub samples: usize,
    pub speedup: Metric,
    pub efficiency: Metric,
    /// None when serial fraction reporting is disabled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serial_fraction: Option<Metric>,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct GroupKey {
    problem_size: ProblemSize,
    thread_count: u32,
    policy: String,
    phase: Option<String>,
}

#[derive(Debug, Clone, Default)]
struct Accumulator {
    values: Vec<f64>,
}

impl Accumulator {
    /// Always finite for finite inputs.
    fn reduce(&self, aggregation: Aggregation) -> f64 {
        match aggregation {
            Aggregation::Mean => {
                let n = self.values.len() as f64;
                let sum: f64 = self.values.iter().sum();
                if sum.is_finite() {
                    return sum / n;
                }
                // The plain sum overflowed; average pre-scaled values, capped at the largest trial.
                let largest = self.values.iter().copied().fold(0.0, f64::max);
                self.values.iter().map(|v| v / n).sum::<f64>().min(largest)
            }
        }
    }
}

/// Derive comparison metrics from a complete record set.
///
/// Missing baselines and undefined quantities are reported per record and
/// never fail the batch. The output is sorted by key, which callers must not
/// rely on for anything but determinism.
pub fn derive(records: &[RunRecord], config: &DeriveConfig) -> Vec<DerivedRecord> {
    let mut groups: BTreeMap<GroupKey, Accumulator> = BTreeMap::new();
    for r in records {
        let acc = groups
            .entry(GroupKey {
                problem_size: r.problem_size.clone(),
                thread_count: r.thread_count,
                policy: r.policy.clone(),
                phase: r.phase.clone(),
            })
            .or_default();
        acc.values.push(r.metric_value);
    }

    let means: BTreeMap<&GroupKey, f64> = groups
        .iter()
        .map(|(key, acc)| (key, acc.reduce(config.aggregation)))
        .collect();

    let mut out = Vec::with_capacity(groups.len());
    let mut missing = 0usize;

    for (key, acc) in &groups {
        let mean_value = means[key];

        let baseline_key = GroupKey {
            problem_size: key.problem_size.clone(),
            thread_count: config.baseline_threads,
            policy: config.baseline_policy.resolve(&key.policy).to_string(),
            phase: key.phase.clone(),
        };

        let speedup = if baseline_key == *key {
            // The baseline group against itself: exactly 1, no division.
            Metric::Value(1.0)
        } else {
            match means.get(&baseline_key) {
                Some(&base) if mean_value > 0.0 => Metric::finite(base / mean_value),
                Some(_) => Metric::Undefined,
                None => {
                    missing += 1;
                    debug!(
                        "no baseline for size={} threads={} policy={} phase={:?}",
                        key.problem_size, key.thread_count, key.policy, key.phase
                    );
                    Metric::Missing
                }
            }
        };

        let threads = f64::from(key.thread_count);
        let efficiency = speedup.and_then(|s| Metric::finite(s / threads));
        let serial_fraction = config
            .serial_fraction
            .then(|| serial_fraction(speedup, key.thread_count));

        out.push(DerivedRecord {
            problem_size: key.problem_size.clone(),
            thread_count: key.thread_count,
            policy: key.policy.clone(),
            phase: key.phase.clone(),
            mean_value,
            samples: acc.values.len(),
            speedup,
            efficiency,
            serial_fraction,
        });
    }

    if missing > 0 {
        warn!(
            "{} of {} derived record(s) have no baseline ({})",
            missing,
            out.len(),
            config.baseline_policy
        );
    }
    out
}

/// Amdahl's-law serial fraction: (1/S - 1/p) / (1 - 1/p).
///
/// Undefined at one thread, whatever the speedup.
pub fn serial_fraction(speedup: Metric, thread_count: u32) -> Metric {
    if thread_count <= 1 {
        return Metric::Undefined;
    }
    let p = f64::from(thread_count);
    speedup.and_then(|s| {
        if s > 0.0 {
            Metric::finite((1.0 / s - 1.0 / p) / (1.0 - 1.0 / p))
        } else {
            Metric::Undefined
        }
    })
}
