//! Best-configuration selection over derived records.

use crate::log::ProblemSize;
use crate::model::{DerivedRecord, Metric};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Which dimension is chosen per group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BestBy {
    /// Fastest policy per (problem_size, thread_count).
    Policy,
    /// Fastest problem size per (thread_count, policy), e.g. the best chunk size.
    ProblemSize,
}

/// The winning configuration of one group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BestPick {
    pub problem_size: ProblemSize,
    pub thread_count: u32,
    pub policy: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,
    pub mean_value: f64,
    pub speedup: Metric,
    pub efficiency: Metric,
    /// Number of candidates compared.
    pub candidates: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum BestKey {
    PerSize {
        problem_size: ProblemSize,
        thread_count: u32,
        phase: Option<String>,
    },
    PerPolicy {
        thread_count: u32,
        policy: String,
        phase: Option<String>,
    },
}

/// Pick the minimum-`mean_value` record of every group.
///
/// Ties never depend on input order. With `BestBy::Policy` the policy that
/// comes first in `policy_order` wins; policies missing from it rank after
/// all listed ones, by name. With `BestBy::ProblemSize` the smaller size wins.
pub fn select_best(records: &[DerivedRecord], by: BestBy, policy_order: &[String]) -> Vec<BestPick> {
    let policy_rank = |policy: &str| -> (usize, String) {
        match policy_order.iter().position(|p| p == policy) {
            Some(i) => (i, String::new()),
            None => (policy_order.len(), policy.to_string()),
        }
    };

    let beats = |a: &DerivedRecord, b: &DerivedRecord| -> bool {
        let tie_break = match by {
            BestBy::Policy => policy_rank(&a.policy).cmp(&policy_rank(&b.policy)),
            BestBy::ProblemSize => a.problem_size.cmp(&b.problem_size),
        };
        a.mean_value.total_cmp(&b.mean_value).then(tie_break) == Ordering::Less
    };

    let mut groups: BTreeMap<BestKey, (&DerivedRecord, usize)> = BTreeMap::new();
    for r in records {
        let key = match by {
            BestBy::Policy => BestKey::PerSize {
                problem_size: r.problem_size.clone(),
                thread_count: r.thread_count,
                phase: r.phase.clone(),
            },
            BestBy::ProblemSize => BestKey::PerPolicy {
                thread_count: r.thread_count,
                policy: r.policy.clone(),
                phase: r.phase.clone(),
            },
        };
        groups
            .entry(key)
            .and_modify(|(best, n)| {
                *n += 1;
                if beats(r, *best) {
                    *best = r;
                }
            })
            .or_insert((r, 1));
    }

    groups
        .into_values()
        .map(|(best, candidates)| BestPick {
            problem_size: best.problem_size.clone(),
            thread_count: best.thread_count,
            policy: best.policy.clone(),
            phase: best.phase.clone(),
            mean_value: best.mean_value,
            speedup: best.speedup,
            efficiency: best.efficiency,
            candidates,
        })
        .collect()
}
