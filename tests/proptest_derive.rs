//! Property tests for metric derivation.

use benchlog::log::{ProblemSize, RunRecord};
use benchlog::model::{BaselinePolicy, DeriveConfig, Metric, derive};
use proptest::prelude::*;

fn record_strategy() -> impl Strategy<Value = RunRecord> {
    (
        prop::sample::select(vec![16u64, 64, 256]),
        prop::sample::select(vec![1u32, 2, 4, 8]),
        prop::sample::select(vec!["static", "dynamic"]),
        // Whole numbers keep sums exact under reordering.
        1u32 ..= 10_000,
    )
        .prop_map(|(size, threads, policy, value)| RunRecord {
            problem_size: ProblemSize::Count(size),
            thread_count: threads,
            policy: policy.to_string(),
            metric_value: f64::from(value),
            phase: None,
            line: 0,
        })
}

fn records_strategy() -> impl Strategy<Value = Vec<RunRecord>> {
    prop::collection::vec(record_strategy(), 0 .. 40)
}

fn baseline_strategy() -> impl Strategy<Value = BaselinePolicy> {
    prop_oneof![
        Just(BaselinePolicy::SamePolicy),
        Just(BaselinePolicy::Fixed("static".to_string())),
    ]
}

proptest! {
    #[test]
    fn derive_is_repeatable(records in records_strategy(), baseline in baseline_strategy()) {
        let config = DeriveConfig { baseline_policy: baseline, ..DeriveConfig::default() };
        prop_assert_eq!(derive(&records, &config), derive(&records, &config));
    }

    #[test]
    fn input_order_does_not_matter(
        (records, shuffled) in records_strategy()
            .prop_flat_map(|r| (Just(r.clone()), Just(r).prop_shuffle())),
    ) {
        let config = DeriveConfig::default();
        prop_assert_eq!(derive(&records, &config), derive(&shuffled, &config));
    }

    #[test]
    fn baseline_groups_have_unit_speedup(records in records_strategy()) {
        for d in derive(&records, &DeriveConfig::default()) {
            if d.thread_count == 1 {
                prop_assert_eq!(d.speedup, Metric::Value(1.0));
                prop_assert_eq!(d.efficiency, Metric::Value(1.0));
            }
        }
    }

    #[test]
    fn serial_fraction_undefined_at_one_thread(
        records in records_strategy(),
        baseline in baseline_strategy(),
    ) {
        let config = DeriveConfig { baseline_policy: baseline, ..DeriveConfig::default() };
        for d in derive(&records, &config) {
            if d.thread_count == 1 {
                prop_assert_eq!(d.serial_fraction, Some(Metric::Undefined));
            }
        }
    }

    #[test]
    fn efficiency_is_speedup_per_thread(records in records_strategy()) {
        for d in derive(&records, &DeriveConfig::default()) {
            match (d.speedup, d.efficiency) {
                (Metric::Value(s), Metric::Value(e)) => {
                    prop_assert_eq!(e, s / f64::from(d.thread_count));
                }
                (s, e) => prop_assert_eq!(s, e),
            }
        }
    }

    #[test]
    fn one_output_per_distinct_key(records in records_strategy()) {
        let derived = derive(&records, &DeriveConfig::default());
        let samples: usize = derived.iter().map(|d| d.samples).sum();
        prop_assert_eq!(samples, records.len());
    }
}
