//! Component D — Splitter.
//!
//! Weighted first-fit-decreasing bin-packing of a test set across
//! `split_total` shards. The splitter never talks to the TI service
//! directly — it is handed a weight map (or an instruction to use none) by
//! the caller, which keeps this module pure and its determinism property
//! (§8.3) trivially testable: same `(tests, strategy, weights, total)` in,
//! same buckets out, on any machine.
//!
//! Grounded on `orchestrator/scheduler.rs`'s `Scheduler` (bucket-fill loop
//! over a fixed parallelism count), generalized from round-robin to
//! weighted first-fit-decreasing.

use crate::model::RunnableTest;
use std::collections::HashMap;
use std::str::FromStr;

/// Which timing signal the weight map is keyed by (§4.D).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    FileTiming,
    ClassTiming,
    TestcaseTiming,
    TestsuiteTiming,
    FileSize,
    TestCount,
}

impl Strategy {
    pub fn as_str(self) -> &'static str {
        match self {
            Strategy::FileTiming => "file_timing",
            Strategy::ClassTiming => "class_timing",
            Strategy::TestcaseTiming => "testcase_timing",
            Strategy::TestsuiteTiming => "testsuite_timing",
            Strategy::FileSize => "file_size",
            Strategy::TestCount => "test_count",
        }
    }

    /// `file_size` and `test_count` never consult the timing oracle; every
    /// key gets an equal weight (§4.D).
    pub fn uses_oracle(self) -> bool {
        !matches!(self, Strategy::FileSize | Strategy::TestCount)
    }
}

impl FromStr for Strategy {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "file_timing" => Ok(Strategy::FileTiming),
            "class_timing" => Ok(Strategy::ClassTiming),
            "testcase_timing" => Ok(Strategy::TestcaseTiming),
            "testsuite_timing" => Ok(Strategy::TestsuiteTiming),
            "file_size" => Ok(Strategy::FileSize),
            "test_count" => Ok(Strategy::TestCount),
            _ => Err(()),
        }
    }
}

/// The splitter's view of one shard assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShardCoordinates {
    pub split_index: usize,
    pub split_total: usize,
}

/// `RunnableTest` carries no file path or suite field, so `file_timing` and
/// `testsuite_timing` key off the nearest available proxy: the qualified
/// class name. `testcase_timing` extends that with the method when present.
/// This is an explicit simplification (see DESIGN.md) given the data this
/// crate's `RunnableTest` actually carries.
fn key_for(strategy: Strategy, test: &RunnableTest) -> String {
    match strategy {
        Strategy::TestcaseTiming => match &test.method {
            Some(m) if !m.is_empty() => format!("{}#{}", test.qualified_class(), m),
            _ => test.qualified_class(),
        },
        _ => test.qualified_class(),
    }
}

/// Partitions `tests` into `coords.split_total` buckets and returns the
/// subset assigned to `coords.split_index`.
///
/// `weights` is the oracle's map for `strategy`, or an empty map for
/// `file_size`/`test_count` (equal weighting) or when the oracle call
/// failed — either way, a missing key defaults to the mean of the known
/// weights, or `1.0` if no weights are known at all (§4.D).
pub fn split(
    tests: &[RunnableTest],
    strategy: Strategy,
    weights: &HashMap<String, f64>,
    coords: ShardCoordinates,
) -> Vec<RunnableTest> {
    if tests.is_empty() || coords.split_total == 0 {
        return Vec::new();
    }
    if coords.split_total == 1 {
        return tests.to_vec();
    }

    let default_weight = if weights.is_empty() {
        1.0
    } else {
        weights.values().sum::<f64>() / weights.values().count() as f64
    };

    // Group tests by key, preserving first-seen order for determinism ties
    // that aren't otherwise broken by the sort below.
    let mut keys_in_order: Vec<String> = Vec::new();
    let mut by_key: HashMap<String, Vec<RunnableTest>> = HashMap::new();
    for test in tests {
        let key = key_for(strategy, test);
        by_key.entry(key.clone()).or_insert_with(|| {
            keys_in_order.push(key.clone());
            Vec::new()
        });
        by_key.get_mut(&key).unwrap().push(test.clone());
    }

    let mut keys = keys_in_order;
    keys.sort_by(|a, b| {
        let wa = weights.get(a).copied().unwrap_or(default_weight);
        let wb = weights.get(b).copied().unwrap_or(default_weight);
        wb.partial_cmp(&wa).unwrap_or(std::cmp::Ordering::Equal).then_with(|| a.cmp(b))
    });

    let mut bucket_weights = vec![0.0_f64; coords.split_total];
    let mut buckets: Vec<Vec<String>> = vec![Vec::new(); coords.split_total];

    for key in keys {
        let weight = weights.get(&key).copied().unwrap_or(default_weight);
        let lightest = lightest_bucket(&bucket_weights);
        bucket_weights[lightest] += weight;
        buckets[lightest].push(key);
    }

    buckets[coords.split_index]
        .iter()
        .flat_map(|key| by_key.get(key).cloned().unwrap_or_default())
        .collect()
}

/// Index of the lowest-weight bucket; ties go to the lowest index (§4.D).
fn lightest_bucket(weights: &[f64]) -> usize {
    let mut best = 0;
    for (i, w) in weights.iter().enumerate().skip(1) {
        if *w < weights[best] {
            best = i;
        }
    }
    best
}

/// Entry point used by the orchestrator: resolves an unknown/unsupported
/// strategy string to [`Strategy::TestCount`] and an empty weight map,
/// matching §4.D's "silently fall back to `test_count`" instruction.
pub fn resolve_strategy(name: &str) -> Strategy {
    Strategy::from_str(name).unwrap_or(Strategy::TestCount)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SelectionReason;

    fn test_named(pkg: &str, class: &str) -> RunnableTest {
        RunnableTest::new(pkg, class, SelectionReason::SourceCode)
    }

    #[test]
    fn unknown_strategy_falls_back_to_test_count() {
        assert_eq!(resolve_strategy("bogus"), Strategy::TestCount);
        assert_eq!(resolve_strategy("file_size"), Strategy::FileSize);
    }

    #[test]
    fn coverage_is_exact_across_all_buckets() {
        let tests: Vec<_> = (0..5).map(|i| test_named("p", &format!("C{i}"))).collect();
        let mut all = Vec::new();
        for split_index in 0..3 {
            all.extend(split(
                &tests,
                Strategy::TestCount,
                &HashMap::new(),
                ShardCoordinates { split_index, split_total: 3 },
            ));
        }
        all.sort_by(|a, b| a.class.cmp(&b.class));
        let mut expected: Vec<_> = tests.clone();
        expected.sort_by(|a, b| a.class.cmp(&b.class));
        assert_eq!(all, expected);
    }

    #[test]
    fn five_tests_three_shards_even_split() {
        let tests: Vec<_> = ["p1.c1", "p2.c1", "p3.c1", "p1.c2", "p2.c2"]
            .iter()
            .map(|s| {
                let (p, c) = s.split_once('.').unwrap();
                test_named(p, c)
            })
            .collect();
        let total = 3;
        let sizes: Vec<usize> = (0..total)
            .map(|i| {
                split(
                    &tests,
                    Strategy::TestCount,
                    &HashMap::new(),
                    ShardCoordinates { split_index: i, split_total: total },
                )
                .len()
            })
            .collect();
        let mut sorted_sizes = sizes.clone();
        sorted_sizes.sort();
        assert_eq!(sorted_sizes, vec![1, 2, 2]);
    }

    #[test]
    fn determinism_same_inputs_same_buckets() {
        let tests: Vec<_> = (0..10).map(|i| test_named("p", &format!("C{i}"))).collect();
        let coords = ShardCoordinates { split_index: 1, split_total: 4 };
        let a = split(&tests, Strategy::TestCount, &HashMap::new(), coords);
        let b = split(&tests, Strategy::TestCount, &HashMap::new(), coords);
        assert_eq!(a, b);
    }

    #[test]
    fn missing_weight_defaults_to_mean_of_known() {
        let tests = vec![test_named("p", "A"), test_named("p", "B"), test_named("p", "C")];
        let mut weights = HashMap::new();
        weights.insert("p.A".to_string(), 10.0);
        weights.insert("p.B".to_string(), 2.0);
        // "p.C" missing -> defaults to mean(10, 2) = 6.0, landing in its own bucket
        // ahead of B by the (weight desc, key asc) sort.
        let bucket0 = split(
            &tests,
            Strategy::ClassTiming,
            &weights,
            ShardCoordinates { split_index: 0, split_total: 3 },
        );
        assert_eq!(bucket0.len(), 1);
        assert_eq!(bucket0[0].class, "A");
    }

    #[test]
    fn single_shard_returns_everything() {
        let tests = vec![test_named("p", "A"), test_named("p", "B")];
        let out = split(
            &tests,
            Strategy::TestCount,
            &HashMap::new(),
            ShardCoordinates { split_index: 0, split_total: 1 },
        );
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn testcase_timing_keys_include_method() {
        let mut t = test_named("p", "A");
        t.method = Some("test_one".to_string());
        assert_eq!(key_for(Strategy::TestcaseTiming, &t), "p.A#test_one");
        assert_eq!(key_for(Strategy::ClassTiming, &t), "p.A");
    }
}
