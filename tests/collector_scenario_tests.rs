//! Integration tests for checkpoint pairing, aggregation and ranking
//!
//! Each test feeds a fixed checkpoint sequence with known timestamps through
//! the public API and checks the resulting statistics.

use lapstat::aggregate::Aggregate;
use lapstat::checkpoint::{Checkpoint, ManualClock, Timestamp};
use lapstat::collector::{self, Collector, PairingPolicy};
use lapstat::interval::{Interval, IntervalKey};
use lapstat::report;
use lapstat::shared::SharedCollector;

fn cp(file: &str, line: u32, micros: i64) -> Checkpoint {
    Checkpoint::new(file, line, "scenario", Timestamp::from_micros(micros))
}

fn find<'a>(aggregates: &'a [Aggregate], start: u32, end: u32) -> &'a Aggregate {
    aggregates
        .iter()
        .find(|a| a.start().line == start && a.end().line == end)
        .unwrap_or_else(|| panic!("no aggregate {start} -> {end}"))
}

fn record_all(policy: PairingPolicy, checkpoints: &[Checkpoint]) -> Collector {
    let mut collector = Collector::with_policy(policy);
    for checkpoint in checkpoints {
        collector.record(checkpoint.clone());
    }
    collector
}

#[test]
fn test_round_trip_scenario() {
    // fileA:10 at 0, fileA:20 at 100, fileA:10 at 250, fileA:20 at 400
    let sequence = [
        cp("fileA", 10, 0),
        cp("fileA", 20, 100),
        cp("fileA", 10, 250),
        cp("fileA", 20, 400),
    ];

    for policy in [PairingPolicy::Sliding, PairingPolicy::BatchReplay] {
        let collector = record_all(policy, &sequence);
        let snapshot = collector.snapshot();

        assert_eq!(snapshot.len(), 2, "{policy:?}");
        assert_eq!(collector.interval_count(), 3);

        let forward = find(&snapshot, 10, 20);
        assert_eq!(forward.count(), 2);
        assert_eq!(forward.total_duration_us(), 250);
        assert_eq!(forward.average_duration_us(), 125);

        let back = find(&snapshot, 20, 10);
        assert_eq!(back.count(), 1);
        assert_eq!(back.total_duration_us(), 150);

        let ranked = report::rank(&snapshot);
        assert_eq!(ranked[0].start().line, 10);
        assert_eq!(ranked[1].start().line, 20);
    }
}

#[test]
fn test_three_distinct_identities() {
    let collector = record_all(
        PairingPolicy::Sliding,
        &[
            cp("a.rs", 1, 0),
            cp("a.rs", 2, 10),
            cp("a.rs", 3, 40),
            cp("a.rs", 4, 60),
        ],
    );

    let snapshot = collector.snapshot();
    assert_eq!(snapshot.len(), 3);
    assert!(snapshot.iter().all(|a| a.count() == 1));

    let totals: Vec<i64> = report::rank(&snapshot)
        .iter()
        .map(Aggregate::total_duration_us)
        .collect();
    assert_eq!(totals, vec![30, 20, 10]);
}

#[test]
fn test_single_checkpoint_forms_no_interval() {
    for policy in [PairingPolicy::Sliding, PairingPolicy::BatchReplay] {
        let collector = record_all(policy, &[cp("a.rs", 1, 0)]);
        assert!(collector.snapshot().is_empty());
        assert_eq!(collector.interval_count(), 0);
        assert_eq!(collector.pending().map(Checkpoint::line), Some(1));
    }
}

#[test]
fn test_empty_collector() {
    let collector = Collector::new();
    assert!(collector.snapshot().is_empty());
    assert!(collector.pending().is_none());
    assert_eq!(collector.checkpoints().len(), 0);
}

#[test]
fn test_negative_duration_is_folded() {
    let collector = record_all(
        PairingPolicy::Sliding,
        &[cp("a.rs", 1, 500), cp("a.rs", 2, 200)],
    );
    let snapshot = collector.snapshot();
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[0].count(), 1);
    assert_eq!(snapshot[0].total_duration_us(), -300);
    assert_eq!(snapshot[0].average_duration_us(), -300);
}

#[test]
fn test_same_line_different_file_is_different_identity() {
    let collector = record_all(
        PairingPolicy::Sliding,
        &[cp("a.rs", 5, 0), cp("b.rs", 5, 10), cp("a.rs", 5, 20)],
    );
    assert_eq!(collector.snapshot().len(), 2);
}

#[test]
fn test_function_name_does_not_affect_identity() {
    let mut collector = Collector::new();
    collector.record(Checkpoint::new("a.rs", 1, "first", Timestamp::from_micros(0)));
    collector.record(Checkpoint::new("a.rs", 2, "first", Timestamp::from_micros(5)));
    collector.record(Checkpoint::new("a.rs", 1, "second", Timestamp::from_micros(10)));
    collector.record(Checkpoint::new("a.rs", 2, "second", Timestamp::from_micros(20)));

    let forward = collector
        .snapshot()
        .into_iter()
        .find(|a| a.start().line == 1)
        .unwrap();
    assert_eq!(forward.count(), 2);
    // The first occurrence names the aggregate
    assert_eq!(forward.start().function, "first");
}

#[test]
fn test_snapshot_is_insertion_ordered_and_pure() {
    let collector = record_all(
        PairingPolicy::Sliding,
        &[cp("a.rs", 3, 0), cp("a.rs", 1, 5), cp("a.rs", 2, 6)],
    );
    let first = collector.snapshot();
    let second = collector.snapshot();
    assert_eq!(first, second);
    assert_eq!(first[0].start().line, 3);
    assert_eq!(first[1].start().line, 1);
}

#[test]
fn test_reset_starts_over() {
    for policy in [PairingPolicy::Sliding, PairingPolicy::BatchReplay] {
        let mut collector = record_all(policy, &[cp("a.rs", 1, 0), cp("a.rs", 2, 10)]);
        collector.reset();
        assert!(collector.snapshot().is_empty());
        assert!(collector.pending().is_none());

        // The first checkpoint after a reset pairs with nothing before it
        collector.record(cp("a.rs", 2, 20));
        assert!(collector.snapshot().is_empty());
        collector.record(cp("a.rs", 3, 25));
        assert_eq!(collector.snapshot().len(), 1);
    }
}

#[test]
fn test_batch_replay_retains_log() {
    let sequence = [cp("a.rs", 1, 0), cp("a.rs", 2, 10), cp("a.rs", 3, 15)];
    let sliding = record_all(PairingPolicy::Sliding, &sequence);
    let batch = record_all(PairingPolicy::BatchReplay, &sequence);

    assert_eq!(sliding.checkpoints().len(), 1);
    assert_eq!(batch.checkpoints().len(), 3);
    assert_eq!(collector::replay(batch.checkpoints()), batch.snapshot());
}

#[test]
fn test_mismatched_fold_is_rejected() {
    let mut aggregate = Aggregate::new();
    aggregate
        .fold(&Interval::pair(cp("a.rs", 1, 0), cp("a.rs", 2, 10)))
        .unwrap();
    let before = aggregate.clone();

    let err = aggregate
        .fold(&Interval::pair(cp("a.rs", 2, 10), cp("a.rs", 3, 20)))
        .unwrap_err();
    assert_eq!(aggregate, before);
    assert!(err.to_string().contains("a.rs:2"));
}

#[test]
fn test_interval_key_ignores_timestamps() {
    let a = IntervalKey::new(&cp("x.rs", 1, 0), &cp("x.rs", 9, 10));
    let b = IntervalKey::new(&cp("x.rs", 1, 777), &cp("x.rs", 9, 999));
    assert_eq!(a, b);
    assert_eq!(a.fingerprint(), b.fingerprint());
}

#[test]
fn test_checkpoint_macro_with_manual_clock() {
    let clock = ManualClock::new();
    let mut collector = Collector::new();

    lapstat::checkpoint!(collector, &clock);
    clock.advance_micros(42);
    lapstat::checkpoint!(collector, &clock);

    let snapshot = collector.snapshot();
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[0].total_duration_us(), 42);
    assert!(snapshot[0].start().file.ends_with("collector_scenario_tests.rs"));
    assert_eq!(snapshot[0].end().line, snapshot[0].start().line + 2);
}

#[test]
fn test_shared_collector_across_threads() {
    let shared = SharedCollector::new();
    let handles: Vec<_> = (0..4)
        .map(|t| {
            let shared = shared.clone();
            std::thread::spawn(move || {
                for i in 0..100 {
                    shared.record(cp("worker.rs", 1 + (i % 2), t * 1_000 + i64::from(i)));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(shared.interval_count(), 399);
    let total: u64 = shared.snapshot().iter().map(Aggregate::count).sum();
    assert_eq!(total, 399);
}
