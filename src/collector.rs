//! Checkpoint pairing engine
//!
//! Pairs every checkpoint with the one recorded right before it, so a sequence
//! `c1, c2, c3, c4` yields the intervals `(c1,c2)`, `(c2,c3)` and `(c3,c4)`.
//! Each interval is folded into the aggregate keyed by its identity.
//!
//! Two policies produce identical statistics:
//! - [`PairingPolicy::Sliding`] keeps only the pending checkpoint (O(1) memory)
//! - [`PairingPolicy::BatchReplay`] keeps the whole log and replays it on demand,
//!   which is what trace persistence needs
//!
//! A `Collector` is single-writer. Use [`crate::shared::SharedCollector`] when
//! several threads need to record.

use std::collections::{HashMap, VecDeque};

use serde::{Deserialize, Serialize};

use crate::aggregate::Aggregate;
use crate::checkpoint::Checkpoint;
use crate::interval::{Interval, IntervalKey};

/// How recorded checkpoints are turned into statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum PairingPolicy {
    /// Fold each interval as soon as its end checkpoint arrives
    #[default]
    Sliding,
    /// Keep every checkpoint, compute statistics by replaying the log
    #[value(alias = "batch")]
    #[serde(alias = "batch")]
    BatchReplay,
}

/// Aggregates in first-seen order, indexed by identity
#[derive(Debug, Clone, Default)]
struct AggregateTable {
    index: HashMap<IntervalKey, usize>,
    entries: Vec<Aggregate>,
}

impl AggregateTable {
    fn fold(&mut self, interval: &Interval) {
        let slot = match self.index.get(interval.key()) {
            Some(&slot) => slot,
            None => {
                tracing::debug!(key = %interval.key(), "new interval identity");
                self.entries.push(Aggregate::new());
                self.index
                    .insert(interval.key().clone(), self.entries.len() - 1);
                self.entries.len() - 1
            }
        };

        // Keyed by the interval's own identity, so a mismatch means the table is corrupt
        if let Err(err) = self.entries[slot].fold(interval) {
            tracing::error!(%err, "aggregate table out of sync");
        }
    }

    fn clear(&mut self) {
        self.index.clear();
        self.entries.clear();
    }
}

/// Receives checkpoints and produces per-identity aggregates
#[derive(Debug, Clone, Default)]
pub struct Collector {
    policy: PairingPolicy,
    /// Sliding: at most two checkpoints. Batch replay: the full log.
    checkpoints: VecDeque<Checkpoint>,
    table: AggregateTable,
    intervals: u64,
}

impl Collector {
    /// Collector with the sliding-pair policy
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(policy: PairingPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    pub fn policy(&self) -> PairingPolicy {
        self.policy
    }

    /// Record a checkpoint. Never fails.
    pub fn record(&mut self, checkpoint: Checkpoint) {
        tracing::trace!(at = %checkpoint.file_line(), "checkpoint");
        self.checkpoints.push_back(checkpoint);
        if self.checkpoints.len() < 2 {
            return;
        }
        self.intervals += 1;

        match self.policy {
            PairingPolicy::Sliding => {
                if let Some(start) = self.checkpoints.pop_front() {
                    let end = self.checkpoints[0].clone();
                    self.table.fold(&Interval::pair(start, end));
                }
            }
            PairingPolicy::BatchReplay => {}
        }
    }

    /// Current aggregates in insertion order
    pub fn snapshot(&self) -> Vec<Aggregate> {
        match self.policy {
            PairingPolicy::Sliding => self.table.entries.clone(),
            PairingPolicy::BatchReplay => replay(self.checkpoints.iter()),
        }
    }

    /// Drop every pending checkpoint and every aggregate
    pub fn reset(&mut self) {
        tracing::debug!(intervals = self.intervals, "collector reset");
        self.checkpoints.clear();
        self.table.clear();
        self.intervals = 0;
    }

    /// Checkpoints still held: the pending one under the sliding policy,
    /// the full log under batch replay
    pub fn checkpoints(&self) -> impl ExactSizeIterator<Item = &Checkpoint> + '_ {
        self.checkpoints.iter()
    }

    /// Checkpoint the next record will be paired with
    pub fn pending(&self) -> Option<&Checkpoint> {
        self.checkpoints.back()
    }

    /// Number of intervals formed since creation or the last reset
    pub fn interval_count(&self) -> u64 {
        self.intervals
    }
}

/// Pair adjacent checkpoints of an ordered log and aggregate the intervals
pub fn replay<'a, I>(checkpoints: I) -> Vec<Aggregate>
where
    I: IntoIterator<Item = &'a Checkpoint>,
{
    let mut table = AggregateTable::default();
    let mut previous: Option<&Checkpoint> = None;
    for checkpoint in checkpoints {
        if let Some(start) = previous {
            table.fold(&Interval::pair(start.clone(), checkpoint.clone()));
        }
        previous = Some(checkpoint);
    }
    table.entries
}
