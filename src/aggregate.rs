//! Running statistics for every interval that shares one identity

use std::cmp::Ordering;

use serde::Serialize;
use thiserror::Error;

use crate::checkpoint::Location;
use crate::interval::{Interval, IntervalKey};

/// An interval was folded into an aggregate that tracks a different pair
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("interval {found} does not belong to aggregate {expected}")]
pub struct IdentityMismatch {
    pub expected: IntervalKey,
    pub found: IntervalKey,
}

/// Statistics of repeated measurements between the same two checkpoints
///
/// Starts empty; the first folded interval fixes the identity and both
/// locations for good. Nothing is ever removed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Aggregate {
    key: Option<IntervalKey>,
    start: Location,
    end: Location,
    count: u64,
    /// Exact sum; i128 cannot overflow for any number of i64 durations a u64
    /// count can describe, so the total never depends on fold order
    total_duration_us: i128,
}

impl Aggregate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one measurement
    ///
    /// Fails without touching any state when the interval's identity differs
    /// from the one already established.
    pub fn fold(&mut self, interval: &Interval) -> Result<(), IdentityMismatch> {
        match &self.key {
            None => {
                self.key = Some(interval.key().clone());
                self.start = interval.start().location().clone();
                self.end = interval.end().location().clone();
            }
            Some(key) if key != interval.key() => {
                return Err(IdentityMismatch {
                    expected: key.clone(),
                    found: interval.key().clone(),
                });
            }
            Some(_) => {}
        }

        self.count += 1;
        self.total_duration_us += i128::from(interval.duration_us());
        Ok(())
    }

    /// Identity, or `None` while nothing has been folded in
    pub fn key(&self) -> Option<&IntervalKey> {
        self.key.as_ref()
    }

    /// Compact id of the identity; 0 while empty
    pub fn fingerprint(&self) -> u64 {
        self.key.as_ref().map(IntervalKey::fingerprint).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn start(&self) -> &Location {
        &self.start
    }

    pub fn end(&self) -> &Location {
        &self.end
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    /// Sum of all folded durations (microseconds), clamped to the i64 range
    pub fn total_duration_us(&self) -> i64 {
        clamp_i64(self.total_duration_us)
    }

    /// Mean duration in microseconds, truncated toward zero; 0 when empty
    pub fn average_duration_us(&self) -> i64 {
        if self.count == 0 {
            return 0;
        }
        clamp_i64(self.total_duration_us / i128::from(self.count))
    }
}

fn clamp_i64(value: i128) -> i64 {
    i64::try_from(value).unwrap_or(if value < 0 { i64::MIN } else { i64::MAX })
}

impl PartialOrd for Aggregate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Orders by total duration; count and identity only break ties
impl Ord for Aggregate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.total_duration_us
            .cmp(&other.total_duration_us)
            .then_with(|| self.count.cmp(&other.count))
            .then_with(|| self.key.cmp(&other.key))
            .then_with(|| self.start.cmp(&other.start))
            .then_with(|| self.end.cmp(&other.end))
    }
}
