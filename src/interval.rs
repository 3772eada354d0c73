//! Single measurements between two consecutive checkpoints

use std::fmt;
use std::hash::Hasher;

use fnv::FnvHasher;
use serde::{Deserialize, Serialize};

use crate::checkpoint::Checkpoint;

/// Identity of a recurring (start location, end location) pair
///
/// The literal file/line tuple is the aggregation key, so two different pairs
/// can never be merged by accident.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct IntervalKey {
    pub start_file: String,
    pub start_line: u32,
    pub end_file: String,
    pub end_line: u32,
}

impl IntervalKey {
    pub fn new(start: &Checkpoint, end: &Checkpoint) -> Self {
        Self {
            start_file: start.file().to_string(),
            start_line: start.line(),
            end_file: end.file().to_string(),
            end_line: end.line(),
        }
    }

    /// 64-bit FNV-1a hash of `"<start_file>:<start_line><end_file>:<end_line>"`
    ///
    /// Compact id for reports and exports. Distinct keys may share a
    /// fingerprint, so it is never used for lookups.
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = FnvHasher::default();
        hasher.write(self.to_string().as_bytes());
        hasher.finish()
    }
}

impl fmt::Display for IntervalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}{}:{}",
            self.start_file, self.start_line, self.end_file, self.end_line
        )
    }
}

/// Time elapsed between a start checkpoint and the checkpoint recorded after it
#[derive(Debug, Clone)]
pub struct Interval {
    start: Checkpoint,
    end: Checkpoint,
    key: IntervalKey,
}

impl Interval {
    /// Pair two checkpoints given in capture order. Never rejects its input.
    pub fn pair(start: Checkpoint, end: Checkpoint) -> Self {
        let key = IntervalKey::new(&start, &end);
        Self { start, end, key }
    }

    pub fn key(&self) -> &IntervalKey {
        &self.key
    }

    pub fn start(&self) -> &Checkpoint {
        &self.start
    }

    pub fn end(&self) -> &Checkpoint {
        &self.end
    }

    /// Duration in microseconds, truncated toward zero; may be zero or negative
    pub fn duration_us(&self) -> i64 {
        self.end.timestamp().micros_since(self.start.timestamp())
    }
}
