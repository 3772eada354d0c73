//! Checkpoints and the clocks that timestamp them
//!
//! A checkpoint marks "execution reached this source location at this instant".
//! Two checkpoints are the same checkpoint when they sit at the same file and
//! line; the function name and the timestamp are carried for reporting only.

use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Point in time, in nanoseconds relative to the epoch of the clock that produced it.
///
/// Signed so that timestamps before the epoch (and differences between
/// non-monotonic readings) stay representable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Timestamp from nanoseconds since the clock epoch
    pub const fn from_nanos(nanos: i64) -> Self {
        Self(nanos)
    }

    /// Timestamp from microseconds since the clock epoch
    pub const fn from_micros(micros: i64) -> Self {
        Self(micros.saturating_mul(1_000))
    }

    /// Nanoseconds since the clock epoch
    pub const fn as_nanos(self) -> i64 {
        self.0
    }

    /// Microseconds elapsed from `earlier` to `self`, truncated toward zero.
    ///
    /// Negative when `earlier` is actually later.
    pub fn micros_since(self, earlier: Timestamp) -> i64 {
        self.0.saturating_sub(earlier.0) / 1_000
    }
}

/// Source of checkpoint timestamps
pub trait Clock {
    /// Read the current time
    fn now(&self) -> Timestamp;
}

/// Wall clock (`SystemTime`) relative to the Unix epoch
///
/// Wall-clock adjustments show up as negative or inflated durations.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        match SystemTime::now().duration_since(UNIX_EPOCH) {
            Ok(since) => Timestamp(i64::try_from(since.as_nanos()).unwrap_or(i64::MAX)),
            Err(before) => Timestamp(-i64::try_from(before.duration().as_nanos()).unwrap_or(i64::MAX)),
        }
    }
}

/// Monotonic clock anchored at construction
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    anchor: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            anchor: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Timestamp {
        Timestamp(i64::try_from(self.anchor.elapsed().as_nanos()).unwrap_or(i64::MAX))
    }
}

/// Clock that only moves when told to
///
/// Used for deterministic tests and for replaying recorded workloads.
#[derive(Debug, Default)]
pub struct ManualClock {
    nanos: AtomicI64,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the clock to an absolute time in microseconds
    pub fn set_micros(&self, micros: i64) {
        self.nanos
            .store(Timestamp::from_micros(micros).as_nanos(), Ordering::Relaxed);
    }

    /// Move the clock forward (or backward, for negative values) by `micros`
    pub fn advance_micros(&self, micros: i64) {
        self.nanos
            .fetch_add(micros.saturating_mul(1_000), Ordering::Relaxed);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        Timestamp(self.nanos.load(Ordering::Relaxed))
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> Timestamp {
        (**self).now()
    }
}

/// Where a checkpoint sits in the source
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Location {
    pub file: String,
    pub line: u32,
    pub function: String,
}

impl Location {
    pub fn new(file: impl Into<String>, line: u32, function: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            line,
            function: function.into(),
        }
    }

    /// `<file>:<line>`
    pub fn file_line(&self) -> String {
        format!("{}:{}", self.file, self.line)
    }
}

/// A timestamped marker at a source location
///
/// Equality and hashing consider `(file, line)` only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    location: Location,
    timestamp: Timestamp,
}

impl Checkpoint {
    /// Capture a checkpoint now, reading the time from `clock`
    pub fn capture(
        file: impl Into<String>,
        line: u32,
        function: impl Into<String>,
        clock: &(impl Clock + ?Sized),
    ) -> Self {
        Self {
            location: Location::new(file, line, function),
            timestamp: clock.now(),
        }
    }

    /// Checkpoint with a known timestamp (trace replay)
    pub fn new(
        file: impl Into<String>,
        line: u32,
        function: impl Into<String>,
        timestamp: Timestamp,
    ) -> Self {
        Self {
            location: Location::new(file, line, function),
            timestamp,
        }
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    pub fn file(&self) -> &str {
        &self.location.file
    }

    pub fn line(&self) -> u32 {
        self.location.line
    }

    pub fn function(&self) -> &str {
        &self.location.function
    }

    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    /// `<file>:<line>`
    pub fn file_line(&self) -> String {
        self.location.file_line()
    }
}

impl PartialEq for Checkpoint {
    fn eq(&self, other: &Self) -> bool {
        self.location.file == other.location.file && self.location.line == other.location.line
    }
}

impl Eq for Checkpoint {}

impl Hash for Checkpoint {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.location.file.hash(state);
        self.location.line.hash(state);
    }
}

/// Strip the `::__probe` suffix the capture macros leave on `type_name`
#[doc(hidden)]
pub fn __function_name(probe_type_name: &'static str) -> &'static str {
    probe_type_name
        .strip_suffix("::__probe")
        .unwrap_or(probe_type_name)
}

/// Record a checkpoint at the call site into `$target`
///
/// `$target` is anything with a `record(Checkpoint)` method (`Collector`,
/// `SharedCollector`, `Session`). The timestamp comes from `$clock` when given,
/// otherwise from the wall clock.
///
/// ```
/// use lapstat::{checkpoint, collector::Collector};
///
/// let mut collector = Collector::new();
/// checkpoint!(collector);
/// let _work: u64 = (0..1_000u64).sum();
/// checkpoint!(collector);
/// assert_eq!(collector.snapshot().len(), 1);
/// ```
#[macro_export]
macro_rules! checkpoint {
    ($target:expr) => {
        $crate::checkpoint!($target, $crate::checkpoint::SystemClock)
    };
    ($target:expr, $clock:expr) => {{
        fn __probe() {}
        let function = $crate::checkpoint::__function_name(::std::any::type_name_of_val(&__probe));
        $target.record($crate::checkpoint::Checkpoint::capture(
            file!(),
            line!(),
            function,
            &$clock,
        ));
    }};
}
