//! lapstat - in-process checkpoint profiler
//!
//! Mark checkpoints in your code; lapstat pairs every checkpoint with the one
//! recorded before it, aggregates intervals that start and end at the same
//! source locations, and reports them sorted by cumulative cost.
//!
//! ```
//! use lapstat::checkpoint::{Checkpoint, Timestamp};
//! use lapstat::collector::Collector;
//! use lapstat::report;
//!
//! let mut collector = Collector::new();
//! for (line, micros) in [(10, 0), (20, 100), (10, 250), (20, 400)] {
//!     collector.record(Checkpoint::new("fileA", line, "main", Timestamp::from_micros(micros)));
//! }
//!
//! let ranked = report::rank(&collector.snapshot());
//! assert_eq!(ranked[0].count(), 2);
//! assert_eq!(ranked[0].total_duration_us(), 250);
//! assert_eq!(ranked[0].average_duration_us(), 125);
//! println!("{}", report::render(&ranked));
//! ```

pub mod aggregate;
pub mod checkpoint;
pub mod cli;
pub mod collector;
pub mod config;
pub mod csv_output;
pub mod demo;
pub mod global;
pub mod interval;
pub mod json_output;
pub mod report;
pub mod session;
pub mod shared;
pub mod sink;
pub mod trace;
