//! Small instrumented workload used by `lapstat demo`
//!
//! A nested loop with a checkpoint in its body, a straight-line section and a
//! helper function with checkpoints on entry and exit. Enough to show repeated
//! intervals, one-off intervals and cross-function intervals in one report.

use std::hint::black_box;

use crate::checkpoint;
use crate::session::Session;

/// Run the workload, recording checkpoints into `session`
///
/// Returns the computed value so the work cannot be optimized away.
pub fn run(session: &mut Session, iterations: u32) -> f64 {
    let mut a = 1.2345_f64;
    checkpoint!(session);
    for _ in 0..iterations {
        for _ in 0..1_000 {
            a = black_box(a * 1.000_001);
        }
        checkpoint!(session);
    }

    for _ in 0..10_000 {
        a = black_box(a * 0.999_999);
    }
    checkpoint!(session);

    let c = divide_down(session, iterations);
    checkpoint!(session);

    a + c
}

fn divide_down(session: &mut Session, iterations: u32) -> f64 {
    let mut c = 1.2e24_f64;
    checkpoint!(session);
    for _ in 0..u64::from(iterations) * 500 {
        c = black_box(c / 1.1);
    }
    checkpoint!(session);
    c
}
