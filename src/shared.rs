//! Thread-safe collector handle
//!
//! One mutex guards both the pending checkpoints and the aggregate table, so
//! `record`, `snapshot` and `reset` never interleave. Checkpoints recorded from
//! different threads are still paired in arrival order; the handle only makes
//! access sound, it does not separate per-thread timelines.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::aggregate::Aggregate;
use crate::checkpoint::Checkpoint;
use crate::collector::{Collector, PairingPolicy};

/// Cloneable, `Send + Sync` handle to one [`Collector`]
#[derive(Debug, Clone, Default)]
pub struct SharedCollector {
    inner: Arc<Mutex<Collector>>,
}

impl SharedCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(policy: PairingPolicy) -> Self {
        Self::from(Collector::with_policy(policy))
    }

    pub fn record(&self, checkpoint: Checkpoint) {
        self.inner.lock().record(checkpoint);
    }

    pub fn snapshot(&self) -> Vec<Aggregate> {
        self.inner.lock().snapshot()
    }

    pub fn reset(&self) {
        self.inner.lock().reset();
    }

    pub fn interval_count(&self) -> u64 {
        self.inner.lock().interval_count()
    }

    /// Run `f` with exclusive access to the underlying collector
    pub fn with<R>(&self, f: impl FnOnce(&mut Collector) -> R) -> R {
        f(&mut self.inner.lock())
    }
}

impl From<Collector> for SharedCollector {
    fn from(collector: Collector) -> Self {
        Self {
            inner: Arc::new(Mutex::new(collector)),
        }
    }
}
