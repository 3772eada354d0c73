//! Checkpoint traces: the raw checkpoint log, saved for later replay
//!
//! A trace is what the batch-replay policy retains. Saving it lets a run be
//! re-analyzed (or rendered in another format) without re-running the program.
//!
//! ```json
//! {
//!   "version": 1,
//!   "checkpoints": [
//!     { "file": "src/main.rs", "line": 12, "function": "main", "timestamp_ns": 1000 }
//!   ]
//! }
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::aggregate::Aggregate;
use crate::checkpoint::{Checkpoint, Timestamp};
use crate::collector::{self, Collector};

pub const TRACE_VERSION: u32 = 1;

/// Errors for trace persistence
#[derive(Error, Debug)]
pub enum TraceError {
    #[error("failed to access trace {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed trace: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unsupported trace version {found} (expected {})", TRACE_VERSION)]
    UnsupportedVersion { found: u32 },

    #[error("checkpoint {index} has line 0; lines start at 1")]
    InvalidLine { index: usize },
}

pub type Result<T> = std::result::Result<T, TraceError>;

/// One serialized checkpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceEntry {
    pub file: String,
    pub line: u32,
    #[serde(default)]
    pub function: String,
    pub timestamp_ns: i64,
}

impl From<&Checkpoint> for TraceEntry {
    fn from(cp: &Checkpoint) -> Self {
        Self {
            file: cp.file().to_string(),
            line: cp.line(),
            function: cp.function().to_string(),
            timestamp_ns: cp.timestamp().as_nanos(),
        }
    }
}

impl From<&TraceEntry> for Checkpoint {
    fn from(entry: &TraceEntry) -> Self {
        Checkpoint::new(
            entry.file.clone(),
            entry.line,
            entry.function.clone(),
            Timestamp::from_nanos(entry.timestamp_ns),
        )
    }
}

/// Ordered checkpoint log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointTrace {
    pub version: u32,
    pub checkpoints: Vec<TraceEntry>,
}

impl Default for CheckpointTrace {
    fn default() -> Self {
        Self {
            version: TRACE_VERSION,
            checkpoints: Vec::new(),
        }
    }
}

impl CheckpointTrace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Trace of the checkpoints a collector still holds
    ///
    /// Complete only for collectors using the batch-replay policy; a sliding
    /// collector holds just its pending checkpoint.
    pub fn from_collector(collector: &Collector) -> Self {
        Self {
            version: TRACE_VERSION,
            checkpoints: collector.checkpoints().map(TraceEntry::from).collect(),
        }
    }

    pub fn push(&mut self, checkpoint: &Checkpoint) {
        self.checkpoints.push(TraceEntry::from(checkpoint));
    }

    pub fn len(&self) -> usize {
        self.checkpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checkpoints.is_empty()
    }

    /// Checkpoints in recorded order
    pub fn to_checkpoints(&self) -> Vec<Checkpoint> {
        self.checkpoints.iter().map(Checkpoint::from).collect()
    }

    /// Aggregates of the trace, in first-seen order
    pub fn replay(&self) -> Vec<Aggregate> {
        collector::replay(&self.to_checkpoints())
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse and validate a trace document
    pub fn from_json(json: &str) -> Result<Self> {
        let trace: Self = serde_json::from_str(json)?;
        if trace.version != TRACE_VERSION {
            return Err(TraceError::UnsupportedVersion {
                found: trace.version,
            });
        }
        if let Some(index) = trace.checkpoints.iter().position(|e| e.line == 0) {
            return Err(TraceError::InvalidLine { index });
        }
        Ok(trace)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let json = self.to_json()?;
        fs::write(path, json).map_err(|source| TraceError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|source| TraceError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }
}
