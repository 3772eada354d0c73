//! Destinations for finished reports
//!
//! The core never touches files or the environment; sinks do. A sink receives
//! already ranked aggregates and decides how to render and where to put them.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::aggregate::Aggregate;
use crate::report::{self, OutputFormat};

/// Errors raised while emitting a report
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("failed to write report to {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write report: {0}")]
    Stream(#[from] io::Error),

    #[error("failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("no log directory configured and $HOME is not set")]
    NoHomeDir,
}

pub type Result<T> = std::result::Result<T, SinkError>;

/// Consumer of ranked aggregates
pub trait ReportSink {
    fn emit(&mut self, ranked: &[Aggregate]) -> Result<()>;
}

/// Writes the rendered report to any `Write` (stderr, a buffer, a socket)
#[derive(Debug)]
pub struct WriterSink<W: Write> {
    writer: W,
    format: OutputFormat,
}

impl<W: Write> WriterSink<W> {
    pub fn new(writer: W, format: OutputFormat) -> Self {
        Self { writer, format }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl WriterSink<io::Stderr> {
    /// Console sink, matching where profilers traditionally print
    pub fn stderr(format: OutputFormat) -> Self {
        Self::new(io::stderr(), format)
    }
}

impl<W: Write> ReportSink for WriterSink<W> {
    fn emit(&mut self, ranked: &[Aggregate]) -> Result<()> {
        let text = report::render_as(ranked, self.format)?;
        self.writer.write_all(text.as_bytes())?;
        self.writer.flush()?;
        Ok(())
    }
}

/// Writes each report to a fresh timestamped file under a directory
#[derive(Debug, Clone)]
pub struct LogFileSink {
    dir: PathBuf,
    format: OutputFormat,
    last_path: Option<PathBuf>,
}

impl LogFileSink {
    pub fn new(dir: impl Into<PathBuf>, format: OutputFormat) -> Self {
        Self {
            dir: dir.into(),
            format,
            last_path: None,
        }
    }

    /// Sink writing under [`default_log_dir`]
    pub fn in_default_dir(format: OutputFormat) -> Result<Self> {
        Ok(Self::new(default_log_dir()?, format))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File written by the most recent `emit`
    pub fn last_path(&self) -> Option<&Path> {
        self.last_path.as_deref()
    }

    fn file_stem() -> String {
        let stamp = chrono::Local::now().format("%Y%m%d-%H%M%S%.3f");
        format!("lapstat-{stamp}")
    }

    fn extension(&self) -> &'static str {
        match self.format {
            OutputFormat::Text => "log",
            OutputFormat::Json => "json",
            OutputFormat::Csv => "csv",
        }
    }
}

/// Create `<stem>.<ext>` in `dir`, or `<stem>-N.<ext>` for the first free N
///
/// Files are opened with `create_new`, so a name taken by another writer
/// between attempts is skipped rather than overwritten.
fn create_unique(dir: &Path, stem: &str, extension: &str) -> Result<(PathBuf, File)> {
    let mut attempt = 0u32;
    loop {
        let name = match attempt {
            0 => format!("{stem}.{extension}"),
            n => format!("{stem}-{n}.{extension}"),
        };
        let path = dir.join(name);
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => return Ok((path, file)),
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists && attempt < u32::MAX => {
                attempt += 1;
            }
            Err(source) => return Err(SinkError::Io { path, source }),
        }
    }
}

impl ReportSink for LogFileSink {
    fn emit(&mut self, ranked: &[Aggregate]) -> Result<()> {
        fs::create_dir_all(&self.dir).map_err(|source| SinkError::Io {
            path: self.dir.clone(),
            source,
        })?;

        let text = report::render_as(ranked, self.format)?;
        let (path, mut file) = create_unique(&self.dir, &Self::file_stem(), self.extension())?;
        file.write_all(text.as_bytes())
            .map_err(|source| SinkError::Io {
                path: path.clone(),
                source,
            })?;

        tracing::debug!(path = %path.display(), "report saved");
        self.last_path = Some(path);
        Ok(())
    }
}

/// `$HOME/.lapstat/log`
pub fn default_log_dir() -> Result<PathBuf> {
    std::env::var_os("HOME")
        .filter(|home| !home.is_empty())
        .map(|home| PathBuf::from(home).join(".lapstat").join("log"))
        .ok_or(SinkError::NoHomeDir)
}
