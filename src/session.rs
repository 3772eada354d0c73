//! Profiling sessions: a collector plus the sinks its report goes to
//!
//! Reporting happens at an explicit point, [`Session::finalize`]. For "report
//! whenever this scope ends, however it ends", wrap the session in a
//! [`SessionGuard`], which finalizes on drop (early returns and unwinding
//! included) and logs sink failures instead of panicking.

use std::ops::{Deref, DerefMut};

use crate::aggregate::Aggregate;
use crate::checkpoint::{Checkpoint, Clock, SystemClock};
use crate::collector::Collector;
use crate::config::ProfilerConfig;
use crate::report;
use crate::sink::{self, LogFileSink, ReportSink, SinkError, WriterSink};
use crate::trace::CheckpointTrace;

type BoxedSink = Box<dyn ReportSink + Send>;
type BoxedClock = Box<dyn Clock + Send + Sync>;

/// One profiling run
pub struct Session {
    config: ProfilerConfig,
    collector: Collector,
    clock: BoxedClock,
    sinks: Vec<BoxedSink>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("config", &self.config)
            .field("collector", &self.collector)
            .field("sinks", &self.sinks.len())
            .finish()
    }
}

impl Session {
    /// Session with the sinks `config` asks for (stderr and/or a log directory)
    pub fn new(config: ProfilerConfig) -> sink::Result<Self> {
        let mut sinks: Vec<BoxedSink> = Vec::new();
        if config.console {
            sinks.push(Box::new(WriterSink::stderr(config.format)));
        }
        if config.saves_reports() {
            let sink = match &config.log_dir {
                Some(dir) => LogFileSink::new(dir, config.format),
                None => LogFileSink::in_default_dir(config.format)?,
            };
            sinks.push(Box::new(sink));
        }
        Ok(Self::with_sinks(config, sinks))
    }

    /// Session reporting only to `sinks`; the config's console/persist flags are ignored
    pub fn with_sinks(config: ProfilerConfig, sinks: Vec<BoxedSink>) -> Self {
        Self {
            collector: Collector::with_policy(config.policy),
            config,
            clock: Box::new(SystemClock),
            sinks,
        }
    }

    /// Replace the clock used by [`Session::tick`]
    pub fn with_clock(mut self, clock: impl Clock + Send + Sync + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn add_sink(&mut self, sink: impl ReportSink + Send + 'static) {
        self.sinks.push(Box::new(sink));
    }

    pub fn config(&self) -> &ProfilerConfig {
        &self.config
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    pub fn collector(&self) -> &Collector {
        &self.collector
    }

    /// Record a checkpoint; no-op when profiling is disabled
    pub fn record(&mut self, checkpoint: Checkpoint) {
        if self.config.enabled {
            self.collector.record(checkpoint);
        }
    }

    /// Capture a checkpoint with the session clock and record it
    pub fn tick(&mut self, file: &str, line: u32, function: &str) {
        if self.config.enabled {
            let checkpoint = Checkpoint::capture(file, line, function, &*self.clock);
            self.collector.record(checkpoint);
        }
    }

    pub fn snapshot(&self) -> Vec<Aggregate> {
        self.collector.snapshot()
    }

    pub fn ranked(&self) -> Vec<Aggregate> {
        report::rank(&self.collector.snapshot())
    }

    /// Text table of the current statistics
    pub fn report(&self) -> String {
        report::render(&self.ranked())
    }

    /// Retained checkpoints as a trace (complete under batch replay)
    pub fn trace(&self) -> CheckpointTrace {
        CheckpointTrace::from_collector(&self.collector)
    }

    /// Clear collected data, keeping config and sinks
    pub fn reset(&mut self) {
        self.collector.reset();
    }

    /// Rank the statistics and hand them to every sink
    ///
    /// All sinks are tried even if one fails; the first failure is returned.
    /// A disabled session emits nothing.
    pub fn finalize(mut self) -> sink::Result<Vec<Aggregate>> {
        self.emit()
    }

    fn emit(&mut self) -> sink::Result<Vec<Aggregate>> {
        if !self.config.enabled {
            return Ok(Vec::new());
        }

        let ranked = self.ranked();
        tracing::debug!(
            identities = ranked.len(),
            intervals = self.collector.interval_count(),
            sinks = self.sinks.len(),
            "finalizing session"
        );

        let mut first_error: Option<SinkError> = None;
        for sink in &mut self.sinks {
            if let Err(err) = sink.emit(&ranked) {
                tracing::warn!(%err, "report sink failed");
                first_error.get_or_insert(err);
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(ranked),
        }
    }

    /// Finalize automatically when the returned guard goes out of scope
    pub fn guard(self) -> SessionGuard {
        SessionGuard {
            session: Some(self),
        }
    }
}

/// Scope guard that finalizes its session exactly once
///
/// ```
/// use lapstat::config::ProfilerConfig;
/// use lapstat::session::Session;
///
/// fn work() -> Result<(), String> {
///     let mut session = Session::new(ProfilerConfig::quiet()).unwrap().guard();
///     session.tick(file!(), line!(), "work");
///     Err("early exit".into()) // the report is still produced here
/// }
/// assert!(work().is_err());
/// ```
#[derive(Debug)]
pub struct SessionGuard {
    session: Option<Session>,
}

impl SessionGuard {
    /// Finalize now and get the outcome instead of having it logged
    pub fn finish(mut self) -> sink::Result<Vec<Aggregate>> {
        match self.session.take() {
            Some(session) => session.finalize(),
            None => Ok(Vec::new()),
        }
    }

    /// Disarm the guard and get the session back without finalizing
    pub fn into_inner(mut self) -> Option<Session> {
        self.session.take()
    }
}

impl Deref for SessionGuard {
    type Target = Session;

    fn deref(&self) -> &Session {
        // Only `finish`/`into_inner` empty the slot, and both consume the guard
        self.session
            .as_ref()
            .expect("session guard used after finish")
    }
}

impl DerefMut for SessionGuard {
    fn deref_mut(&mut self) -> &mut Session {
        self.session
            .as_mut()
            .expect("session guard used after finish")
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        if let Some(mut session) = self.session.take() {
            if let Err(err) = session.emit() {
                tracing::warn!(%err, "failed to emit report on scope exit");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkpoint::{ManualClock, Timestamp};
    use crate::collector::PairingPolicy;
    use parking_lot::Mutex;
    use std::io::{self, Write};
    use std::sync::Arc;

    /// Sink that keeps every emitted batch for inspection
    #[derive(Clone, Default)]
    struct CaptureSink {
        emitted: Arc<Mutex<Vec<Vec<Aggregate>>>>,
    }

    impl ReportSink for CaptureSink {
        fn emit(&mut self, ranked: &[Aggregate]) -> sink::Result<()> {
            self.emitted.lock().push(ranked.to_vec());
            Ok(())
        }
    }

    fn boxed(sink: impl ReportSink + Send + 'static) -> BoxedSink {
        Box::new(sink)
    }

    struct FailingWriter;

    impl Write for FailingWriter {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn clocked_session(capture: &CaptureSink) -> (Session, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        let session = Session::with_sinks(ProfilerConfig::quiet(), vec![boxed(capture.clone())])
            .with_clock(SharedClock(clock.clone()));
        (session, clock)
    }

    struct SharedClock(Arc<ManualClock>);

    impl Clock for SharedClock {
        fn now(&self) -> Timestamp {
            self.0.now()
        }
    }

    #[test]
    fn test_tick_uses_session_clock() {
        let capture = CaptureSink::default();
        let (mut session, clock) = clocked_session(&capture);

        session.tick("main.rs", 1, "main");
        clock.advance_micros(40);
        session.tick("main.rs", 2, "main");

        let snapshot = session.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].total_duration_us(), 40);
    }

    #[test]
    fn test_finalize_emits_ranked() {
        let capture = CaptureSink::default();
        let (mut session, clock) = clocked_session(&capture);

        session.tick("main.rs", 1, "main");
        clock.advance_micros(5);
        session.tick("main.rs", 2, "main");
        clock.advance_micros(50);
        session.tick("main.rs", 3, "main");

        let ranked = session.finalize().unwrap();
        assert_eq!(ranked[0].total_duration_us(), 50);

        let emitted = capture.emitted.lock();
        assert_eq!(emitted.len(), 1);
        assert_eq!(emitted[0], ranked);
    }

    #[test]
    fn test_disabled_session_records_nothing() {
        let capture = CaptureSink::default();
        let config = ProfilerConfig {
            enabled: false,
            ..ProfilerConfig::quiet()
        };
        let mut session = Session::with_sinks(config, vec![boxed(capture.clone())]);

        session.record(Checkpoint::new("a.rs", 1, "f", Timestamp::from_micros(0)));
        session.tick("a.rs", 2, "f");

        assert!(session.snapshot().is_empty());
        assert!(session.finalize().unwrap().is_empty());
        assert!(capture.emitted.lock().is_empty());
    }

    #[test]
    fn test_guard_finalizes_on_drop() {
        let capture = CaptureSink::default();
        {
            let (session, clock) = clocked_session(&capture);
            let mut guard = session.guard();
            guard.tick("a.rs", 1, "f");
            clock.advance_micros(3);
            guard.tick("a.rs", 2, "f");
        }
        let emitted = capture.emitted.lock();
        assert_eq!(emitted.len(), 1);
        assert_eq!(emitted[0][0].total_duration_us(), 3);
    }

    #[test]
    fn test_guard_finalizes_on_early_return() {
        fn run(capture: &CaptureSink) -> Result<(), &'static str> {
            let (session, _clock) = clocked_session(capture);
            let mut guard = session.guard();
            guard.tick("a.rs", 1, "run");
            guard.tick("a.rs", 2, "run");
            Err("bail")
        }

        let capture = CaptureSink::default();
        assert!(run(&capture).is_err());
        assert_eq!(capture.emitted.lock().len(), 1);
    }

    #[test]
    fn test_guard_finalizes_during_unwind() {
        let capture = CaptureSink::default();
        let inner = capture.clone();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(move || {
            let (session, _clock) = clocked_session(&inner);
            let mut guard = session.guard();
            guard.tick("a.rs", 1, "f");
            guard.tick("a.rs", 2, "f");
            panic!("boom");
        }));
        assert!(result.is_err());
        assert_eq!(capture.emitted.lock().len(), 1);
    }

    #[test]
    fn test_guard_finish_and_into_inner_emit_once() {
        let capture = CaptureSink::default();
        let (session, _clock) = clocked_session(&capture);
        session.guard().finish().unwrap();
        assert_eq!(capture.emitted.lock().len(), 1);

        let (session, _clock) = clocked_session(&capture);
        let session = session.guard().into_inner().unwrap();
        drop(session);
        assert_eq!(capture.emitted.lock().len(), 1);
    }

    #[test]
    fn test_failing_sink_does_not_stop_others() {
        let capture = CaptureSink::default();
        let mut session = Session::with_sinks(
            ProfilerConfig::quiet(),
            vec![
                boxed(WriterSink::new(FailingWriter, Default::default())),
                boxed(capture.clone()),
            ],
        );
        session.record(Checkpoint::new("a.rs", 1, "f", Timestamp::from_micros(0)));
        session.record(Checkpoint::new("a.rs", 2, "f", Timestamp::from_micros(1)));

        let err = session.finalize().unwrap_err();
        assert!(matches!(err, SinkError::Stream(_)));
        assert_eq!(capture.emitted.lock().len(), 1);
    }

    #[test]
    fn test_persisting_session_writes_log() {
        let tmp = tempfile::TempDir::new().unwrap();
        let config = ProfilerConfig {
            persist: true,
            log_dir: Some(tmp.path().to_path_buf()),
            ..ProfilerConfig::quiet()
        };
        let mut session = Session::new(config).unwrap();
        session.record(Checkpoint::new("a.rs", 1, "f", Timestamp::from_micros(0)));
        session.record(Checkpoint::new("a.rs", 2, "f", Timestamp::from_micros(1_000)));
        session.finalize().unwrap();

        assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_batch_session_trace() {
        let config = ProfilerConfig {
            policy: PairingPolicy::BatchReplay,
            ..ProfilerConfig::quiet()
        };
        let mut session = Session::new(config).unwrap();
        for line in 1..=4 {
            session.record(Checkpoint::new("a.rs", line, "f", Timestamp::from_micros(line as i64)));
        }
        let trace = session.trace();
        assert_eq!(trace.len(), 4);
        assert_eq!(trace.replay(), session.snapshot());
    }

    #[test]
    fn test_log_dir_from_toml_writes_log() {
        let tmp = tempfile::TempDir::new().unwrap();
        let toml = format!(
            "console = false\nlog_dir = {:?}\n",
            tmp.path().display().to_string()
        );
        let config = ProfilerConfig::from_toml_str(&toml).unwrap();
        assert!(!config.persist);

        let mut session = Session::new(config).unwrap();
        session.record(Checkpoint::new("a.rs", 1, "f", Timestamp::from_micros(0)));
        session.record(Checkpoint::new("a.rs", 2, "f", Timestamp::from_micros(70)));
        session.finalize().unwrap();

        assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 1);
    }
}
