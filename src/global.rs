//! Process-wide session for quick instrumentation
//!
//! Sprinkling `tick!()` through a program is the fastest way to find where the
//! time goes, but it needs a session every call site can reach. This module
//! holds at most one, behind a mutex, with an explicit lifecycle:
//!
//! 1. [`install`] a session near the start of `main`
//! 2. call [`tick!`](crate::tick) wherever a checkpoint belongs
//! 3. [`finalize`] before exiting (or let the [`GlobalGuard`] returned by
//!    [`install_guarded`] do it)
//!
//! Without an installed session `tick!()` does nothing.

use parking_lot::Mutex;

use crate::aggregate::Aggregate;
use crate::checkpoint::Checkpoint;
use crate::session::Session;
use crate::sink;

static GLOBAL: Mutex<Option<Session>> = parking_lot::const_mutex(None);

/// Install `session` as the process-wide session, returning the one it replaces
pub fn install(session: Session) -> Option<Session> {
    let previous = GLOBAL.lock().replace(session);
    if previous.is_some() {
        tracing::warn!("replacing an installed profiling session without finalizing it");
    }
    previous
}

/// Install `session` and get a guard that finalizes it when dropped
pub fn install_guarded(session: Session) -> GlobalGuard {
    install(session);
    GlobalGuard { _private: () }
}

pub fn is_installed() -> bool {
    GLOBAL.lock().is_some()
}

/// Capture a checkpoint into the installed session, if any
pub fn tick(file: &str, line: u32, function: &str) {
    if let Some(session) = GLOBAL.lock().as_mut() {
        session.tick(file, line, function);
    }
}

/// Record an already captured checkpoint into the installed session, if any
pub fn record(checkpoint: Checkpoint) {
    if let Some(session) = GLOBAL.lock().as_mut() {
        session.record(checkpoint);
    }
}

/// Run `f` against the installed session
pub fn with<R>(f: impl FnOnce(&mut Session) -> R) -> Option<R> {
    GLOBAL.lock().as_mut().map(f)
}

/// Remove the installed session and finalize it
///
/// `None` when nothing was installed.
pub fn finalize() -> Option<sink::Result<Vec<Aggregate>>> {
    // Take it out first so sinks never run under the lock
    let session = GLOBAL.lock().take();
    session.map(Session::finalize)
}

/// Remove the installed session without reporting
pub fn uninstall() -> Option<Session> {
    GLOBAL.lock().take()
}

/// Finalizes the process-wide session on drop
#[derive(Debug)]
#[must_use = "the session is finalized when the guard is dropped"]
pub struct GlobalGuard {
    _private: (),
}

impl Drop for GlobalGuard {
    fn drop(&mut self) {
        if let Some(Err(err)) = finalize() {
            tracing::warn!(%err, "failed to emit report on scope exit");
        }
    }
}

/// Record a checkpoint at the call site into the process-wide session
///
/// ```
/// use lapstat::{global, tick};
/// use lapstat::config::ProfilerConfig;
/// use lapstat::session::Session;
///
/// global::install(Session::new(ProfilerConfig::quiet()).unwrap());
/// tick!();
/// let _work: u64 = (0..1_000u64).sum();
/// tick!();
/// let ranked = global::finalize().unwrap().unwrap();
/// assert_eq!(ranked.len(), 1);
/// ```
#[macro_export]
macro_rules! tick {
    () => {{
        fn __probe() {}
        $crate::global::tick(
            file!(),
            line!(),
            $crate::checkpoint::__function_name(::std::any::type_name_of_val(&__probe)),
        );
    }};
}
