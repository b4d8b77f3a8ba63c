//! Hook lifecycle: start, stop, and the worker thread.
//!
//! # State machine
//!
//! ```text
//! Stopped ──start()──▶ Starting ──worker sees Started──▶ Running
//!    ▲                    │                                 │
//!    └── start failure ◀──┘                              stop()
//!    │                                                      ▼
//!    └────────────── worker joined, resources freed ◀── Stopping
//! ```
//!
//! `start()` and `stop()` are serialized by the control lock, which also owns
//! the live [`Session`].  The state flag lives behind its own mutex and
//! condition variable: the worker flips it and `start()` waits on it.  Events
//! that reach the worker while the state is not `Running` are trailing events
//! and are dropped before translation.

use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info, trace, warn};

use super::delivery::{self, Delivery};
use super::listener::Listener;
use super::pipeline::EventPipeline;
use super::provider::{RecordProvider, SourceSignal};

/// Multi-click interval used when neither settings nor the provider supply one.
pub const DEFAULT_MULTI_CLICK: Duration = Duration::from_millis(200);

const WORKER_THREAD_NAME: &str = "inputhook-worker";

/// Errors returned by [`HookEngine`] and [`RecordProvider`] implementations.
#[derive(Debug, Error)]
pub enum HookError {
    #[error("hook is already running")]
    AlreadyRunning,

    #[error("hook is not running")]
    NotRunning,

    #[error("could not open display connection to {display}")]
    Connection { display: String },

    #[error("capture extension unavailable: {0}")]
    ExtensionUnavailable(String),

    #[error("failed to allocate capture resource: {0}")]
    ResourceAllocation(String),

    #[error("failed to enable capture context: {0}")]
    ContextEnable(String),

    #[error("failed to disable capture context: {0}")]
    ContextDisable(String),

    #[error("failed to spawn hook worker thread: {0}")]
    ThreadSpawn(#[source] io::Error),

    #[error("hook worker thread panicked")]
    WorkerPanicked,
}

/// Lifecycle state of one engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookState {
    Stopped,
    Starting,
    Running,
    Stopping,
}

/// Per-engine options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineSettings {
    /// Display to connect to; `None` uses the platform default.
    pub display_name: Option<String>,
    /// Overrides the provider's multi-click interval.
    pub multi_click: Option<Duration>,
}

struct Shared {
    state: Mutex<HookState>,
    changed: Condvar,
    listener_failures: Arc<AtomicU64>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, HookState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn get(&self) -> HookState {
        *self.lock()
    }

    fn set(&self, next: HookState) {
        *self.lock() = next;
        self.changed.notify_all();
    }

    /// Moves to `next` only from `from`.  Returns whether the move happened.
    fn transition(&self, from: HookState, next: HookState) -> bool {
        let mut state = self.lock();
        if *state != from {
            return false;
        }
        *state = next;
        drop(state);
        self.changed.notify_all();
        true
    }
}

/// The control and data connections plus the context created on them.
///
/// Dropping frees the context on the control connection and closes both
/// connections, so a partially built value unwinds a failed start.
struct Connections<P: RecordProvider> {
    provider: Arc<P>,
    control: Option<P::Connection>,
    data: Option<P::Connection>,
    context: Option<P::Context>,
}

impl<P: RecordProvider> Connections<P> {
    fn new(provider: Arc<P>) -> Self {
        Self {
            provider,
            control: None,
            data: None,
            context: None,
        }
    }
}

impl<P: RecordProvider> Drop for Connections<P> {
    fn drop(&mut self) {
        if let (Some(context), Some(control)) = (self.context.take(), self.control.as_ref()) {
            self.provider.free_context(control, context);
        }
        if let Some(data) = self.data.take() {
            self.provider.close(data);
        }
        if let Some(control) = self.control.take() {
            self.provider.close(control);
        }
    }
}

struct Session<P: RecordProvider> {
    connections: Arc<Connections<P>>,
    delivery: Arc<dyn Delivery<P>>,
    worker: JoinHandle<Result<(), HookError>>,
}

impl<P: RecordProvider> Session<P> {
    /// Joins the worker, then releases every native resource.
    fn finish(self) -> Result<(), HookError> {
        let status = self.worker.join().unwrap_or(Err(HookError::WorkerPanicked));
        drop(self.connections);
        status
    }
}

/// A global input hook bound to one provider and one listener.
pub struct HookEngine<P: RecordProvider> {
    provider: Arc<P>,
    listener: Arc<dyn Listener>,
    settings: EngineSettings,
    shared: Arc<Shared>,
    control: Mutex<Option<Session<P>>>,
}

impl<P: RecordProvider> HookEngine<P> {
    pub fn new(provider: P, listener: Arc<dyn Listener>, settings: EngineSettings) -> Self {
        Self {
            provider: Arc::new(provider),
            listener,
            settings,
            shared: Arc::new(Shared {
                state: Mutex::new(HookState::Stopped),
                changed: Condvar::new(),
                listener_failures: Arc::new(AtomicU64::new(0)),
            }),
            control: Mutex::new(None),
        }
    }

    /// `true` only while events are being delivered.
    pub fn is_running(&self) -> bool {
        self.shared.get() == HookState::Running
    }

    pub fn state(&self) -> HookState {
        self.shared.get()
    }

    /// Listener calls that returned an error or panicked, over the engine's life.
    pub fn listener_failures(&self) -> u64 {
        self.shared.listener_failures.load(Ordering::Relaxed)
    }

    /// Starts capturing.  Blocks until the worker reports the context live.
    ///
    /// # Errors
    ///
    /// [`HookError::AlreadyRunning`] if a session is active; otherwise the
    /// first failure of the startup sequence, after everything acquired so
    /// far has been released.
    pub fn start(&self) -> Result<(), HookError> {
        let mut control = self.lock_control();

        if let Some(session) = control.take() {
            if self.shared.get() == HookState::Running {
                *control = Some(session);
                return Err(HookError::AlreadyRunning);
            }
            // The worker ended on its own; reap it before starting over.
            if let Err(err) = session.finish() {
                debug!(error = %err, "previous session ended with an error");
            }
        }

        self.shared.set(HookState::Starting);
        match self.launch() {
            Ok(session) => {
                *control = Some(session);
                info!("input hook running");
                Ok(())
            }
            Err(err) => {
                self.shared.set(HookState::Stopped);
                warn!(error = %err, "input hook failed to start");
                Err(err)
            }
        }
    }

    /// Stops capturing and releases every native resource.
    ///
    /// # Errors
    ///
    /// [`HookError::NotRunning`] if no session is running (a session whose
    /// worker already ended is released first);
    /// [`HookError::ContextDisable`] if the context could not be disabled (the
    /// session is kept and stop may be retried); otherwise the worker's exit
    /// status.
    pub fn stop(&self) -> Result<(), HookError> {
        let mut control = self.lock_control();
        let Some(session) = control.take() else {
            return Err(HookError::NotRunning);
        };

        if !self.shared.transition(HookState::Running, HookState::Stopping) {
            // The worker ended on its own; release what it left behind.
            let status = session.finish();
            self.shared.set(HookState::Stopped);
            debug!(?status, "reaped a session that had already ended");
            return Err(HookError::NotRunning);
        }

        info!("input hook stopping");
        if let Err(err) = self.interrupt(&session) {
            let restored = if session.worker.is_finished() {
                HookState::Stopped
            } else {
                HookState::Running
            };
            self.shared.set(restored);
            *control = Some(session);
            warn!(error = %err, "input hook could not be stopped");
            return Err(err);
        }

        let status = session.finish();
        self.shared.set(HookState::Stopped);
        info!("input hook stopped");
        status
    }

    fn lock_control(&self) -> MutexGuard<'_, Option<Session<P>>> {
        self.control.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn interrupt(&self, session: &Session<P>) -> Result<(), HookError> {
        let connections = &session.connections;
        match (connections.control.as_ref(), connections.context) {
            (Some(control), Some(context)) => {
                session.delivery.interrupt(&self.provider, control, context)
            }
            _ => Err(HookError::ContextDisable("capture context not acquired".into())),
        }
    }

    /// Acquires connections and context, spawns the worker, and waits for it.
    fn launch(&self) -> Result<Session<P>, HookError> {
        let provider = &self.provider;
        let display = self.settings.display_name.as_deref();
        let mut connections = Connections::new(Arc::clone(provider));

        let control = connections.control.insert(provider.open(display)?);
        let (major, minor) = provider.query_version(control)?;
        debug!(major, minor, "capture extension present");
        let keys = provider.key_table(control)?;
        let multi_click = self
            .settings
            .multi_click
            .or_else(|| provider.multi_click_time(control))
            .unwrap_or(DEFAULT_MULTI_CLICK);
        debug!(?multi_click, "multi-click threshold");

        let data = connections.data.insert(provider.open(display)?);
        let range = provider.alloc_range()?;
        let context = provider.create_context(data, range)?;
        connections.context = Some(context);
        debug!(?context, "capture context created");

        let connections = Arc::new(connections);
        let delivery = delivery::for_mode::<P>(provider.delivery_mode());
        let pipeline = EventPipeline::new(keys, Arc::clone(&self.listener), multi_click)
            .with_failure_counter(Arc::clone(&self.shared.listener_failures));

        let worker = {
            let provider = Arc::clone(provider);
            let connections = Arc::clone(&connections);
            let delivery = Arc::clone(&delivery);
            let shared = Arc::clone(&self.shared);
            thread::Builder::new()
                .name(WORKER_THREAD_NAME.into())
                .spawn(move || {
                    run_worker(
                        provider.as_ref(),
                        connections.as_ref(),
                        delivery.as_ref(),
                        &shared,
                        pipeline,
                    )
                })
                .map_err(HookError::ThreadSpawn)?
        };

        let session = Session {
            connections,
            delivery,
            worker,
        };

        let mut state = self.shared.lock();
        while *state == HookState::Starting {
            state = self
                .shared
                .changed
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
        let running = *state == HookState::Running;
        drop(state);

        if running {
            return Ok(session);
        }
        match session.finish() {
            Err(err) => Err(err),
            Ok(()) => Err(HookError::ContextEnable("delivery ended before start".into())),
        }
    }
}

impl<P: RecordProvider> Drop for HookEngine<P> {
    fn drop(&mut self) {
        match self.stop() {
            Ok(()) | Err(HookError::NotRunning) => {}
            Err(err) => warn!(error = %err, "input hook did not stop cleanly"),
        }
    }
}

/// Worker thread body: runs delivery and feeds the pipeline.
fn run_worker<P: RecordProvider>(
    provider: &P,
    connections: &Connections<P>,
    delivery: &dyn Delivery<P>,
    shared: &Shared,
    mut pipeline: EventPipeline,
) -> Result<(), HookError> {
    let (Some(data), Some(context)) = (connections.data.as_ref(), connections.context) else {
        shared.transition(HookState::Starting, HookState::Stopped);
        return Err(HookError::ContextEnable("capture context not acquired".into()));
    };

    let mut started = false;
    let mut sink = |signal: SourceSignal| match signal {
        SourceSignal::Started => {
            started = true;
            shared.transition(HookState::Starting, HookState::Running);
        }
        SourceSignal::Event(raw) => {
            if shared.get() == HookState::Running {
                pipeline.process(raw);
            } else {
                trace!(?raw, "trailing event dropped");
            }
        }
        SourceSignal::Ended => debug!("capture context reported end of data"),
    };

    let result = delivery.run(provider, data, context, &mut sink);

    // A worker that exits while Starting or Running ended on its own.
    {
        let mut state = shared.lock();
        if matches!(*state, HookState::Starting | HookState::Running) {
            *state = HookState::Stopped;
        }
    }
    shared.changed.notify_all();

    match result {
        Err(err) => Err(err),
        Ok(()) if !started => Err(HookError::ContextEnable("delivery ended before start".into())),
        Ok(()) => Ok(()),
    }
}
