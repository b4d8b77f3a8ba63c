//! In-memory record provider for tests.
//!
//! Lets tests inject synthetic [`RawEvent`]s into a running engine without a
//! display server, fail any step of the startup sequence on demand, and check
//! afterwards that every connection, range, and context was released.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use inputhook_core::{KeyTranslationTable, RawEvent, StaticKeyTable};

use crate::application::engine::HookError;
use crate::application::provider::{DeliveryMode, RecordProvider, SourceSignal};

/// The reported extension version.
pub const MOCK_VERSION: (i32, i32) = (1, 13);

/// A step of the startup (or shutdown) sequence that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailPoint {
    /// The first `open` of a session (the engine opens control first).
    OpenControl,
    /// The second `open` of a session.
    OpenData,
    QueryVersion,
    KeyTable,
    AllocRange,
    CreateContext,
    Enable,
    Disable,
}

enum Command {
    Event(RawEvent),
    Disable,
}

#[derive(Default)]
struct MockShared {
    failure: Mutex<Option<FailPoint>>,
    sender: Mutex<Option<Sender<Command>>>,
    receiver: Mutex<Option<Receiver<Command>>>,
    announce_start: AtomicBool,
    open_connections: AtomicUsize,
    live_contexts: AtomicUsize,
    live_ranges: AtomicUsize,
    enable_calls: AtomicUsize,
    next_id: AtomicU32,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockShared {
    fn fails_at(&self, point: FailPoint) -> bool {
        *lock(&self.failure) == Some(point)
    }
}

#[derive(Debug)]
pub struct MockConnection {
    id: u32,
}

impl MockConnection {
    pub fn id(&self) -> u32 {
        self.id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockContext(pub u32);

/// An allocated range; dropping it releases it.
pub struct MockRange {
    shared: Arc<MockShared>,
}

impl Drop for MockRange {
    fn drop(&mut self) {
        self.shared.live_ranges.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Test-side handle onto a [`MockRecordProvider`] owned by an engine.
#[derive(Clone)]
pub struct MockHandle {
    shared: Arc<MockShared>,
}

impl MockHandle {
    /// Injects a record, as if captured from hardware.
    ///
    /// Returns `false` if no context is currently enabled.
    pub fn inject(&self, event: RawEvent) -> bool {
        match lock(&self.shared.sender).as_ref() {
            Some(sender) => sender.send(Command::Event(event)).is_ok(),
            None => false,
        }
    }

    /// Ends delivery from the provider side, as when the server drops the
    /// context.  Returns `false` if no context is currently enabled.
    pub fn end_delivery(&self) -> bool {
        match lock(&self.shared.sender).take() {
            Some(sender) => sender.send(Command::Disable).is_ok(),
            None => false,
        }
    }

    pub fn fail_at(&self, point: FailPoint) {
        *lock(&self.shared.failure) = Some(point);
    }

    pub fn clear_failure(&self) {
        *lock(&self.shared.failure) = None;
    }

    pub fn open_connections(&self) -> usize {
        self.shared.open_connections.load(Ordering::SeqCst)
    }

    pub fn live_contexts(&self) -> usize {
        self.shared.live_contexts.load(Ordering::SeqCst)
    }

    pub fn live_ranges(&self) -> usize {
        self.shared.live_ranges.load(Ordering::SeqCst)
    }

    /// Number of `enable` / `enable_async` calls, successful or not.
    pub fn enable_calls(&self) -> usize {
        self.shared.enable_calls.load(Ordering::SeqCst)
    }
}

/// A [`RecordProvider`] backed by an in-memory command queue.
pub struct MockRecordProvider {
    mode: DeliveryMode,
    keys: Arc<dyn KeyTranslationTable>,
    multi_click: Option<Duration>,
    trailing: Option<RawEvent>,
    shared: Arc<MockShared>,
}

impl MockRecordProvider {
    pub fn blocking() -> Self {
        Self::with_mode(DeliveryMode::Blocking)
    }

    pub fn polling(backoff: Option<Duration>) -> Self {
        Self::with_mode(DeliveryMode::Polling { backoff })
    }

    fn with_mode(mode: DeliveryMode) -> Self {
        Self {
            mode,
            keys: Arc::new(StaticKeyTable::new()),
            multi_click: None,
            trailing: None,
            shared: Arc::new(MockShared::default()),
        }
    }

    pub fn with_key_table(mut self, keys: impl KeyTranslationTable + 'static) -> Self {
        self.keys = Arc::new(keys);
        self
    }

    /// The interval reported by `multi_click_time`.
    pub fn with_multi_click(mut self, interval: Duration) -> Self {
        self.multi_click = Some(interval);
        self
    }

    /// A record delivered after the context is disabled, before the loop ends.
    pub fn with_trailing_event(mut self, event: RawEvent) -> Self {
        self.trailing = Some(event);
        self
    }

    pub fn failing_at(self, point: FailPoint) -> Self {
        self.handle().fail_at(point);
        self
    }

    pub fn handle(&self) -> MockHandle {
        MockHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    fn check(&self, point: FailPoint, err: impl FnOnce() -> HookError) -> Result<(), HookError> {
        if self.shared.fails_at(point) {
            Err(err())
        } else {
            Ok(())
        }
    }

    /// Opens the command queue a delivery loop reads from.
    fn open_queue(&self) -> Receiver<Command> {
        let (sender, receiver) = mpsc::channel();
        *lock(&self.shared.sender) = Some(sender);
        receiver
    }

    /// Feeds one command to `sink`.  Returns `false` once the context is disabled.
    fn deliver(&self, command: Command, sink: &mut dyn FnMut(SourceSignal)) -> bool {
        match command {
            Command::Event(event) => {
                sink(SourceSignal::Event(event));
                true
            }
            Command::Disable => {
                if let Some(event) = self.trailing {
                    sink(SourceSignal::Event(event));
                }
                sink(SourceSignal::Ended);
                false
            }
        }
    }
}

impl RecordProvider for MockRecordProvider {
    type Connection = MockConnection;
    type Range = MockRange;
    type Context = MockContext;

    fn delivery_mode(&self) -> DeliveryMode {
        self.mode
    }

    fn open(&self, display_name: Option<&str>) -> Result<MockConnection, HookError> {
        let point = match self.shared.open_connections.load(Ordering::SeqCst) % 2 {
            0 => FailPoint::OpenControl,
            _ => FailPoint::OpenData,
        };
        self.check(point, || HookError::Connection {
            display: display_name.unwrap_or("mock").to_string(),
        })?;
        self.shared.open_connections.fetch_add(1, Ordering::SeqCst);
        Ok(MockConnection {
            id: self.shared.next_id.fetch_add(1, Ordering::SeqCst),
        })
    }

    fn query_version(&self, _control: &MockConnection) -> Result<(i32, i32), HookError> {
        self.check(FailPoint::QueryVersion, || {
            HookError::ExtensionUnavailable("mock record extension disabled".into())
        })?;
        Ok(MOCK_VERSION)
    }

    fn key_table(
        &self,
        _control: &MockConnection,
    ) -> Result<Arc<dyn KeyTranslationTable>, HookError> {
        self.check(FailPoint::KeyTable, || {
            HookError::ResourceAllocation("mock keyboard mapping unavailable".into())
        })?;
        Ok(Arc::clone(&self.keys))
    }

    fn multi_click_time(&self, _control: &MockConnection) -> Option<Duration> {
        self.multi_click
    }

    fn alloc_range(&self) -> Result<MockRange, HookError> {
        self.check(FailPoint::AllocRange, || {
            HookError::ResourceAllocation("mock range allocation failed".into())
        })?;
        self.shared.live_ranges.fetch_add(1, Ordering::SeqCst);
        Ok(MockRange {
            shared: Arc::clone(&self.shared),
        })
    }

    fn create_context(
        &self,
        _data: &MockConnection,
        range: MockRange,
    ) -> Result<MockContext, HookError> {
        drop(range);
        self.check(FailPoint::CreateContext, || {
            HookError::ResourceAllocation("mock context creation failed".into())
        })?;
        self.shared.live_contexts.fetch_add(1, Ordering::SeqCst);
        Ok(MockContext(self.shared.next_id.fetch_add(1, Ordering::SeqCst)))
    }

    fn enable(
        &self,
        _data: &MockConnection,
        _context: MockContext,
        sink: &mut dyn FnMut(SourceSignal),
    ) -> Result<(), HookError> {
        self.shared.enable_calls.fetch_add(1, Ordering::SeqCst);
        self.check(FailPoint::Enable, || {
            HookError::ContextEnable("mock context refused".into())
        })?;

        let receiver = self.open_queue();
        sink(SourceSignal::Started);
        while let Ok(command) = receiver.recv() {
            if !self.deliver(command, sink) {
                break;
            }
        }
        Ok(())
    }

    fn enable_async(&self, _data: &MockConnection, _context: MockContext) -> Result<(), HookError> {
        self.shared.enable_calls.fetch_add(1, Ordering::SeqCst);
        self.check(FailPoint::Enable, || {
            HookError::ContextEnable("mock context refused".into())
        })?;

        let receiver = self.open_queue();
        *lock(&self.shared.receiver) = Some(receiver);
        self.shared.announce_start.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn process_pending(
        &self,
        _data: &MockConnection,
        sink: &mut dyn FnMut(SourceSignal),
    ) -> Result<(), HookError> {
        if self.shared.announce_start.swap(false, Ordering::SeqCst) {
            sink(SourceSignal::Started);
        }

        // Drain under the lock, deliver outside it.
        let pending: Vec<Command> = match lock(&self.shared.receiver).as_ref() {
            Some(receiver) => receiver.try_iter().collect(),
            None => return Ok(()),
        };
        for command in pending {
            if !self.deliver(command, sink) {
                *lock(&self.shared.receiver) = None;
                break;
            }
        }
        Ok(())
    }

    fn disable(&self, _control: &MockConnection, _context: MockContext) -> Result<(), HookError> {
        self.check(FailPoint::Disable, || {
            HookError::ContextDisable("mock context stuck".into())
        })?;
        if let Some(sender) = lock(&self.shared.sender).take() {
            // The loop may already have exited; nothing left to wake then.
            let _ = sender.send(Command::Disable);
        }
        Ok(())
    }

    fn free_context(&self, _control: &MockConnection, _context: MockContext) {
        self.shared.live_contexts.fetch_sub(1, Ordering::SeqCst);
    }

    fn close(&self, _connection: MockConnection) {
        self.shared.open_connections.fetch_sub(1, Ordering::SeqCst);
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
