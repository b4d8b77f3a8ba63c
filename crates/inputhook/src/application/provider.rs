//! The native record provider contract.
//!
//! A [`RecordProvider`] wraps one OS hook facility (the X11 RECORD extension
//! on Linux, an in-memory queue in tests).  The engine drives it through a
//! fixed sequence: open two connections, handshake on the control one,
//! allocate a range and create a context on the data one, then hand the data
//! connection to a [`Delivery`](super::delivery::Delivery) strategy on the
//! worker thread.
//!
//! # Why two connections?
//!
//! While a context is enabled the data connection is owned by the provider's
//! delivery call (blocked inside it, or mid-way through reply processing).
//! Anything the caller thread needs to do during a session, such as disabling
//! or freeing the context, must go through the control connection.  The trait
//! makes that explicit by taking `control` and `data` as separate arguments.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use inputhook_core::{KeyTranslationTable, RawEvent};

use super::engine::HookError;

/// One item produced by a provider's delivery loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceSignal {
    /// The context is live; events follow.
    Started,
    /// One native input record.
    Event(RawEvent),
    /// The context was disabled; no more events follow.
    Ended,
}

/// How a provider hands over records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryMode {
    /// `enable` blocks and calls the sink until the context is disabled.
    Blocking,
    /// `enable_async` returns at once; the worker drains with `process_pending`.
    Polling {
        /// Sleep between drain iterations; `None` spins.
        backoff: Option<Duration>,
    },
}

/// Native hook facility driven by [`HookEngine`](super::engine::HookEngine).
///
/// All methods are called from at most two threads: the caller thread (for
/// `open`, handshakes, `disable`, `free_context`, `close`) and the worker
/// thread (for `enable`, `enable_async`, `process_pending`).
pub trait RecordProvider: Send + Sync + 'static {
    /// A display / server connection handle.
    type Connection: Send + Sync + 'static;
    /// An event range description, consumed by `create_context`.
    type Range;
    /// A capture context handle.
    type Context: Copy + Send + Sync + fmt::Debug + 'static;

    fn delivery_mode(&self) -> DeliveryMode;

    /// Opens a connection.  `None` selects the platform default display.
    fn open(&self, display_name: Option<&str>) -> Result<Self::Connection, HookError>;

    /// Checks the capture extension is present and returns its version.
    fn query_version(&self, control: &Self::Connection) -> Result<(i32, i32), HookError>;

    /// Snapshots the keyboard mapping for the session.
    fn key_table(
        &self,
        control: &Self::Connection,
    ) -> Result<Arc<dyn KeyTranslationTable>, HookError>;

    /// The desktop's multi-click interval, if the platform exposes one.
    fn multi_click_time(&self, control: &Self::Connection) -> Option<Duration>;

    /// Allocates a range covering key, button, and motion events.
    fn alloc_range(&self) -> Result<Self::Range, HookError>;

    /// Creates a context recording `range` from all clients.  The range is
    /// released whether or not creation succeeds.
    fn create_context(
        &self,
        data: &Self::Connection,
        range: Self::Range,
    ) -> Result<Self::Context, HookError>;

    /// Enables `context` and blocks, feeding `sink`, until it is disabled.
    fn enable(
        &self,
        data: &Self::Connection,
        context: Self::Context,
        sink: &mut dyn FnMut(SourceSignal),
    ) -> Result<(), HookError>;

    /// Enables `context` without blocking.
    fn enable_async(&self, data: &Self::Connection, context: Self::Context)
        -> Result<(), HookError>;

    /// Feeds every record already received on `data` to `sink`.
    fn process_pending(
        &self,
        data: &Self::Connection,
        sink: &mut dyn FnMut(SourceSignal),
    ) -> Result<(), HookError>;

    /// Disables `context`; the delivery call on `data` then returns.
    fn disable(&self, control: &Self::Connection, context: Self::Context)
        -> Result<(), HookError>;

    fn free_context(&self, control: &Self::Connection, context: Self::Context);

    fn close(&self, connection: Self::Connection);
}
