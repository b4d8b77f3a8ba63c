//! The consumer-facing listener contract.

use std::error::Error as StdError;
use std::sync::mpsc;

use inputhook_core::NativeEvent;
use thiserror::Error;

/// Error returned by a [`Listener`].  Contained at dispatch; never ends a session.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct ListenerError {
    message: String,
    #[source]
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl ListenerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        message: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Receives every normalized event, in delivery order, on the worker thread.
///
/// Calls are synchronous: the next native event is not translated until
/// `on_event` returns.  Slow listeners should hand events off to a queue
/// (see [`ChannelListener`]).
pub trait Listener: Send + Sync {
    fn on_event(&self, event: &NativeEvent) -> Result<(), ListenerError>;
}

impl<F> Listener for F
where
    F: Fn(&NativeEvent) -> Result<(), ListenerError> + Send + Sync,
{
    fn on_event(&self, event: &NativeEvent) -> Result<(), ListenerError> {
        self(event)
    }
}

/// Forwards every event into a std channel.
#[derive(Debug)]
pub struct ChannelListener {
    sender: mpsc::Sender<NativeEvent>,
}

impl ChannelListener {
    /// Returns the listener and the receiving end of its queue.
    pub fn new() -> (Self, mpsc::Receiver<NativeEvent>) {
        let (sender, receiver) = mpsc::channel();
        (Self { sender }, receiver)
    }
}

impl Listener for ChannelListener {
    fn on_event(&self, event: &NativeEvent) -> Result<(), ListenerError> {
        self.sender
            .send(*event)
            .map_err(|_| ListenerError::new("event receiver dropped"))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
