//! Worker-side delivery strategies.
//!
//! A [`Delivery`] owns the worker loop for one session.  `run` executes on
//! the worker thread and returns once the context has been disabled;
//! `interrupt` executes on the caller thread and makes `run` return.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing::debug;

use super::engine::HookError;
use super::provider::{DeliveryMode, RecordProvider, SourceSignal};

pub trait Delivery<P: RecordProvider>: Send + Sync {
    /// Runs the delivery loop on the worker thread.
    fn run(
        &self,
        provider: &P,
        data: &P::Connection,
        context: P::Context,
        sink: &mut dyn FnMut(SourceSignal),
    ) -> Result<(), HookError>;

    /// Asks a running loop to return.  Uses only the control connection.
    fn interrupt(
        &self,
        provider: &P,
        control: &P::Connection,
        context: P::Context,
    ) -> Result<(), HookError>;
}

/// Builds a fresh strategy for one session.
pub fn for_mode<P: RecordProvider>(mode: DeliveryMode) -> Arc<dyn Delivery<P>> {
    match mode {
        DeliveryMode::Blocking => Arc::new(BlockingDelivery),
        DeliveryMode::Polling { backoff } => Arc::new(PollingDelivery::new(backoff)),
    }
}

/// The provider's enable call blocks and invokes the sink per record.
#[derive(Debug, Default)]
pub struct BlockingDelivery;

impl<P: RecordProvider> Delivery<P> for BlockingDelivery {
    fn run(
        &self,
        provider: &P,
        data: &P::Connection,
        context: P::Context,
        sink: &mut dyn FnMut(SourceSignal),
    ) -> Result<(), HookError> {
        debug!(?context, "entering blocking delivery");
        provider.enable(data, context, sink)
    }

    fn interrupt(
        &self,
        provider: &P,
        control: &P::Connection,
        context: P::Context,
    ) -> Result<(), HookError> {
        provider.disable(control, context)
    }
}

/// The worker drains the provider in a loop until the run flag clears or the
/// provider reports the end of data.
#[derive(Debug)]
pub struct PollingDelivery {
    running: AtomicBool,
    backoff: Option<Duration>,
}

impl PollingDelivery {
    pub fn new(backoff: Option<Duration>) -> Self {
        Self {
            running: AtomicBool::new(true),
            backoff,
        }
    }
}

impl<P: RecordProvider> Delivery<P> for PollingDelivery {
    fn run(
        &self,
        provider: &P,
        data: &P::Connection,
        context: P::Context,
        sink: &mut dyn FnMut(SourceSignal),
    ) -> Result<(), HookError> {
        debug!(?context, backoff = ?self.backoff, "entering polling delivery");
        provider.enable_async(data, context)?;

        let mut ended = false;
        while !ended && self.running.load(Ordering::Acquire) {
            provider.process_pending(data, &mut |signal| {
                ended |= matches!(signal, SourceSignal::Ended);
                sink(signal);
            })?;
            if let Some(backoff) = self.backoff {
                thread::sleep(backoff);
            }
        }
        Ok(())
    }

    fn interrupt(
        &self,
        provider: &P,
        control: &P::Connection,
        context: P::Context,
    ) -> Result<(), HookError> {
        // The flag clears only once the context is off, so a failed disable
        // leaves the loop draining.
        provider.disable(control, context)?;
        self.running.store(false, Ordering::Release);
        Ok(())
    }
}
