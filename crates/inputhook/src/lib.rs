//! inputhook library entry point.
//!
//! A global keyboard and mouse hook: [`application::engine::HookEngine`]
//! drives a native [`application::provider::RecordProvider`] on a worker
//! thread, translates every native record into a
//! [`inputhook_core::NativeEvent`], and hands it to one
//! [`application::listener::Listener`].
//!
//! Re-exports all public modules so that integration tests in `tests/`
//! and the binary entry point in `main.rs` share the same module tree.

pub mod application;
pub mod infrastructure;

pub use application::engine::{EngineSettings, HookEngine, HookError, HookState};
pub use application::listener::{ChannelListener, Listener, ListenerError};
pub use application::provider::{DeliveryMode, RecordProvider, SourceSignal};
