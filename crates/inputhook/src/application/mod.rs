//! Application layer: the hook lifecycle and the translation pipeline.
//!
//! Everything here depends on abstractions only.  Native hook facilities
//! plug in through [`provider::RecordProvider`]; consumers plug in through
//! [`listener::Listener`].  No module in this layer touches a display server.
//!
//! # Sub-modules
//!
//! - **`engine`**   – [`engine::HookEngine`]: start/stop, the worker thread,
//!   and the state flag the caller waits on.
//! - **`delivery`** – Blocking and polling worker loops.
//! - **`pipeline`** – Turns each raw record into normalized events and
//!   dispatches them.  Runs on every key press and pointer move.
//! - **`listener`** – The consumer contract.
//! - **`provider`** – The native provider contract.

pub mod delivery;
pub mod engine;
pub mod listener;
pub mod pipeline;
pub mod provider;
