//! Native record providers.
//!
//! - **`x11`**  – The X11 RECORD extension (Linux only).
//! - **`mock`** – An in-memory provider with event injection, failure
//!   injection, and leak counters, used by the engine tests.

pub mod mock;

#[cfg(target_os = "linux")]
pub mod x11;
