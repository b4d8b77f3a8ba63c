//! Infrastructure layer: native record providers and config storage.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `inputhook_core`, but MUST NOT be imported by the `application` layer.

pub mod record;
pub mod storage;
