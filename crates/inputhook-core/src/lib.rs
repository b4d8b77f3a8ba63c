//! # inputhook-core
//!
//! Platform-independent building blocks for the inputhook global input hook:
//! the normalized event model, the raw record variant produced by native
//! backends, modifier and button normalization, click tracking, and key
//! translation tables.
//!
//! This crate has zero dependencies on OS APIs.  Everything that touches a
//! display server lives in the `inputhook` crate; everything here can be
//! compiled and tested on any host.
//!
//! # Architecture overview
//!
//! A global input hook sees every key and pointer event on the desktop, no
//! matter which window has focus.  Native backends deliver those events in
//! their own shapes (X11 delivers 32-byte `xEvent` records, for example).
//! The pipeline in the `inputhook` crate turns each of them into a
//! [`NativeEvent`] using the pieces defined here:
//!
//! - **`domain`** – The event model ([`NativeEvent`]), the raw record variant
//!   ([`RawEvent`]), the modifier mask translator ([`ModifierMask`]), the
//!   button code classifier, and the [`ClickState`] tracker that counts
//!   multi-clicks and tells drags from plain moves.
//!
//! - **`keymap`** – The [`KeyTranslationTable`] contract plus the X11 keysym
//!   table used by the X11 record backend.  Virtual key identities are USB HID
//!   usage ids ([`VirtualKey`]) so they are stable across platforms.

pub mod domain;
pub mod keymap;

// Re-export the most-used types at the crate root so callers can write
// `inputhook_core::NativeEvent` instead of `inputhook_core::domain::event::NativeEvent`.
pub use domain::button::{classify_button, ButtonCode, MouseButton, WheelDirection};
pub use domain::click::ClickState;
pub use domain::event::{
    EventKind, EventPayload, KeyData, MouseData, NativeEvent, ScrollType, WheelData,
    WHEEL_SCROLL_AMOUNT,
};
pub use domain::mask::ModifierMask;
pub use domain::raw::{decode_x11_event, RawButtonEvent, RawEvent, RawKeyEvent, RawMotionEvent};
pub use keymap::{
    KeyLocation, KeyResolution, KeyTranslationTable, StaticKeyTable, VirtualKey, X11KeyTable,
};
