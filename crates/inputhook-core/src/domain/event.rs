//! The normalized event model delivered to listeners.
//!
//! A [`NativeEvent`] is immutable and owned by the single dispatch call that
//! delivers it.  Listeners that need to keep an event must clone it.

use serde::{Deserialize, Serialize};

use super::button::MouseButton;
use super::mask::ModifierMask;
use crate::keymap::{KeyLocation, VirtualKey};

/// Lines scrolled per wheel notch.  X11 exposes no scroll-amount setting in
/// the core protocol, so the common desktop default is used.
pub const WHEEL_SCROLL_AMOUNT: u16 = 3;

/// Every event kind a listener can receive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    KeyPressed,
    KeyReleased,
    /// A printable character was produced; follows the matching `KeyPressed`.
    KeyTyped,
    MousePressed,
    MouseReleased,
    /// A press/release pair completed without a drag in between.
    MouseClicked,
    MouseMoved,
    MouseDragged,
    MouseWheel,
}

/// How a wheel notch should be interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScrollType {
    /// Scroll by `scroll_amount` units (lines) per notch.
    Unit,
    /// Scroll by one block (page) per notch.
    Block,
}

/// Keyboard payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyData {
    /// The native keycode as delivered by the backend.
    pub raw_code: u32,
    /// Platform-independent key identity; [`VirtualKey::Undefined`] on `KeyTyped`.
    pub keycode: VirtualKey,
    pub location: KeyLocation,
    /// The produced character; `None` except on `KeyTyped`.
    pub key_char: Option<char>,
}

/// Pointer button and motion payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MouseData {
    /// `None` for motion events.
    pub button: Option<MouseButton>,
    pub x: i32,
    pub y: i32,
    pub click_count: u16,
}

/// Wheel payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WheelData {
    pub x: i32,
    pub y: i32,
    pub click_count: u16,
    pub scroll_type: ScrollType,
    pub scroll_amount: u16,
    /// `-1` rotated up/away, `+1` rotated down/toward.
    pub rotation: i8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventPayload {
    Key(KeyData),
    Mouse(MouseData),
    Wheel(WheelData),
}

/// A platform-independent input event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeEvent {
    pub kind: EventKind,
    /// Wall-clock milliseconds since the Unix epoch.
    pub time_ms: u64,
    pub modifiers: ModifierMask,
    pub payload: EventPayload,
}

impl NativeEvent {
    pub fn key(kind: EventKind, time_ms: u64, modifiers: ModifierMask, data: KeyData) -> Self {
        Self { kind, time_ms, modifiers, payload: EventPayload::Key(data) }
    }

    pub fn mouse(kind: EventKind, time_ms: u64, modifiers: ModifierMask, data: MouseData) -> Self {
        Self { kind, time_ms, modifiers, payload: EventPayload::Mouse(data) }
    }

    pub fn wheel(time_ms: u64, modifiers: ModifierMask, data: WheelData) -> Self {
        Self { kind: EventKind::MouseWheel, time_ms, modifiers, payload: EventPayload::Wheel(data) }
    }

    pub fn as_key(&self) -> Option<&KeyData> {
        match &self.payload {
            EventPayload::Key(data) => Some(data),
            _ => None,
        }
    }

    pub fn as_mouse(&self) -> Option<&MouseData> {
        match &self.payload {
            EventPayload::Mouse(data) => Some(data),
            _ => None,
        }
    }

    pub fn as_wheel(&self) -> Option<&WheelData> {
        match &self.payload {
            EventPayload::Wheel(data) => Some(data),
            _ => None,
        }
    }

    /// Click count carried by pointer and wheel events; `None` for keys.
    pub fn click_count(&self) -> Option<u16> {
        match &self.payload {
            EventPayload::Mouse(data) => Some(data.click_count),
            EventPayload::Wheel(data) => Some(data.click_count),
            EventPayload::Key(_) => None,
        }
    }
}
