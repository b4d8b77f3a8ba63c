//! Platform-independent virtual key identities.
//!
//! Each variant's discriminant is its USB HID usage id on the Keyboard/Keypad
//! page (0x07).  HID ids describe physical key positions rather than
//! characters, so the same key reports the same [`VirtualKey`] regardless of
//! layout, platform, or modifier state.  The character a key produces is
//! reported separately on `KeyTyped` events.
//!
//! Reference: USB HID Usage Tables 1.3, Section 10.

use serde::{Deserialize, Serialize};

/// Virtual key code (HID usage id, page 0x07).
///
/// [`VirtualKey::Undefined`] (0x0000) is the sentinel for keys with no
/// mapping and for `KeyTyped` events, which carry a character instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u16)]
pub enum VirtualKey {
    Undefined = 0x00,

    // Letters
    KeyA = 0x04,
    KeyB = 0x05,
    KeyC = 0x06,
    KeyD = 0x07,
    KeyE = 0x08,
    KeyF = 0x09,
    KeyG = 0x0A,
    KeyH = 0x0B,
    KeyI = 0x0C,
    KeyJ = 0x0D,
    KeyK = 0x0E,
    KeyL = 0x0F,
    KeyM = 0x10,
    KeyN = 0x11,
    KeyO = 0x12,
    KeyP = 0x13,
    KeyQ = 0x14,
    KeyR = 0x15,
    KeyS = 0x16,
    KeyT = 0x17,
    KeyU = 0x18,
    KeyV = 0x19,
    KeyW = 0x1A,
    KeyX = 0x1B,
    KeyY = 0x1C,
    KeyZ = 0x1D,

    // Digit row
    Digit1 = 0x1E,
    Digit2 = 0x1F,
    Digit3 = 0x20,
    Digit4 = 0x21,
    Digit5 = 0x22,
    Digit6 = 0x23,
    Digit7 = 0x24,
    Digit8 = 0x25,
    Digit9 = 0x26,
    Digit0 = 0x27,

    // Control and punctuation
    Enter = 0x28,
    Escape = 0x29,
    Backspace = 0x2A,
    Tab = 0x2B,
    Space = 0x2C,
    Minus = 0x2D,
    Equal = 0x2E,
    BracketLeft = 0x2F,
    BracketRight = 0x30,
    Backslash = 0x31,
    Semicolon = 0x33,
    Quote = 0x34,
    Backquote = 0x35,
    Comma = 0x36,
    Period = 0x37,
    Slash = 0x38,
    CapsLock = 0x39,

    // Function row
    F1 = 0x3A,
    F2 = 0x3B,
    F3 = 0x3C,
    F4 = 0x3D,
    F5 = 0x3E,
    F6 = 0x3F,
    F7 = 0x40,
    F8 = 0x41,
    F9 = 0x42,
    F10 = 0x43,
    F11 = 0x44,
    F12 = 0x45,

    // Navigation
    PrintScreen = 0x46,
    ScrollLock = 0x47,
    Pause = 0x48,
    Insert = 0x49,
    Home = 0x4A,
    PageUp = 0x4B,
    Delete = 0x4C,
    End = 0x4D,
    PageDown = 0x4E,
    ArrowRight = 0x4F,
    ArrowLeft = 0x50,
    ArrowDown = 0x51,
    ArrowUp = 0x52,

    // Keypad
    NumLock = 0x53,
    NumpadDivide = 0x54,
    NumpadMultiply = 0x55,
    NumpadSubtract = 0x56,
    NumpadAdd = 0x57,
    NumpadEnter = 0x58,
    Numpad1 = 0x59,
    Numpad2 = 0x5A,
    Numpad3 = 0x5B,
    Numpad4 = 0x5C,
    Numpad5 = 0x5D,
    Numpad6 = 0x5E,
    Numpad7 = 0x5F,
    Numpad8 = 0x60,
    Numpad9 = 0x61,
    Numpad0 = 0x62,
    NumpadDecimal = 0x63,
    IntlBackslash = 0x64,
    ContextMenu = 0x65,
    NumpadEqual = 0x67,

    // Extended function row
    F13 = 0x68,
    F14 = 0x69,
    F15 = 0x6A,
    F16 = 0x6B,
    F17 = 0x6C,
    F18 = 0x6D,
    F19 = 0x6E,
    F20 = 0x6F,
    F21 = 0x70,
    F22 = 0x71,
    F23 = 0x72,
    F24 = 0x73,

    // Modifiers
    ControlLeft = 0xE0,
    ShiftLeft = 0xE1,
    AltLeft = 0xE2,
    MetaLeft = 0xE3,
    ControlRight = 0xE4,
    ShiftRight = 0xE5,
    AltRight = 0xE6,
    MetaRight = 0xE7,
}

const LETTERS: [VirtualKey; 26] = [
    VirtualKey::KeyA,
    VirtualKey::KeyB,
    VirtualKey::KeyC,
    VirtualKey::KeyD,
    VirtualKey::KeyE,
    VirtualKey::KeyF,
    VirtualKey::KeyG,
    VirtualKey::KeyH,
    VirtualKey::KeyI,
    VirtualKey::KeyJ,
    VirtualKey::KeyK,
    VirtualKey::KeyL,
    VirtualKey::KeyM,
    VirtualKey::KeyN,
    VirtualKey::KeyO,
    VirtualKey::KeyP,
    VirtualKey::KeyQ,
    VirtualKey::KeyR,
    VirtualKey::KeyS,
    VirtualKey::KeyT,
    VirtualKey::KeyU,
    VirtualKey::KeyV,
    VirtualKey::KeyW,
    VirtualKey::KeyX,
    VirtualKey::KeyY,
    VirtualKey::KeyZ,
];

const FUNCTION_KEYS: [VirtualKey; 24] = [
    VirtualKey::F1,
    VirtualKey::F2,
    VirtualKey::F3,
    VirtualKey::F4,
    VirtualKey::F5,
    VirtualKey::F6,
    VirtualKey::F7,
    VirtualKey::F8,
    VirtualKey::F9,
    VirtualKey::F10,
    VirtualKey::F11,
    VirtualKey::F12,
    VirtualKey::F13,
    VirtualKey::F14,
    VirtualKey::F15,
    VirtualKey::F16,
    VirtualKey::F17,
    VirtualKey::F18,
    VirtualKey::F19,
    VirtualKey::F20,
    VirtualKey::F21,
    VirtualKey::F22,
    VirtualKey::F23,
    VirtualKey::F24,
];

impl VirtualKey {
    /// Returns the HID usage id.
    pub fn as_u16(self) -> u16 {
        self as u16
    }

    /// Letter key for a 0-based alphabet index (`0` → `KeyA`).
    pub fn letter(index: u8) -> Option<Self> {
        LETTERS.get(usize::from(index)).copied()
    }

    /// Function key for a 1-based number (`1` → `F1` … `24` → `F24`).
    pub fn function(number: u8) -> Option<Self> {
        let index = usize::from(number).checked_sub(1)?;
        FUNCTION_KEYS.get(index).copied()
    }

    /// Returns `true` for Ctrl, Shift, Alt, and Meta on either side.
    pub fn is_modifier(self) -> bool {
        (0xE0..=0xE7).contains(&self.as_u16())
    }

    pub fn is_defined(self) -> bool {
        self != VirtualKey::Undefined
    }
}
