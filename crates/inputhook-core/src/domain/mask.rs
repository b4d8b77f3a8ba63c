//! Native → normalized modifier mask translation.
//!
//! The X11 core protocol reports keyboard modifiers and held pointer buttons
//! in a single 16-bit `state` field.  The normalized [`ModifierMask`] keeps the
//! same two concerns but in a fixed layout where every bit at or above
//! [`ModifierMask::BUTTON1`] is a held button.  That partition is what the
//! pipeline uses to tell a drag from a plain move.
//!
//! | Normalized bit | Value | X11 source          |
//! |----------------|-------|---------------------|
//! | `SHIFT`        | 0x001 | `ShiftMask`         |
//! | `CTRL`         | 0x002 | `ControlMask`       |
//! | `META`         | 0x004 | `Mod4Mask` (Super)  |
//! | `ALT`          | 0x008 | `Mod1Mask`          |
//! | `BUTTON1`      | 0x010 | `Button1Mask`       |
//! | `BUTTON2`      | 0x020 | `Button2Mask`       |
//! | `BUTTON3`      | 0x040 | `Button3Mask`       |
//! | `BUTTON4`      | 0x080 | `Button4Mask`       |
//! | `BUTTON5`      | 0x100 | `Button5Mask`       |
//!
//! `LockMask` (Caps Lock) and `Mod2`/`Mod3`/`Mod5` are lock or layout state,
//! not modifiers, and are dropped.

use serde::{Deserialize, Serialize};

/// X11 core protocol `state` field bits (X11/X.h).
pub mod x11 {
    pub const SHIFT_MASK: u16 = 1 << 0;
    pub const LOCK_MASK: u16 = 1 << 1;
    pub const CONTROL_MASK: u16 = 1 << 2;
    pub const MOD1_MASK: u16 = 1 << 3;
    pub const MOD2_MASK: u16 = 1 << 4;
    pub const MOD3_MASK: u16 = 1 << 5;
    pub const MOD4_MASK: u16 = 1 << 6;
    pub const MOD5_MASK: u16 = 1 << 7;
    pub const BUTTON1_MASK: u16 = 1 << 8;
    pub const BUTTON2_MASK: u16 = 1 << 9;
    pub const BUTTON3_MASK: u16 = 1 << 10;
    pub const BUTTON4_MASK: u16 = 1 << 11;
    pub const BUTTON5_MASK: u16 = 1 << 12;
}

/// Native → normalized bit pairs, in table order.
const MASK_TABLE: [(u16, u16); 9] = [
    (x11::SHIFT_MASK, ModifierMask::SHIFT),
    (x11::CONTROL_MASK, ModifierMask::CTRL),
    (x11::MOD4_MASK, ModifierMask::META),
    (x11::MOD1_MASK, ModifierMask::ALT),
    (x11::BUTTON1_MASK, ModifierMask::BUTTON1),
    (x11::BUTTON2_MASK, ModifierMask::BUTTON2),
    (x11::BUTTON3_MASK, ModifierMask::BUTTON3),
    (x11::BUTTON4_MASK, ModifierMask::BUTTON4),
    (x11::BUTTON5_MASK, ModifierMask::BUTTON5),
];

/// Normalized modifier and held-button bitmask.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModifierMask(pub u16);

impl ModifierMask {
    pub const SHIFT: u16 = 1 << 0;
    pub const CTRL: u16 = 1 << 1;
    pub const META: u16 = 1 << 2;
    pub const ALT: u16 = 1 << 3;
    pub const BUTTON1: u16 = 1 << 4;
    pub const BUTTON2: u16 = 1 << 5;
    pub const BUTTON3: u16 = 1 << 6;
    pub const BUTTON4: u16 = 1 << 7;
    pub const BUTTON5: u16 = 1 << 8;

    /// Every bit at or above `BUTTON1` is a held pointer button.
    pub const BUTTON_MASK: u16 = !(Self::BUTTON1 - 1);

    /// Translates an X11 `state` field into the normalized layout.
    ///
    /// Stateless and allocation-free; runs on every captured event.
    pub fn from_x11_state(state: u16) -> Self {
        let bits = MASK_TABLE
            .iter()
            .filter(|(native, _)| state & native != 0)
            .fold(0u16, |acc, (_, normalized)| acc | normalized);
        ModifierMask(bits)
    }

    /// Returns `true` if every bit of `bits` is set.
    pub fn contains(self, bits: u16) -> bool {
        self.0 & bits == bits
    }

    /// Returns `true` if any pointer button is held.
    pub fn any_button(self) -> bool {
        self.0 & Self::BUTTON_MASK != 0
    }

    pub fn shift(self) -> bool {
        self.contains(Self::SHIFT)
    }

    pub fn ctrl(self) -> bool {
        self.contains(Self::CTRL)
    }

    pub fn meta(self) -> bool {
        self.contains(Self::META)
    }

    pub fn alt(self) -> bool {
        self.contains(Self::ALT)
    }

    /// Returns only the keyboard modifier bits.
    pub fn keyboard_only(self) -> Self {
        ModifierMask(self.0 & !Self::BUTTON_MASK)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
