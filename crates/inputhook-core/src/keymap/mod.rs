//! Key translation tables.
//!
//! The pipeline asks a [`KeyTranslationTable`] to resolve each native keycode
//! (plus the native modifier state at the time of the event) into a
//! platform-independent [`VirtualKey`], a [`KeyLocation`], and the character
//! the key produces, if any.
//!
//! Tables are data: a backend builds one when a capture session starts and
//! hands it to the pipeline, which only ever reads it.

pub mod virtual_key;
pub mod x11;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

pub use virtual_key::VirtualKey;
pub use x11::X11KeyTable;

/// Where a key sits on the keyboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyLocation {
    Standard,
    Left,
    Right,
    Numpad,
    Unknown,
}

/// The result of resolving a native keycode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyResolution {
    pub keycode: VirtualKey,
    pub location: KeyLocation,
    /// The character produced under the given modifiers, if printable.
    pub key_char: Option<char>,
}

impl KeyResolution {
    /// Resolution for a keycode the table knows nothing about.
    pub const UNKNOWN: KeyResolution = KeyResolution {
        keycode: VirtualKey::Undefined,
        location: KeyLocation::Unknown,
        key_char: None,
    };
}

/// Native key code + modifiers → virtual key identity, location, character.
///
/// Implementations must be cheap: `resolve` runs on the capture thread for
/// every key event on the system.
pub trait KeyTranslationTable: Send + Sync {
    fn resolve(&self, raw_code: u32, raw_state: u16) -> KeyResolution;
}

/// A fixed keycode → resolution map.
///
/// Useful for hosts without a keyboard mapping source and for tests.
/// Modifier state is ignored.
#[derive(Debug, Clone, Default)]
pub struct StaticKeyTable {
    entries: HashMap<u32, KeyResolution>,
}

impl StaticKeyTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces the entry for `raw_code`.
    pub fn with_key(
        mut self,
        raw_code: u32,
        keycode: VirtualKey,
        location: KeyLocation,
        key_char: Option<char>,
    ) -> Self {
        self.entries.insert(raw_code, KeyResolution { keycode, location, key_char });
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KeyTranslationTable for StaticKeyTable {
    fn resolve(&self, raw_code: u32, _raw_state: u16) -> KeyResolution {
        self.entries.get(&raw_code).copied().unwrap_or(KeyResolution::UNKNOWN)
    }
}
