//! X11 keycode translation.
//!
//! An X server reports keys as 8-bit keycodes.  What a keycode means is
//! defined by the server's keyboard mapping: a table with
//! `keysyms_per_keycode` columns per keycode, where column 0 is the unshifted
//! KeySym and column 1 the shifted one.  [`X11KeyTable`] holds a snapshot of
//! that table (as returned by `XGetKeyboardMapping`) and resolves keycodes
//! against it.
//!
//! KeySym values are defined in X11/keysymdef.h.
//! Reference: https://gitlab.freedesktop.org/xorg/proto/xorgproto/-/blob/master/include/X11/keysymdef.h
//!
//! The key identity and location come from the column-0 KeySym so that a key
//! reports the same [`VirtualKey`] whatever modifiers are held.  The produced
//! character comes from the column selected by the modifier state.

use thiserror::Error;

use super::{KeyLocation, KeyResolution, KeyTranslationTable, VirtualKey};
use crate::domain::mask::x11::{LOCK_MASK, MOD2_MASK, SHIFT_MASK};

/// `NoSymbol`: an empty slot in the keyboard mapping.
pub const NO_SYMBOL: u32 = 0;

const XK_BACKSPACE: u32 = 0xFF08;
const XK_TAB: u32 = 0xFF09;
const XK_RETURN: u32 = 0xFF0D;
const XK_ESCAPE: u32 = 0xFF1B;
const XK_DELETE: u32 = 0xFFFF;
const XK_ISO_LEFT_TAB: u32 = 0xFE20;
const XK_KP_SPACE: u32 = 0xFF80;
const XK_KP_EQUAL: u32 = 0xFFBD;
const XK_F1: u32 = 0xFFBE;
const XK_F24: u32 = 0xFFD5;

/// First KeySym of the directly-encoded Unicode range (`0x0100_0000 + code point`).
const UNICODE_KEYSYM_BASE: u32 = 0x0100_0000;
const UNICODE_KEYSYM_LAST: u32 = 0x0110_FFFF;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeyTableError {
    #[error("keyboard mapping has zero keysyms per keycode")]
    ZeroWidth,

    #[error("keyboard mapping length {len} is not a multiple of {per_keycode} keysyms per keycode")]
    Ragged { len: usize, per_keycode: usize },
}

/// Snapshot of an X server keyboard mapping.
#[derive(Debug, Clone)]
pub struct X11KeyTable {
    min_keycode: u8,
    per_keycode: usize,
    keysyms: Vec<u32>,
}

impl X11KeyTable {
    /// Builds a table from the flat `XGetKeyboardMapping` output starting at
    /// `min_keycode`.
    ///
    /// # Errors
    ///
    /// Returns [`KeyTableError`] if the row width is zero or the vector does
    /// not divide evenly into rows.
    pub fn new(
        min_keycode: u8,
        keysyms_per_keycode: usize,
        keysyms: Vec<u32>,
    ) -> Result<Self, KeyTableError> {
        if keysyms_per_keycode == 0 {
            return Err(KeyTableError::ZeroWidth);
        }
        if keysyms.len() % keysyms_per_keycode != 0 {
            return Err(KeyTableError::Ragged {
                len: keysyms.len(),
                per_keycode: keysyms_per_keycode,
            });
        }
        Ok(Self {
            min_keycode,
            per_keycode: keysyms_per_keycode,
            keysyms,
        })
    }

    /// Number of keycodes covered by the snapshot.
    pub fn keycode_count(&self) -> usize {
        self.keysyms.len() / self.per_keycode
    }

    /// The KeySym in `column` for `keycode`, or [`NO_SYMBOL`].
    pub fn keysym(&self, keycode: u8, column: usize) -> u32 {
        if keycode < self.min_keycode || column >= self.per_keycode {
            return NO_SYMBOL;
        }
        let row = usize::from(keycode - self.min_keycode);
        self.keysyms
            .get(row * self.per_keycode + column)
            .copied()
            .unwrap_or(NO_SYMBOL)
    }

    /// Picks the KeySym the modifier `state` selects for `keycode`.
    fn select_keysym(&self, keycode: u8, base: u32, state: u16) -> u32 {
        let shift = state & SHIFT_MASK != 0;
        let lock = state & LOCK_MASK != 0;
        let num_lock = state & MOD2_MASK != 0;

        let shifted = match self.keysym(keycode, 1) {
            NO_SYMBOL => upper_latin(base).unwrap_or(base),
            sym => sym,
        };

        if num_lock && is_keypad(shifted) {
            return if shift { base } else { shifted };
        }

        let caps = lock && is_latin_letter(base);
        if shift != caps {
            shifted
        } else {
            base
        }
    }
}

impl KeyTranslationTable for X11KeyTable {
    fn resolve(&self, raw_code: u32, raw_state: u16) -> KeyResolution {
        let Ok(keycode) = u8::try_from(raw_code) else {
            return KeyResolution::UNKNOWN;
        };
        let base = self.keysym(keycode, 0);
        if base == NO_SYMBOL {
            return KeyResolution::UNKNOWN;
        }

        let (keycode_id, location) =
            keysym_to_key(base).unwrap_or((VirtualKey::Undefined, KeyLocation::Unknown));
        let selected = self.select_keysym(keycode, base, raw_state);

        KeyResolution {
            keycode: keycode_id,
            location,
            key_char: keysym_to_char(selected),
        }
    }
}

/// `IsKeypadKey` from Xutil.h.
pub fn is_keypad(keysym: u32) -> bool {
    (XK_KP_SPACE..=XK_KP_EQUAL).contains(&keysym)
}

fn is_lower_latin(keysym: u32) -> bool {
    // 0xF7 is the division sign, not a letter.
    (0x61..=0x7A).contains(&keysym) || ((0xE0..=0xFE).contains(&keysym) && keysym != 0xF7)
}

fn is_latin_letter(keysym: u32) -> bool {
    is_lower_latin(keysym)
        || (0x41..=0x5A).contains(&keysym)
        || ((0xC0..=0xDE).contains(&keysym) && keysym != 0xD7)
}

fn upper_latin(keysym: u32) -> Option<u32> {
    is_lower_latin(keysym).then(|| keysym - 0x20)
}

/// Translates a KeySym to the character it types, if any.
pub fn keysym_to_char(keysym: u32) -> Option<char> {
    match keysym {
        // Latin-1 KeySyms equal their code points.
        0x20..=0x7E | 0xA0..=0xFF => char::from_u32(keysym),
        // U+0000 types nothing.
        UNICODE_KEYSYM_BASE..=UNICODE_KEYSYM_LAST => {
            char::from_u32(keysym - UNICODE_KEYSYM_BASE).filter(|&ch| ch != '\0')
        }

        XK_BACKSPACE => Some('\u{8}'),
        XK_TAB | XK_ISO_LEFT_TAB => Some('\t'),
        XK_RETURN => Some('\n'),
        XK_ESCAPE => Some('\u{1b}'),
        XK_DELETE => Some('\u{7f}'),

        XK_KP_SPACE => Some(' '),
        0xFF89 => Some('\t'),                     // XK_KP_Tab
        0xFF8D => Some('\n'),                     // XK_KP_Enter
        0xFFAA => Some('*'),                      // XK_KP_Multiply
        0xFFAB => Some('+'),                      // XK_KP_Add
        0xFFAC => Some(','),                      // XK_KP_Separator
        0xFFAD => Some('-'),                      // XK_KP_Subtract
        0xFFAE => Some('.'),                      // XK_KP_Decimal
        0xFFAF => Some('/'),                      // XK_KP_Divide
        0xFFB0..=0xFFB9 => char::from_digit(keysym - 0xFFB0, 10), // XK_KP_0..XK_KP_9
        XK_KP_EQUAL => Some('='),

        _ => None,
    }
}

/// Translates a KeySym to the key identity and location it names.
///
/// Returns `None` if the KeySym has no [`VirtualKey`] equivalent.
pub fn keysym_to_key(keysym: u32) -> Option<(VirtualKey, KeyLocation)> {
    use KeyLocation::{Left, Numpad, Right, Standard};

    let standard = |key| Some((key, Standard));

    match keysym {
        // Letters, either case (XK_A..XK_Z, XK_a..XK_z)
        0x41..=0x5A => VirtualKey::letter((keysym - 0x41) as u8).map(|k| (k, Standard)),
        0x61..=0x7A => VirtualKey::letter((keysym - 0x61) as u8).map(|k| (k, Standard)),

        // Digit row and its shifted symbols (US layout)
        0x30 | 0x29 => standard(VirtualKey::Digit0), // XK_0, XK_parenright
        0x31 | 0x21 => standard(VirtualKey::Digit1), // XK_1, XK_exclam
        0x32 | 0x40 => standard(VirtualKey::Digit2), // XK_2, XK_at
        0x33 | 0x23 => standard(VirtualKey::Digit3), // XK_3, XK_numbersign
        0x34 | 0x24 => standard(VirtualKey::Digit4), // XK_4, XK_dollar
        0x35 | 0x25 => standard(VirtualKey::Digit5), // XK_5, XK_percent
        0x36 | 0x5E => standard(VirtualKey::Digit6), // XK_6, XK_asciicircum
        0x37 | 0x26 => standard(VirtualKey::Digit7), // XK_7, XK_ampersand
        0x38 | 0x2A => standard(VirtualKey::Digit8), // XK_8, XK_asterisk
        0x39 | 0x28 => standard(VirtualKey::Digit9), // XK_9, XK_parenleft

        // Punctuation
        0x20 => standard(VirtualKey::Space),               // XK_space
        0x2D | 0x5F => standard(VirtualKey::Minus),        // XK_minus, XK_underscore
        0x3D | 0x2B => standard(VirtualKey::Equal),        // XK_equal, XK_plus
        0x5B | 0x7B => standard(VirtualKey::BracketLeft),  // XK_bracketleft, XK_braceleft
        0x5D | 0x7D => standard(VirtualKey::BracketRight), // XK_bracketright, XK_braceright
        0x5C | 0x7C => standard(VirtualKey::Backslash),    // XK_backslash, XK_bar
        0x3B | 0x3A => standard(VirtualKey::Semicolon),    // XK_semicolon, XK_colon
        0x27 | 0x22 => standard(VirtualKey::Quote),        // XK_apostrophe, XK_quotedbl
        0x60 | 0x7E => standard(VirtualKey::Backquote),    // XK_grave, XK_asciitilde
        0x2C => standard(VirtualKey::Comma),               // XK_comma
        0x2E => standard(VirtualKey::Period),              // XK_period
        0x2F | 0x3F => standard(VirtualKey::Slash),        // XK_slash, XK_question
        // The ISO key left of Z carries less/greater as its base symbols.
        0x3C | 0x3E => standard(VirtualKey::IntlBackslash), // XK_less, XK_greater

        // Editing and control
        XK_BACKSPACE => standard(VirtualKey::Backspace),
        XK_TAB | XK_ISO_LEFT_TAB => standard(VirtualKey::Tab),
        XK_RETURN => standard(VirtualKey::Enter),
        XK_ESCAPE => standard(VirtualKey::Escape),
        XK_DELETE => standard(VirtualKey::Delete),
        0xFF13 => standard(VirtualKey::Pause),       // XK_Pause
        0xFF14 => standard(VirtualKey::ScrollLock),  // XK_Scroll_Lock
        0xFF61 => standard(VirtualKey::PrintScreen), // XK_Print
        0xFF63 => standard(VirtualKey::Insert),      // XK_Insert
        0xFF67 => standard(VirtualKey::ContextMenu), // XK_Menu

        // Navigation
        0xFF50 => standard(VirtualKey::Home),       // XK_Home
        0xFF51 => standard(VirtualKey::ArrowLeft),  // XK_Left
        0xFF52 => standard(VirtualKey::ArrowUp),    // XK_Up
        0xFF53 => standard(VirtualKey::ArrowRight), // XK_Right
        0xFF54 => standard(VirtualKey::ArrowDown),  // XK_Down
        0xFF55 => standard(VirtualKey::PageUp),     // XK_Prior
        0xFF56 => standard(VirtualKey::PageDown),   // XK_Next
        0xFF57 => standard(VirtualKey::End),        // XK_End

        // Function keys (XK_F1..XK_F24 are contiguous)
        XK_F1..=XK_F24 => VirtualKey::function((keysym - XK_F1 + 1) as u8).map(|k| (k, Standard)),

        // Keypad.  With NumLock off the base column holds the navigation
        // KeySyms, so both columns map to the digit key.
        0xFF7F => Some((VirtualKey::NumLock, Numpad)),               // XK_Num_Lock
        0xFF8D => Some((VirtualKey::NumpadEnter, Numpad)),           // XK_KP_Enter
        0xFF95 | 0xFFB7 => Some((VirtualKey::Numpad7, Numpad)),      // XK_KP_Home, XK_KP_7
        0xFF96 | 0xFFB4 => Some((VirtualKey::Numpad4, Numpad)),      // XK_KP_Left, XK_KP_4
        0xFF97 | 0xFFB8 => Some((VirtualKey::Numpad8, Numpad)),      // XK_KP_Up, XK_KP_8
        0xFF98 | 0xFFB6 => Some((VirtualKey::Numpad6, Numpad)),      // XK_KP_Right, XK_KP_6
        0xFF99 | 0xFFB2 => Some((VirtualKey::Numpad2, Numpad)),      // XK_KP_Down, XK_KP_2
        0xFF9A | 0xFFB9 => Some((VirtualKey::Numpad9, Numpad)),      // XK_KP_Prior, XK_KP_9
        0xFF9B | 0xFFB3 => Some((VirtualKey::Numpad3, Numpad)),      // XK_KP_Next, XK_KP_3
        0xFF9C | 0xFFB1 => Some((VirtualKey::Numpad1, Numpad)),      // XK_KP_End, XK_KP_1
        0xFF9D | 0xFFB5 => Some((VirtualKey::Numpad5, Numpad)),      // XK_KP_Begin, XK_KP_5
        0xFF9E | 0xFFB0 => Some((VirtualKey::Numpad0, Numpad)),      // XK_KP_Insert, XK_KP_0
        0xFF9F | 0xFFAE => Some((VirtualKey::NumpadDecimal, Numpad)), // XK_KP_Delete, XK_KP_Decimal
        0xFFAA => Some((VirtualKey::NumpadMultiply, Numpad)),        // XK_KP_Multiply
        0xFFAB => Some((VirtualKey::NumpadAdd, Numpad)),             // XK_KP_Add
        0xFFAD => Some((VirtualKey::NumpadSubtract, Numpad)),        // XK_KP_Subtract
        0xFFAF => Some((VirtualKey::NumpadDivide, Numpad)),          // XK_KP_Divide
        XK_KP_EQUAL => Some((VirtualKey::NumpadEqual, Numpad)),

        // Modifiers
        0xFFE1 => Some((VirtualKey::ShiftLeft, Left)),           // XK_Shift_L
        0xFFE2 => Some((VirtualKey::ShiftRight, Right)),         // XK_Shift_R
        0xFFE3 => Some((VirtualKey::ControlLeft, Left)),         // XK_Control_L
        0xFFE4 => Some((VirtualKey::ControlRight, Right)),       // XK_Control_R
        0xFFE5 | 0xFFE6 => standard(VirtualKey::CapsLock),       // XK_Caps_Lock, XK_Shift_Lock
        0xFFE7 | 0xFFEB => Some((VirtualKey::MetaLeft, Left)),   // XK_Meta_L, XK_Super_L
        0xFFE8 | 0xFFEC => Some((VirtualKey::MetaRight, Right)), // XK_Meta_R, XK_Super_R
        0xFFE9 => Some((VirtualKey::AltLeft, Left)),             // XK_Alt_L
        0xFFEA | 0xFE03 => Some((VirtualKey::AltRight, Right)),  // XK_Alt_R, XK_ISO_Level3_Shift

        _ => None,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::mask::x11::{LOCK_MASK, MOD2_MASK, SHIFT_MASK};

    const MIN_KEYCODE: u8 = 8;
    const KC_ESCAPE: u8 = 9;
    const KC_1: u8 = 10;
    const KC_RETURN: u8 = 36;
    const KC_A: u8 = 38;
    const KC_SHIFT_L: u8 = 50;
    const KC_SPACE: u8 = 65;
    const KC_KP_1: u8 = 87;
    const KC_E_ACUTE: u8 = 100;
    const KC_EURO: u8 = 101;

    /// Two-column US-like mapping for keycodes 8..=101.
    fn us_table() -> X11KeyTable {
        let rows = usize::from(KC_EURO - MIN_KEYCODE) + 1;
        let mut keysyms = vec![NO_SYMBOL; rows * 2];
        let mut set = |code: u8, base: u32, shifted: u32| {
            let row = usize::from(code - MIN_KEYCODE);
            keysyms[row * 2] = base;
            keysyms[row * 2 + 1] = shifted;
        };
        set(KC_ESCAPE, XK_ESCAPE, NO_SYMBOL);
        set(KC_1, 0x31, 0x21);
        set(KC_RETURN, XK_RETURN, NO_SYMBOL);
        set(KC_A, 0x61, 0x41);
        set(KC_SHIFT_L, 0xFFE1, NO_SYMBOL);
        set(KC_SPACE, 0x20, NO_SYMBOL);
        set(KC_KP_1, 0xFF9C, 0xFFB1);
        // Single-column letter: the uppercase form is derived.
        set(KC_E_ACUTE, 0xE9, NO_SYMBOL);
        set(KC_EURO, UNICODE_KEYSYM_BASE + 0x20AC, NO_SYMBOL);
        X11KeyTable::new(MIN_KEYCODE, 2, keysyms).expect("valid mapping")
    }

    #[test]
    fn test_new_rejects_malformed_mappings() {
        assert_eq!(X11KeyTable::new(8, 0, vec![]).unwrap_err(), KeyTableError::ZeroWidth);
        assert_eq!(
            X11KeyTable::new(8, 2, vec![0; 3]).unwrap_err(),
            KeyTableError::Ragged { len: 3, per_keycode: 2 }
        );
    }

    #[test]
    fn test_letter_case_follows_shift_and_caps_lock() {
        // Arrange
        let table = us_table();

        // Act
        let plain = table.resolve(u32::from(KC_A), 0);
        let shifted = table.resolve(u32::from(KC_A), SHIFT_MASK);
        let caps = table.resolve(u32::from(KC_A), LOCK_MASK);
        let caps_shift = table.resolve(u32::from(KC_A), LOCK_MASK | SHIFT_MASK);

        // Assert
        assert_eq!(plain.keycode, VirtualKey::KeyA);
        assert_eq!(shifted.keycode, VirtualKey::KeyA, "identity ignores modifiers");
        assert_eq!(plain.key_char, Some('a'));
        assert_eq!(shifted.key_char, Some('A'));
        assert_eq!(caps.key_char, Some('A'));
        assert_eq!(caps_shift.key_char, Some('a'));
    }

    #[test]
    fn test_caps_lock_does_not_shift_digits() {
        let table = us_table();
        assert_eq!(table.resolve(u32::from(KC_1), LOCK_MASK).key_char, Some('1'));
        assert_eq!(table.resolve(u32::from(KC_1), SHIFT_MASK).key_char, Some('!'));
        assert_eq!(table.resolve(u32::from(KC_1), SHIFT_MASK).keycode, VirtualKey::Digit1);
    }

    #[test]
    fn test_keypad_follows_num_lock() {
        // Arrange
        let table = us_table();
        let code = u32::from(KC_KP_1);

        // Act
        let nav = table.resolve(code, 0);
        let digit = table.resolve(code, MOD2_MASK);
        let nav_again = table.resolve(code, MOD2_MASK | SHIFT_MASK);

        // Assert
        assert_eq!(nav.keycode, VirtualKey::Numpad1);
        assert_eq!(nav.location, KeyLocation::Numpad);
        assert_eq!(nav.key_char, None);
        assert_eq!(digit.key_char, Some('1'));
        assert_eq!(nav_again.key_char, None);
    }

    #[test]
    fn test_control_keys_type_control_characters() {
        let table = us_table();
        assert_eq!(table.resolve(u32::from(KC_RETURN), 0).key_char, Some('\n'));
        assert_eq!(table.resolve(u32::from(KC_ESCAPE), 0).key_char, Some('\u{1b}'));
        assert_eq!(table.resolve(u32::from(KC_SPACE), 0).key_char, Some(' '));
    }

    #[test]
    fn test_modifier_keys_have_side_and_no_char() {
        let shift = us_table().resolve(u32::from(KC_SHIFT_L), 0);
        assert_eq!(shift.keycode, VirtualKey::ShiftLeft);
        assert_eq!(shift.location, KeyLocation::Left);
        assert_eq!(shift.key_char, None);
    }

    #[test]
    fn test_latin1_letter_without_shifted_column_is_uppercased() {
        let table = us_table();
        let lower = table.resolve(u32::from(KC_E_ACUTE), 0);
        let upper = table.resolve(u32::from(KC_E_ACUTE), SHIFT_MASK);
        assert_eq!(lower.key_char, Some('é'));
        assert_eq!(upper.key_char, Some('É'));
        assert_eq!(lower.keycode, VirtualKey::Undefined);
    }

    #[test]
    fn test_unicode_keysym_types_its_code_point() {
        let euro = us_table().resolve(u32::from(KC_EURO), 0);
        assert_eq!(euro.key_char, Some('€'));
    }

    #[test]
    fn test_unicode_nul_keysym_types_nothing() {
        // Arrange
        let table = X11KeyTable::new(8, 1, vec![UNICODE_KEYSYM_BASE]).expect("valid mapping");

        // Act
        let resolved = table.resolve(8, 0);

        // Assert
        assert_eq!(resolved.key_char, None);
        assert_eq!(keysym_to_char(UNICODE_KEYSYM_BASE), None);
        assert_eq!(keysym_to_char(UNICODE_KEYSYM_BASE + 1), Some('\u{1}'));
    }

    #[test]
    fn test_out_of_range_codes_resolve_unknown() {
        let table = us_table();
        assert_eq!(table.resolve(3, 0), KeyResolution::UNKNOWN);
        assert_eq!(table.resolve(200, 0), KeyResolution::UNKNOWN);
        assert_eq!(table.resolve(0x1_0000, 0), KeyResolution::UNKNOWN);
        // Keycode inside the mapping with no symbols bound.
        assert_eq!(table.resolve(11, 0), KeyResolution::UNKNOWN);
    }

    #[test]
    fn test_function_key_range_is_contiguous() {
        assert_eq!(keysym_to_key(XK_F1), Some((VirtualKey::F1, KeyLocation::Standard)));
        assert_eq!(keysym_to_key(XK_F1 + 12), Some((VirtualKey::F13, KeyLocation::Standard)));
        assert_eq!(keysym_to_key(XK_F24), Some((VirtualKey::F24, KeyLocation::Standard)));
    }

    #[test]
    fn test_keypad_predicate_matches_xutil() {
        assert!(is_keypad(XK_KP_SPACE));
        assert!(is_keypad(0xFFB5));
        assert!(is_keypad(XK_KP_EQUAL));
        assert!(!is_keypad(XK_F1));
        assert!(!is_keypad(0x31));
    }
}
