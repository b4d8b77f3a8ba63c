//! The raw record variant built by backend adapters.
//!
//! A [`RawEvent`] is a native event lifted out of the backend's wire shape
//! into a tagged variant.  It is produced and consumed inside a single
//! delivery callback and never retained past it.
//!
//! # X11 record layout
//!
//! The X11 RECORD extension hands over device events as raw 32-byte `xEvent`
//! structures.  [`decode_x11_event`] reads the fields the pipeline needs:
//!
//! ```text
//! offset  size  field
//!      0     1  type        (2 KeyPress … 6 MotionNotify; high bit = SendEvent)
//!      1     1  detail      (keycode or button number)
//!      2     2  sequence
//!      4     4  time        (server ms; unused, wall clock is used instead)
//!      8    12  root / event / child windows
//!     20     2  rootX       (i16)
//!     22     2  rootY       (i16)
//!     24     4  eventX / eventY
//!     28     2  state       (modifier + button mask)
//! ```

use tracing::trace;

const X_KEY_PRESS: u8 = 2;
const X_KEY_RELEASE: u8 = 3;
const X_BUTTON_PRESS: u8 = 4;
const X_BUTTON_RELEASE: u8 = 5;
const X_MOTION_NOTIFY: u8 = 6;

/// Size of a core protocol event record in bytes.
pub const X_EVENT_SIZE: usize = 32;

/// A keyboard record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawKeyEvent {
    pub pressed: bool,
    /// Native keycode.
    pub keycode: u8,
    /// Native modifier state (X11 layout, see [`crate::domain::mask`]).
    pub state: u16,
    pub root_x: i32,
    pub root_y: i32,
    pub time_ms: u64,
}

/// A pointer button record (wheel notches included).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawButtonEvent {
    pub pressed: bool,
    /// Native button number (X11 layout, see [`crate::domain::button`]).
    pub button: u8,
    pub state: u16,
    pub root_x: i32,
    pub root_y: i32,
    pub time_ms: u64,
}

/// A pointer motion record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawMotionEvent {
    pub state: u16,
    pub root_x: i32,
    pub root_y: i32,
    pub time_ms: u64,
}

/// A native input record, tagged by kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawEvent {
    Key(RawKeyEvent),
    Button(RawButtonEvent),
    Motion(RawMotionEvent),
}

impl RawEvent {
    pub fn time_ms(&self) -> u64 {
        match self {
            RawEvent::Key(e) => e.time_ms,
            RawEvent::Button(e) => e.time_ms,
            RawEvent::Motion(e) => e.time_ms,
        }
    }
}

/// Decodes one X11 `xEvent` record.
///
/// `swapped` is the RECORD `client_swapped` flag: when set, multi-byte fields
/// are in the opposite byte order from this host.  Returns `None` for records
/// shorter than [`X_EVENT_SIZE`] or event types outside KeyPress..MotionNotify.
pub fn decode_x11_event(bytes: &[u8], swapped: bool, time_ms: u64) -> Option<RawEvent> {
    if bytes.len() < X_EVENT_SIZE {
        trace!(len = bytes.len(), "short record ignored");
        return None;
    }

    let read_u16 = |offset: usize| {
        let value = u16::from_ne_bytes([bytes[offset], bytes[offset + 1]]);
        if swapped {
            value.swap_bytes()
        } else {
            value
        }
    };

    // Bit 7 marks events generated by SendEvent; the type lives in the low bits.
    let kind = bytes[0] & 0x7F;
    let detail = bytes[1];
    let root_x = i32::from(read_u16(20) as i16);
    let root_y = i32::from(read_u16(22) as i16);
    let state = read_u16(28);

    let event = match kind {
        X_KEY_PRESS | X_KEY_RELEASE => RawEvent::Key(RawKeyEvent {
            pressed: kind == X_KEY_PRESS,
            keycode: detail,
            state,
            root_x,
            root_y,
            time_ms,
        }),
        X_BUTTON_PRESS | X_BUTTON_RELEASE => RawEvent::Button(RawButtonEvent {
            pressed: kind == X_BUTTON_PRESS,
            button: detail,
            state,
            root_x,
            root_y,
            time_ms,
        }),
        X_MOTION_NOTIFY => RawEvent::Motion(RawMotionEvent {
            state,
            root_x,
            root_y,
            time_ms,
        }),
        other => {
            trace!(event_type = other, "unhandled record type");
            return None;
        }
    };
    Some(event)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    /// Builds a host-order xEvent with the given header and pointer fields.
    fn record(kind: u8, detail: u8, root_x: i16, root_y: i16, state: u16) -> [u8; X_EVENT_SIZE] {
        let mut bytes = [0u8; X_EVENT_SIZE];
        bytes[0] = kind;
        bytes[1] = detail;
        bytes[20..22].copy_from_slice(&root_x.to_ne_bytes());
        bytes[22..24].copy_from_slice(&root_y.to_ne_bytes());
        bytes[28..30].copy_from_slice(&state.to_ne_bytes());
        bytes
    }

    #[test]
    fn test_key_press_record_decodes() {
        // Arrange
        let bytes = record(X_KEY_PRESS, 38, 640, 480, 0x0001);

        // Act
        let event = decode_x11_event(&bytes, false, 1_234);

        // Assert
        assert_eq!(
            event,
            Some(RawEvent::Key(RawKeyEvent {
                pressed: true,
                keycode: 38,
                state: 0x0001,
                root_x: 640,
                root_y: 480,
                time_ms: 1_234,
            }))
        );
    }

    #[test]
    fn test_key_release_sets_pressed_false() {
        let bytes = record(X_KEY_RELEASE, 38, 0, 0, 0);
        match decode_x11_event(&bytes, false, 0) {
            Some(RawEvent::Key(key)) => assert!(!key.pressed),
            other => panic!("expected key record, got {other:?}"),
        }
    }

    #[test]
    fn test_button_records_carry_button_number() {
        let press = decode_x11_event(&record(X_BUTTON_PRESS, 3, 10, 20, 0), false, 5);
        let release = decode_x11_event(&record(X_BUTTON_RELEASE, 3, 10, 20, 0x0400), false, 6);
        assert!(matches!(press, Some(RawEvent::Button(b)) if b.pressed && b.button == 3));
        assert!(matches!(release, Some(RawEvent::Button(b)) if !b.pressed && b.state == 0x0400));
    }

    #[test]
    fn test_motion_record_keeps_negative_coordinates() {
        // Multi-monitor layouts can place the root origin left of the pointer.
        let bytes = record(X_MOTION_NOTIFY, 0, -1280, -5, 0x0100);
        let event = decode_x11_event(&bytes, false, 7).expect("motion record");
        assert_eq!(
            event,
            RawEvent::Motion(RawMotionEvent { state: 0x0100, root_x: -1280, root_y: -5, time_ms: 7 })
        );
    }

    #[test]
    fn test_swapped_records_are_byte_swapped() {
        // Arrange: write multi-byte fields in the opposite byte order.
        let mut bytes = record(X_MOTION_NOTIFY, 0, 0, 0, 0);
        bytes[20..22].copy_from_slice(&300i16.swap_bytes().to_ne_bytes());
        bytes[22..24].copy_from_slice(&200i16.swap_bytes().to_ne_bytes());
        bytes[28..30].copy_from_slice(&0x0101u16.swap_bytes().to_ne_bytes());

        // Act
        let event = decode_x11_event(&bytes, true, 0);

        // Assert
        assert!(matches!(
            event,
            Some(RawEvent::Motion(m)) if m.root_x == 300 && m.root_y == 200 && m.state == 0x0101
        ));
    }

    #[test]
    fn test_send_event_bit_is_ignored() {
        let bytes = record(X_KEY_PRESS | 0x80, 24, 0, 0, 0);
        assert!(matches!(decode_x11_event(&bytes, false, 0), Some(RawEvent::Key(_))));
    }

    #[test]
    fn test_short_and_unknown_records_are_rejected() {
        assert_eq!(decode_x11_event(&[X_KEY_PRESS; 8], false, 0), None);
        assert_eq!(decode_x11_event(&record(12, 0, 0, 0, 0), false, 0), None);
    }

    #[test]
    fn test_time_accessor_covers_every_variant() {
        let key = decode_x11_event(&record(X_KEY_PRESS, 1, 0, 0, 0), false, 11).unwrap();
        let button = decode_x11_event(&record(X_BUTTON_PRESS, 1, 0, 0, 0), false, 12).unwrap();
        let motion = decode_x11_event(&record(X_MOTION_NOTIFY, 0, 0, 0, 0), false, 13).unwrap();
        assert_eq!([key.time_ms(), button.time_ms(), motion.time_ms()], [11, 12, 13]);
    }
}
