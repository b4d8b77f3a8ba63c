//! Button code classification.
//!
//! X11 reports every pointer button, including wheel notches, as a numbered
//! button press/release:
//!
//! | Code | Meaning                  |
//! |------|--------------------------|
//! | 1    | Left (primary)           |
//! | 2    | Middle                   |
//! | 3    | Right (secondary)        |
//! | 4    | Wheel up (away from user)|
//! | 5    | Wheel down (toward user) |
//! | 6, 7 | Horizontal wheel         |
//! | 8    | Back (extended)          |
//! | 9    | Forward (extended)       |
//!
//! Only the five physical buttons produce press/release/click events and only
//! the two vertical wheel codes produce wheel events.  Everything else is
//! ignored by the pipeline.

use serde::{Deserialize, Serialize};

/// A physical pointer button in normalized form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
    X1,
    X2,
}

impl MouseButton {
    /// Normalized 1-based button index (`Left` = 1 … `X2` = 5).
    pub fn index(self) -> u8 {
        match self {
            MouseButton::Left => 1,
            MouseButton::Right => 2,
            MouseButton::Middle => 3,
            MouseButton::X1 => 4,
            MouseButton::X2 => 5,
        }
    }
}

/// Vertical wheel direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WheelDirection {
    /// Rotated up and away from the user.
    Up,
    /// Rotated down and toward the user.
    Down,
}

impl WheelDirection {
    /// Signed rotation: `-1` for up, `+1` for down.
    pub fn rotation(self) -> i8 {
        match self {
            WheelDirection::Up => -1,
            WheelDirection::Down => 1,
        }
    }
}

/// What a raw button code means to the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonCode {
    Button(MouseButton),
    Wheel(WheelDirection),
    Unrecognized,
}

/// Classifies a native (X11-numbered) button code.
pub fn classify_button(code: u8) -> ButtonCode {
    match code {
        1 => ButtonCode::Button(MouseButton::Left),
        2 => ButtonCode::Button(MouseButton::Middle),
        3 => ButtonCode::Button(MouseButton::Right),
        8 => ButtonCode::Button(MouseButton::X1),
        9 => ButtonCode::Button(MouseButton::X2),
        4 => ButtonCode::Wheel(WheelDirection::Up),
        5 => ButtonCode::Wheel(WheelDirection::Down),
        _ => ButtonCode::Unrecognized,
    }
}
