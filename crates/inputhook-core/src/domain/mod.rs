//! Domain entities for inputhook.
//!
//! This module contains pure translation logic with no infrastructure
//! dependencies.  Native backends construct [`raw::RawEvent`] values; the
//! pipeline combines the helpers below to produce [`event::NativeEvent`]s.
//!
//! # Native layout conventions
//!
//! The raw modifier state and button numbering follow the X11 core protocol
//! (state field bits, buttons 1–9).  X11 is the modelled backend; any other
//! backend converts its native encoding to this layout inside its adapter so
//! the pipeline stays backend-agnostic.

/// Button code classification (physical buttons versus wheel notches).
pub mod button;
/// Multi-click counting and drag/move discrimination.
pub mod click;
/// The normalized event model delivered to listeners.
pub mod event;
/// Native → normalized modifier mask translation.
pub mod mask;
/// The tagged raw record variant built by backend adapters.
pub mod raw;
