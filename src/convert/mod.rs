//! Conversion utilities for audio (time, frequency, note, MIDI).

pub(crate) const A4_HZ: f32 = 440.0;
pub(crate) const MIDI_A4: f32 = 69.0;

/// MIDI value reserved for "no pitch".
pub const NO_PITCH: f32 = 0.0;

mod pitch;
mod timing;

pub use pitch::*;
pub use timing::*;

#[cfg(test)]
mod tests;
