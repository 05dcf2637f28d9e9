use super::{A4_HZ, MIDI_A4, NO_PITCH};

/// Convert a frequency in Hz to a MIDI value.
///
/// Non-positive or non-finite frequencies are unvoiced and map to
/// [`NO_PITCH`] before any logarithm is taken. When `quantize` is set the
/// value is rounded to the nearest semitone; a rounded value of 0 or below
/// (a sub-audio frequency) also maps to [`NO_PITCH`], so the reserved value
/// never stands for a real semitone.
///
/// # Example
/// ```
/// use groovescribe::convert::pitch_to_midi;
///
/// assert_eq!(pitch_to_midi(440.0, true), 69.0);
/// assert_eq!(pitch_to_midi(0.0, false), 0.0);
/// assert!((pitch_to_midi(450.0, false) - 69.389).abs() < 1e-3);
/// ```
pub fn pitch_to_midi(frequency: f32, quantize: bool) -> f32 {
    if !frequency.is_finite() || frequency <= 0.0 {
        return NO_PITCH;
    }
    let midi = 12.0 * (frequency / A4_HZ).log2() + MIDI_A4;
    if quantize {
        let rounded = midi.round();
        if rounded <= 0.0 {
            NO_PITCH
        } else {
            rounded
        }
    } else {
        midi
    }
}

/// Convert a slice of frequencies to MIDI values.
pub fn pitch_to_midi_slice(frequencies: &[f32], quantize: bool) -> Vec<f32> {
    frequencies
        .iter()
        .map(|&f| pitch_to_midi(f, quantize))
        .collect()
}

/// Quantized MIDI numbers as integers (0 for unvoiced frames).
pub fn pitch_to_midi_numbers(frequencies: &[f32]) -> Vec<i32> {
    frequencies
        .iter()
        .map(|&f| pitch_to_midi(f, true) as i32)
        .collect()
}

/// Convert a MIDI value to a frequency in Hz.
pub fn midi_to_pitch(midi: f32) -> f32 {
    A4_HZ * 2.0f32.powf((midi - MIDI_A4) / 12.0)
}

/// Pitch class of a frequency, 0..12 counted from A.
pub fn pitch_to_chroma(frequency: f32) -> Option<u8> {
    let midi = pitch_to_midi(frequency, true);
    if midi == NO_PITCH {
        return None;
    }
    Some((midi as i32 - 33).rem_euclid(12) as u8)
}

/// Convert a MIDI number to a note name such as `A4` or `C#2`.
pub fn midi_to_note(midi: i32) -> String {
    const NOTES: [&str; 12] = [
        "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
    ];
    let octave = midi.div_euclid(12) - 1;
    let note = NOTES[midi.rem_euclid(12) as usize];
    format!("{}{}", note, octave)
}

/// MIDI numbers 1..=125 with their frequencies rounded to 0.01 Hz, for
/// labelling pitch axes.
pub fn midi_frequency_table() -> Vec<(i32, f32)> {
    (1..126)
        .map(|m| (m, (midi_to_pitch(m as f32) * 100.0).round() / 100.0))
        .collect()
}
