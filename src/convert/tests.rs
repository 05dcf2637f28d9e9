use super::*;
use approx::assert_relative_eq;

#[test]
fn test_pitch_midi_roundtrip() {
    let midi = pitch_to_midi(440.0, false);
    assert_relative_eq!(midi, 69.0, epsilon = 1e-4);
    assert_relative_eq!(midi_to_pitch(midi), 440.0, epsilon = 1e-2);
}

#[test]
fn test_zero_pitch_short_circuits() {
    assert_eq!(pitch_to_midi(0.0, true), NO_PITCH);
    assert_eq!(pitch_to_midi(0.0, false), NO_PITCH);
    assert_eq!(pitch_to_midi(-5.0, false), NO_PITCH);
    assert_eq!(pitch_to_midi(f32::NAN, true), NO_PITCH);
}

#[test]
fn test_subaudio_never_collides() {
    // 8.18 Hz is MIDI 0; its quantized form is reserved.
    assert_eq!(pitch_to_midi(8.1758, true), NO_PITCH);
    assert_eq!(pitch_to_midi(8.662, true), 1.0);
}

#[test]
fn test_quantized_numbers() {
    assert_eq!(pitch_to_midi_numbers(&[0.0, 110.0, 261.63]), vec![0, 45, 60]);
}

#[test]
fn test_chroma() {
    assert_eq!(pitch_to_chroma(440.0), Some(0));
    assert_eq!(pitch_to_chroma(466.16), Some(1));
    assert_eq!(pitch_to_chroma(0.0), None);
}

#[test]
fn test_note_names() {
    assert_eq!(midi_to_note(69), "A4");
    assert_eq!(midi_to_note(60), "C4");
    assert_eq!(midi_to_note(37), "C#2");
}

#[test]
fn test_frequency_table() {
    let table = midi_frequency_table();
    assert_eq!(table.len(), 125);
    assert_eq!(table[68], (69, 440.0));
}

#[test]
fn test_time_conversions() {
    let frames = vec![0, 10, 20];
    let times = frames_to_time(&frames, 22050, 512);
    assert!((times[1] - 0.232).abs() < 0.01);

    let back = time_to_frames(&times, 22050, 512);
    assert_eq!(back, frames);
    assert_eq!(time_to_sample(-1.0, 100), 0);
}
