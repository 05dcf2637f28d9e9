/// Convert frame indices to time (seconds).
pub fn frames_to_time(frames: &[usize], sr: u32, hop_length: usize) -> Vec<f32> {
    frames
        .iter()
        .map(|&f| frame_to_time(f, sr, hop_length))
        .collect()
}

/// Time in seconds of a single frame index.
pub fn frame_to_time(frame: usize, sr: u32, hop_length: usize) -> f32 {
    (frame * hop_length) as f32 / sr as f32
}

/// Convert time (seconds) to the nearest frame index.
pub fn time_to_frames(times: &[f32], sr: u32, hop_length: usize) -> Vec<usize> {
    times
        .iter()
        .map(|&t| ((t.max(0.0) * sr as f32) / hop_length as f32).round() as usize)
        .collect()
}

/// Convert time (seconds) to a sample index, clamped at zero.
pub fn time_to_sample(time: f32, sr: u32) -> usize {
    (time.max(0.0) * sr as f32) as usize
}
