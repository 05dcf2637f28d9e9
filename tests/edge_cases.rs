//! Degenerate inputs: empty and silent signals, missing beats, bad configs.

use groovescribe::beat::{track_beats, BeatSource, BeatTrackConfig};
use groovescribe::separation::{MedianFilterSeparator, SourceSeparator};
use groovescribe::transcribe::{BasslineConfig, BasslineTranscriber, DrumConfig, DrumTranscriber};
use groovescribe::{Error, Signal};

#[test]
fn signal_rejects_non_finite() {
    assert!(matches!(
        Signal::new(vec![0.0, f32::NAN], 44100),
        Err(Error::NonFiniteAudio)
    ));
    assert!(Signal::new(vec![], 0).is_err());
    assert_eq!(Signal::empty(44100).unwrap().duration(), 0.0);
}

#[test]
fn empty_signal_bassline() {
    let transcriber = BasslineTranscriber::new(BasslineConfig::new()).unwrap();
    let signal = Signal::empty(44100).unwrap();
    let analysis = transcriber.transcribe(&signal).unwrap();
    assert!(analysis.notes.is_empty());
    assert!(analysis.frame_times.is_empty());
    assert!(analysis.beats.is_empty());
    assert!(analysis.grid.is_empty());

    let anchored = transcriber.onsets_with_pitch(&signal).unwrap();
    assert!(anchored.notes.is_empty());
}

#[test]
fn empty_signal_drums() {
    let transcriber = DrumTranscriber::new(DrumConfig::new()).unwrap();
    let analysis = transcriber.transcribe(&Signal::empty(44100).unwrap()).unwrap();
    assert_eq!(analysis.onset_matrix.dim(), (8, 0));
    assert_eq!(analysis.bands.len(), 8);
}

#[test]
fn single_beat_means_no_snapping() {
    let config = BasslineConfig::new().with_beats(BeatSource::Fixed(vec![0.5]));
    let signal = Signal::harmonic_tone(110.0, &[1.0, 0.5], 44100, 1.0).unwrap();
    let analysis = BasslineTranscriber::new(config).unwrap().transcribe(&signal).unwrap();
    assert!(analysis.grid.is_empty());
    assert_eq!(analysis.stages.snapped, analysis.stages.length_filtered);
}

#[test]
fn short_signal_beats() {
    let signal = Signal::new(vec![0.1; 100], 22050).unwrap();
    let (tempo, beats) = track_beats(&signal, &BeatTrackConfig::new()).unwrap();
    assert!(tempo > 0.0);
    assert!(beats.len() <= 1);
}

#[test]
fn invalid_configs_fail_at_construction() {
    assert!(BasslineTranscriber::new(BasslineConfig::new().with_beats(BeatSource::Detected(
        BeatTrackConfig::new().with_tempo_range(200.0, 100.0)
    )))
    .is_err());
    assert!(DrumTranscriber::new(DrumConfig::new().with_beat_division(0)).is_err());
    assert!(MedianFilterSeparator::new()
        .with_stft(0, 0)
        .separate(&Signal::silence(8000, 0.1).unwrap())
        .is_err());
}

#[test]
fn noise_never_breaks_the_pipelines() {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    let mut rng = StdRng::seed_from_u64(7);
    let noise: Vec<f32> = (0..22050).map(|_| rng.gen_range(-0.5..0.5)).collect();
    let signal = Signal::new(noise, 22050).unwrap();

    let bass = BasslineTranscriber::new(
        BasslineConfig::new().with_beats(BeatSource::Fixed(vec![0.0, 0.5, 1.0])),
    )
    .unwrap()
    .transcribe(&signal)
    .unwrap();
    assert!(bass.notes.iter().all(|n| n.onset <= n.offset));
    assert!(bass.onsets.iter().all(|&t| t <= signal.duration()));

    let drums = DrumTranscriber::new(
        DrumConfig::new().with_beats(BeatSource::Fixed(vec![0.0, 0.5, 1.0]), false),
    )
    .unwrap()
    .transcribe(&signal)
    .unwrap();
    assert!(drums.energy_matrix.iter().all(|&e| (0.0..=1.0).contains(&e)));
}
