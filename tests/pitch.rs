use groovescribe::pitch::{Estimator, MelodyConfig, PitchEstimator, YinConfig};
use groovescribe::utils::median;
use groovescribe::Signal;

fn median_voiced_midi(estimator: &Estimator, signal: &Signal) -> f32 {
    let track = estimator.build().unwrap().track(signal).unwrap();
    let voiced: Vec<f32> = track.to_midi(true).into_iter().filter(|&m| m > 0.0).collect();
    median(&voiced).unwrap_or(0.0)
}

#[test]
fn both_estimators_agree_on_a_bass_note() {
    // G2
    let signal = Signal::harmonic_tone(98.0, &[1.0, 0.7, 0.4, 0.2], 44100, 1.0).unwrap();
    let yin = Estimator::Yin(YinConfig::new().with_frequency_range(30.0, 500.0));
    assert_eq!(median_voiced_midi(&yin, &signal), 43.0);
    assert_eq!(median_voiced_midi(&Estimator::default(), &signal), 43.0);
}

#[test]
fn track_shape_matches_hop() {
    let signal = Signal::tone(220.0, 22050, 0.5).unwrap();
    for estimator in [
        Estimator::Yin(YinConfig::new()),
        Estimator::Melody(MelodyConfig::new()),
    ] {
        let track = estimator.build().unwrap().track(&signal).unwrap();
        assert_eq!(track.len(), signal.len() / estimator.hop_size() + 1);
        let times = track.times();
        assert_eq!(times[0], 0.0);
        assert!(times.windows(2).all(|w| w[1] > w[0]));
    }
}

#[test]
fn unvoiced_frames_have_no_pitch() {
    let signal = Signal::silence(22050, 0.5).unwrap();
    let track = Estimator::Yin(YinConfig::new()).build().unwrap().track(&signal).unwrap();
    assert!(track.to_midi(false).iter().all(|&m| m == 0.0));
    assert!(track.to_midi_numbers().iter().all(|&m| m == 0));
}
