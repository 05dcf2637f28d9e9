use groovescribe::onset::{detect_onsets, novelty_curve, OnsetConfig, OnsetMethod};
use groovescribe::frame::FrameConfig;
use groovescribe::Signal;

const CLICKS: [f32; 4] = [0.5, 1.0, 1.5, 2.0];

fn click_track(sr: u32) -> Signal {
    Signal::clicks(&CLICKS, sr, 2.5, 0.02, 1000.0).unwrap()
}

fn assert_matches_clicks(onsets: &[f32]) {
    for click in CLICKS {
        assert!(
            onsets.iter().any(|o| (o - click).abs() < 0.05),
            "no onset near {click}: {onsets:?}"
        );
    }
    for onset in onsets {
        assert!(
            CLICKS.iter().any(|c| (onset - c).abs() < 0.1),
            "spurious onset at {onset}"
        );
    }
}

#[test]
fn complex_domain_finds_clicks() {
    let onsets = detect_onsets(&click_track(44100), &OnsetConfig::new()).unwrap();
    assert_matches_clicks(&onsets);
}

#[test]
fn hfc_finds_clicks() {
    let config = OnsetConfig::new().with_method(OnsetMethod::Hfc);
    let onsets = detect_onsets(&click_track(44100), &config).unwrap();
    assert_matches_clicks(&onsets);
}

#[test]
fn onsets_sorted_and_bounded() {
    let signal = click_track(22050);
    let onsets = detect_onsets(&signal, &OnsetConfig::new()).unwrap();
    assert!(onsets.windows(2).all(|w| w[0] < w[1]));
    assert!(onsets.iter().all(|&t| t >= 0.0 && t <= signal.duration()));
}

#[test]
fn silence_and_empty_have_no_onsets() {
    let config = OnsetConfig::new();
    assert!(detect_onsets(&Signal::silence(44100, 1.0).unwrap(), &config).unwrap().is_empty());
    assert!(detect_onsets(&Signal::empty(44100).unwrap(), &config).unwrap().is_empty());
}

#[test]
fn novelty_one_value_per_frame() {
    let signal = click_track(22050);
    let frames = FrameConfig::new(1024, 512).with_start_from_zero(false);
    let curve = novelty_curve(&signal, &frames, OnsetMethod::Complex).unwrap();
    assert_eq!(curve.len(), signal.len() / 512 + 1);
}

#[test]
fn invalid_config_rejected() {
    let signal = click_track(22050);
    assert!(detect_onsets(&signal, &OnsetConfig::new().with_alpha(-1.0)).is_err());
    assert!(detect_onsets(&signal, &OnsetConfig::new().with_hop_size(0)).is_err());
}
