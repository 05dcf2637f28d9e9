use approx::assert_relative_eq;
use groovescribe::beat::BeatSource;
use groovescribe::grid::Grid;
use groovescribe::transcribe::{quantize_onsets, Band, DrumConfig, DrumTranscriber};
use groovescribe::Signal;

const SR: u32 = 44100;
const KICKS: [f32; 3] = [0.25, 0.75, 1.25];
const HATS: [f32; 3] = [0.5, 1.0, 1.5];

fn kick_and_hat() -> Signal {
    let kick = Signal::clicks(&KICKS, SR, 2.0, 0.1, 55.0).unwrap();
    let hat = Signal::clicks(&HATS, SR, 2.0, 0.02, 8000.0).unwrap();
    kick.mix(&hat).unwrap()
}

fn config() -> DrumConfig {
    DrumConfig::new()
        .with_bands(vec![Band::new(40.0, 70.0), Band::new(7000.0, 10000.0)])
        .with_beats(BeatSource::Fixed(vec![0.0, 0.5, 1.0, 1.5, 2.0]), false)
}

fn step(t: f32) -> usize {
    (t / 0.125).round() as usize
}

#[test]
fn onset_quantized_to_nearest_step() {
    let grid = Grid::new(vec![0.0, 1.0, 2.0, 3.0]);
    let (hits, _) = quantize_onsets(&[1.2], &[1.0], &grid);
    assert_eq!(hits, vec![0, 1, 0, 0]);
}

#[test]
fn kick_and_hat_land_in_their_bands() {
    let analysis = DrumTranscriber::new(config())
        .unwrap()
        .transcribe(&kick_and_hat())
        .unwrap();
    assert_eq!(analysis.grid.len(), 17);
    assert_eq!(analysis.onset_matrix.dim(), (2, 17));
    assert_eq!(analysis.energy_matrix.dim(), (2, 17));

    let kick_row = analysis.onset_matrix.row(0);
    let hat_row = analysis.onset_matrix.row(1);
    for t in KICKS {
        assert_eq!(kick_row[step(t)], 1, "kick at {t}: {kick_row:?}");
        assert_eq!(hat_row[step(t)], 0, "hat row at kick {t}: {hat_row:?}");
    }
    for t in HATS {
        assert_eq!(hat_row[step(t)], 1, "hat at {t}: {hat_row:?}");
        assert_eq!(kick_row[step(t)], 0, "kick row at hat {t}: {kick_row:?}");
    }
}

#[test]
fn energies_normalized_globally() {
    let analysis = DrumTranscriber::new(config())
        .unwrap()
        .transcribe(&kick_and_hat())
        .unwrap();
    let max = analysis.energy_matrix.iter().copied().fold(0.0f32, f32::max);
    assert_relative_eq!(max, 1.0);
    assert!(analysis.energy_matrix.iter().all(|&e| (0.0..=1.0).contains(&e)));
    // cells without a hit carry no energy
    for (hit, energy) in analysis.onset_matrix.iter().zip(analysis.energy_matrix.iter()) {
        if *hit == 0 {
            assert_eq!(*energy, 0.0);
        }
    }

    let per_onset_max = analysis
        .bands
        .iter()
        .flat_map(|b| b.normalized_energies.iter().copied())
        .fold(0.0f32, f32::max);
    assert_relative_eq!(per_onset_max, 1.0);
    for band in &analysis.bands {
        assert_eq!(band.onsets.len(), band.energies.len());
        assert_eq!(band.signal.len(), kick_and_hat().len());
    }
}

#[test]
fn silence_gives_empty_matrix() {
    let analysis = DrumTranscriber::new(config())
        .unwrap()
        .transcribe(&Signal::silence(SR, 2.0).unwrap())
        .unwrap();
    assert!(analysis.onsets.is_empty());
    assert!(analysis.onset_matrix.iter().all(|&h| h == 0));
    assert!(analysis.energy_matrix.iter().all(|&e| e == 0.0));
}

#[test]
fn no_beats_no_grid() {
    let config = config().with_beats(BeatSource::Fixed(vec![]), true);
    let analysis = DrumTranscriber::new(config)
        .unwrap()
        .transcribe(&kick_and_hat())
        .unwrap();
    assert!(analysis.grid.is_empty());
    assert_eq!(analysis.onset_matrix.dim(), (2, 0));
    // without a grid there is no energy window
    assert!(analysis.bands.iter().all(|b| b.onsets.is_empty()));
}

#[test]
fn zero_phase_filtering_also_works() {
    let analysis = DrumTranscriber::new(config().with_filter(1, true))
        .unwrap()
        .transcribe(&kick_and_hat())
        .unwrap();
    for t in KICKS {
        assert_eq!(analysis.onset_matrix[(0, step(t))], 1);
    }
}
