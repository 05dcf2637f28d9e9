//! Multi-band drum transcription.
//!
//! Each frequency band of the percussive signal is band-pass filtered and
//! searched for onsets. Onset energies are measured right after each hit
//! and quantized onto the beat grid, giving a `bands x grid steps` matrix
//! of hit indicators and one of normalized energies.

use ndarray::Array2;

use crate::beat::{BeatSequence, BeatSource, BeatTrackConfig};
use crate::filters::{design_bandpass_sos, sosfilt, sosfiltfilt};
use crate::grid::{build_grid, Grid};
use crate::onset::{detect_onsets, OnsetConfig, OnsetSet};
use crate::Signal;

/// A frequency band in Hz.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Band {
    pub lower_hz: f32,
    pub upper_hz: f32,
}

impl Band {
    pub fn new(lower_hz: f32, upper_hz: f32) -> Self {
        Self { lower_hz, upper_hz }
    }

    pub fn center_hz(&self) -> f32 {
        0.5 * (self.lower_hz + self.upper_hz)
    }

    pub fn bandwidth(&self) -> f32 {
        self.upper_hz - self.lower_hz
    }

    /// Herrera's drum band bank, from kick to cymbals.
    pub fn herrera() -> Vec<Band> {
        [
            (40.0, 70.0),
            (70.0, 110.0),
            (130.0, 145.0),
            (160.0, 190.0),
            (300.0, 400.0),
            (5000.0, 7000.0),
            (7000.0, 10000.0),
            (10000.0, 15000.0),
        ]
        .into_iter()
        .map(|(lo, hi)| Band::new(lo, hi))
        .collect()
    }
}

/// Drum transcription parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct DrumConfig {
    pub bands: Vec<Band>,
    /// Onset detection applied to the full signal and to every band
    pub onset: OnsetConfig,
    pub beats: BeatSource,
    /// Add a synthetic beat before the first and after the last
    pub extend_beats: bool,
    pub beat_division: usize,
    /// Onsets whose mirrored energy window is shorter are dropped
    pub min_energy_window_secs: f32,
    /// Biquad stages per band filter
    pub filter_order: usize,
    /// Filter forward and backward instead of forward only
    pub zero_phase: bool,
}

impl DrumConfig {
    pub fn new() -> Self {
        Self {
            bands: Band::herrera(),
            onset: OnsetConfig::new().with_alpha(0.2),
            beats: BeatSource::Detected(BeatTrackConfig::drums()),
            extend_beats: true,
            beat_division: 4,
            min_energy_window_secs: 0.01,
            filter_order: 1,
            zero_phase: false,
        }
    }

    pub fn with_bands(mut self, bands: Vec<Band>) -> Self {
        self.bands = bands;
        self
    }

    pub fn with_onset(mut self, onset: OnsetConfig) -> Self {
        self.onset = onset;
        self
    }

    pub fn with_beats(mut self, beats: BeatSource, extend: bool) -> Self {
        self.beats = beats;
        self.extend_beats = extend;
        self
    }

    pub fn with_beat_division(mut self, beat_division: usize) -> Self {
        self.beat_division = beat_division;
        self
    }

    pub fn with_min_energy_window(mut self, secs: f32) -> Self {
        self.min_energy_window_secs = secs;
        self
    }

    pub fn with_filter(mut self, order: usize, zero_phase: bool) -> Self {
        self.filter_order = order;
        self.zero_phase = zero_phase;
        self
    }

    pub fn validate(&self) -> crate::Result<()> {
        self.onset.validate()?;
        self.beats.validate()?;
        if self.bands.is_empty() {
            return Err(crate::Error::InvalidSize {
                name: "bands",
                value: 0,
                reason: "need at least one band",
            });
        }
        if let Some(band) = self
            .bands
            .iter()
            .find(|b| !(b.lower_hz >= 0.0 && b.upper_hz > b.lower_hz))
        {
            return Err(crate::Error::InvalidFrequencyRange {
                fmin: band.lower_hz,
                fmax: band.upper_hz,
                reason: "need 0 <= lower < upper".into(),
            });
        }
        if self.beat_division == 0 {
            return Err(crate::Error::InvalidSize {
                name: "beat_division",
                value: 0,
                reason: "must be >= 1",
            });
        }
        if self.filter_order == 0 {
            return Err(crate::Error::InvalidSize {
                name: "filter_order",
                value: 0,
                reason: "must be > 0",
            });
        }
        if !(self.min_energy_window_secs >= 0.0) {
            return Err(crate::Error::invalid(
                "min_energy_window_secs",
                self.min_energy_window_secs,
                "must be >= 0",
            ));
        }
        Ok(())
    }
}

impl Default for DrumConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-band intermediate results.
#[derive(Debug, Clone, PartialEq)]
pub struct BandAnalysis {
    pub band: Band,
    /// Band-pass filtered signal (silent when the band lies above Nyquist)
    pub signal: Signal,
    /// Onsets that kept a usable energy window
    pub onsets: OnsetSet,
    pub energies: Vec<f32>,
    /// `energies` divided by the largest per-onset energy over all bands
    pub normalized_energies: Vec<f32>,
}

/// Result of [`DrumTranscriber::transcribe`].
#[derive(Debug, Clone, PartialEq)]
pub struct DrumAnalysis {
    pub beats: BeatSequence,
    pub grid: Grid,
    /// Broadband onsets
    pub onsets: OnsetSet,
    pub bands: Vec<BandAnalysis>,
    /// 1 where a band has a hit at a grid step
    pub onset_matrix: Array2<u8>,
    /// Summed hit energy per cell, scaled so the loudest cell is 1
    pub energy_matrix: Array2<f32>,
}

/// Transcribes a (percussive) signal into a band-by-grid hit matrix.
///
/// # Example
/// ```
/// use groovescribe::beat::BeatSource;
/// use groovescribe::transcribe::{DrumConfig, DrumTranscriber};
/// use groovescribe::Signal;
///
/// let config = DrumConfig::new().with_beats(BeatSource::Fixed(vec![0.0, 0.5, 1.0]), false);
/// let transcriber = DrumTranscriber::new(config).unwrap();
/// let analysis = transcriber.transcribe(&Signal::silence(22050, 1.0).unwrap()).unwrap();
/// assert_eq!(analysis.onset_matrix.dim(), (8, 9));
/// assert!(analysis.energy_matrix.iter().all(|&e| e == 0.0));
/// ```
#[derive(Debug, Clone)]
pub struct DrumTranscriber {
    config: DrumConfig,
}

impl DrumTranscriber {
    pub fn new(config: DrumConfig) -> crate::Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &DrumConfig {
        &self.config
    }

    pub fn transcribe(&self, signal: &Signal) -> crate::Result<DrumAnalysis> {
        let cfg = &self.config;
        let onsets = detect_onsets(signal, &cfg.onset)?;
        let mut beats = cfg.beats.beats(signal)?;
        if cfg.extend_beats {
            beats = beats.extend_boundaries();
        }
        let grid = build_grid(beats.as_slice(), cfg.beat_division).truncate_to(signal.duration());
        let resolution = grid.resolution().unwrap_or(0.0);
        if grid.is_empty() {
            log::warn!("drums: grid unavailable ({} beats)", beats.len());
        }
        log::debug!(
            "drums: {} onsets, {} beats, {} grid steps of {:.3}s",
            onsets.len(),
            beats.len(),
            grid.len(),
            resolution
        );

        let per_band: Vec<(BandAnalysis, Vec<u8>, Vec<f32>)> = {
            #[cfg(feature = "parallel")]
            {
                use rayon::prelude::*;
                cfg.bands
                    .par_iter()
                    .map(|band| self.analyze_band(*band, signal, &grid, resolution))
                    .collect::<crate::Result<_>>()?
            }
            #[cfg(not(feature = "parallel"))]
            {
                cfg.bands
                    .iter()
                    .map(|band| self.analyze_band(*band, signal, &grid, resolution))
                    .collect::<crate::Result<_>>()?
            }
        };

        let n_steps = grid.len();
        let mut onset_matrix = Array2::<u8>::zeros((per_band.len(), n_steps));
        let mut energy_matrix = Array2::<f32>::zeros((per_band.len(), n_steps));
        for (row, (_, hits, energies)) in per_band.iter().enumerate() {
            for (col, (&hit, &energy)) in hits.iter().zip(energies).enumerate() {
                onset_matrix[(row, col)] = hit;
                energy_matrix[(row, col)] = energy;
            }
        }

        let cell_max = energy_matrix.iter().copied().fold(0.0f32, f32::max);
        if cell_max > 0.0 {
            energy_matrix.mapv_inplace(|e| e / cell_max);
        }

        let mut bands: Vec<BandAnalysis> = per_band.into_iter().map(|(band, _, _)| band).collect();
        let onset_max = bands
            .iter()
            .flat_map(|b| b.energies.iter().copied())
            .fold(0.0f32, f32::max);
        for band in &mut bands {
            band.normalized_energies = if onset_max > 0.0 {
                band.energies.iter().map(|e| e / onset_max).collect()
            } else {
                band.energies.clone()
            };
        }

        Ok(DrumAnalysis {
            beats,
            grid,
            onsets,
            bands,
            onset_matrix,
            energy_matrix,
        })
    }

    fn analyze_band(
        &self,
        band: Band,
        signal: &Signal,
        grid: &Grid,
        resolution: f32,
    ) -> crate::Result<(BandAnalysis, Vec<u8>, Vec<f32>)> {
        let cfg = &self.config;
        let sr = signal.sample_rate();
        let filtered = match design_bandpass_sos(
            band.center_hz(),
            band.bandwidth(),
            sr as f32,
            cfg.filter_order,
        ) {
            Ok(sos) if cfg.zero_phase => sosfiltfilt(&sos, signal.samples()),
            Ok(sos) => sosfilt(&sos, signal.samples()),
            Err(e) => {
                log::warn!(
                    "drums: band {}-{} Hz skipped at {} Hz: {}",
                    band.lower_hz,
                    band.upper_hz,
                    sr,
                    e
                );
                vec![0.0; signal.len()]
            }
        };
        let filtered = signal.with_samples(filtered);

        let half_window = (0.5 * resolution * sr as f32) as usize;
        let min_window = cfg.min_energy_window_secs * sr as f32;
        let mut onsets = Vec::new();
        let mut energies = Vec::new();
        for onset in detect_onsets(&filtered, &cfg.onset)? {
            if let Some(energy) =
                mirrored_energy(filtered.samples(), (onset * sr as f32) as usize, half_window, min_window)
            {
                onsets.push(onset);
                energies.push(energy);
            }
        }
        if onsets.is_empty() {
            log::debug!("drums: no onsets in band {}-{} Hz", band.lower_hz, band.upper_hz);
        }

        let (hits, cell_energies) = quantize_onsets(&onsets, &energies, grid);
        Ok((
            BandAnalysis {
                band,
                signal: filtered,
                onsets,
                energies,
                normalized_energies: Vec::new(),
            },
            hits,
            cell_energies,
        ))
    }
}

/// Energy of `x[start..start + half]` mirrored around `x[start]`.
///
/// Returns `None` when the mirrored window (`2 * n - 1` samples) is
/// shorter than `min_len`.
fn mirrored_energy(x: &[f32], start: usize, half: usize, min_len: f32) -> Option<f32> {
    let end = (start + half).min(x.len());
    let window = x.get(start..end)?;
    let first = *window.first()?;
    if ((2 * window.len() - 1) as f32) < min_len {
        return None;
    }
    let sum: f32 = window.iter().map(|v| v * v).sum();
    Some(2.0 * sum - first * first)
}

/// Place onsets on their nearest grid step.
///
/// Returns one hit indicator and one summed energy per grid marker. An
/// empty grid gives two empty vectors.
///
/// # Example
/// ```
/// use groovescribe::grid::Grid;
/// use groovescribe::transcribe::quantize_onsets;
///
/// let grid = Grid::new(vec![0.0, 1.0, 2.0, 3.0]);
/// let (hits, energies) = quantize_onsets(&[1.2], &[0.5], &grid);
/// assert_eq!(hits, vec![0, 1, 0, 0]);
/// assert_eq!(energies, vec![0.0, 0.5, 0.0, 0.0]);
/// ```
pub fn quantize_onsets(onsets: &[f32], energies: &[f32], grid: &Grid) -> (Vec<u8>, Vec<f32>) {
    let mut hits = vec![0u8; grid.len()];
    let mut cells = vec![0.0f32; grid.len()];
    for (i, &onset) in onsets.iter().enumerate() {
        if let Some(idx) = grid.nearest_index(onset) {
            hits[idx] = 1;
            cells[idx] += energies.get(i).copied().unwrap_or(0.0);
        }
    }
    (hits, cells)
}
