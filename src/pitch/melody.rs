use super::{PitchEstimator, PitchFrame, PitchTrack};
use crate::frame::{FrameAnalyzer, FrameConfig, SpectralFrame};
use crate::Signal;

const CENTS_PER_BIN: f32 = 10.0;
const BINS_PER_SEMITONE: usize = 10;
/// Fraction of the frame maximum a continuation candidate must reach.
const CONTINUITY_RATIO: f32 = 0.8;
/// Window, in salience bins, searched around the previous pitch.
const CONTINUITY_BINS: usize = 5;

/// Configuration for the predominant-melody estimator.
///
/// # Example
/// ```
/// use groovescribe::pitch::MelodyConfig;
///
/// let config = MelodyConfig::new().with_frequency_range(40.0, 300.0);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct MelodyConfig {
    pub frame_size: usize,
    pub hop_size: usize,
    /// Zero-padded FFT length
    pub fft_size: usize,
    pub min_frequency: f32,
    pub max_frequency: f32,
    /// Keep the pitch estimate on frames judged unvoiced
    pub guess_unvoiced: bool,
    /// Harmonics summed per f0 candidate
    pub harmonics: usize,
    /// Weight decay per harmonic
    pub harmonic_weight: f32,
    /// Peaks further than this below the frame maximum are ignored (dB)
    pub magnitude_threshold_db: f32,
    /// Voicing threshold is `mean - voicing_tolerance * std` of the frame saliences
    pub voicing_tolerance: f32,
}

impl MelodyConfig {
    pub fn new() -> Self {
        Self {
            frame_size: 2048,
            hop_size: 512,
            fft_size: 4096,
            min_frequency: 50.0,
            max_frequency: 350.0,
            guess_unvoiced: true,
            harmonics: 20,
            harmonic_weight: 0.8,
            magnitude_threshold_db: 40.0,
            voicing_tolerance: 0.2,
        }
    }

    pub fn with_frame_size(mut self, frame_size: usize) -> Self {
        self.frame_size = frame_size;
        self
    }

    pub fn with_hop_size(mut self, hop_size: usize) -> Self {
        self.hop_size = hop_size;
        self
    }

    pub fn with_fft_size(mut self, fft_size: usize) -> Self {
        self.fft_size = fft_size;
        self
    }

    pub fn with_frequency_range(mut self, min_frequency: f32, max_frequency: f32) -> Self {
        self.min_frequency = min_frequency;
        self.max_frequency = max_frequency;
        self
    }

    pub fn with_guess_unvoiced(mut self, guess_unvoiced: bool) -> Self {
        self.guess_unvoiced = guess_unvoiced;
        self
    }

    pub fn with_harmonics(mut self, harmonics: usize, harmonic_weight: f32) -> Self {
        self.harmonics = harmonics;
        self.harmonic_weight = harmonic_weight;
        self
    }

    pub fn with_voicing_tolerance(mut self, voicing_tolerance: f32) -> Self {
        self.voicing_tolerance = voicing_tolerance;
        self
    }

    fn frame_config(&self) -> FrameConfig {
        FrameConfig::new(self.frame_size, self.hop_size)
            .with_fft_size(self.fft_size)
            .with_start_from_zero(false)
    }

    pub fn validate(&self) -> crate::Result<()> {
        self.frame_config().validate()?;
        if !(self.min_frequency > 0.0) || !(self.max_frequency > self.min_frequency) {
            return Err(crate::Error::InvalidFrequencyRange {
                fmin: self.min_frequency,
                fmax: self.max_frequency,
                reason: "need 0 < fmin < fmax".into(),
            });
        }
        if self.harmonics == 0 {
            return Err(crate::Error::InvalidSize {
                name: "harmonics",
                value: 0,
                reason: "must be > 0",
            });
        }
        if !(self.harmonic_weight > 0.0 && self.harmonic_weight <= 1.0) {
            return Err(crate::Error::invalid(
                "harmonic_weight",
                self.harmonic_weight,
                "must be in (0, 1]",
            ));
        }
        if !(self.magnitude_threshold_db > 0.0) {
            return Err(crate::Error::invalid(
                "magnitude_threshold_db",
                self.magnitude_threshold_db,
                "must be > 0",
            ));
        }
        Ok(())
    }
}

impl Default for MelodyConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// A sinusoidal peak: frequency in Hz and linear amplitude.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Peak {
    frequency: f32,
    amplitude: f32,
}

/// Predominant pitch estimator based on harmonic summation.
///
/// Each frame's spectral peaks vote for every f0 candidate (on a 10 cent
/// grid between `min_frequency` and `max_frequency`) they could be a
/// harmonic of. The best candidate wins, with a preference for staying near
/// the previous frame's pitch. Confidence is the frame salience relative to
/// the strongest frame of the signal.
///
/// # Example
/// ```
/// use groovescribe::pitch::{MelodyConfig, MelodyEstimator, PitchEstimator};
/// use groovescribe::Signal;
///
/// let bass = Signal::harmonic_tone(110.0, &[1.0, 0.5, 0.3], 44100, 1.0).unwrap();
/// let estimator = MelodyEstimator::new(MelodyConfig::new()).unwrap();
/// let midi = estimator.track(&bass).unwrap().to_midi_numbers();
/// assert_eq!(midi[midi.len() / 2], 45);
/// ```
#[derive(Debug)]
pub struct MelodyEstimator {
    config: MelodyConfig,
    analyzer: FrameAnalyzer,
    n_salience_bins: usize,
}

impl MelodyEstimator {
    pub fn new(config: MelodyConfig) -> crate::Result<Self> {
        config.validate()?;
        let analyzer = FrameAnalyzer::new(config.frame_config())?;
        let span = 1200.0 * (config.max_frequency / config.min_frequency).log2();
        let n_salience_bins = (span / CENTS_PER_BIN).floor() as usize + 1;
        Ok(Self {
            config,
            analyzer,
            n_salience_bins,
        })
    }

    pub fn config(&self) -> &MelodyConfig {
        &self.config
    }

    fn bin_frequency(&self, bin: f32) -> f32 {
        self.config.min_frequency * 2.0f32.powf(bin * CENTS_PER_BIN / 1200.0)
    }

    fn frequency_bin(&self, frequency: f32) -> f32 {
        1200.0 * (frequency / self.config.min_frequency).log2() / CENTS_PER_BIN
    }

    /// Spectral peaks with parabolic interpolation on the dB spectrum.
    fn peaks(&self, spectrum: &SpectralFrame, sample_rate: u32) -> Vec<Peak> {
        let mag = &spectrum.magnitude;
        if mag.len() < 3 {
            return Vec::new();
        }
        let max_mag = mag.iter().copied().fold(0.0f32, f32::max);
        if max_mag <= 1e-7 {
            return Vec::new();
        }
        let db: Vec<f32> = mag.iter().map(|&m| 20.0 * m.max(1e-10).log10()).collect();
        let floor_db = 20.0 * max_mag.log10() - self.config.magnitude_threshold_db;
        let bin_hz = sample_rate as f32 / self.config.fft_size as f32;

        (1..mag.len() - 1)
            .filter(|&k| mag[k] > mag[k - 1] && mag[k] >= mag[k + 1] && db[k] > floor_db)
            .map(|k| {
                let (a, b, c) = (db[k - 1], db[k], db[k + 1]);
                let denom = a - 2.0 * b + c;
                let p = if denom.abs() > 1e-10 {
                    (0.5 * (a - c) / denom).clamp(-0.5, 0.5)
                } else {
                    0.0
                };
                let peak_db = b - 0.25 * (a - c) * p;
                Peak {
                    frequency: (k as f32 + p) * bin_hz,
                    amplitude: 10.0f32.powf(peak_db / 20.0),
                }
            })
            .collect()
    }

    /// Harmonic-summation salience over the candidate grid.
    fn salience(&self, peaks: &[Peak]) -> Vec<f32> {
        let n = self.n_salience_bins;
        let mut salience = vec![0.0f32; n];
        let mut weight = 1.0f32;
        for h in 1..=self.config.harmonics {
            for peak in peaks {
                let centre = self.frequency_bin(peak.frequency / h as f32);
                let lo = (centre - BINS_PER_SEMITONE as f32).ceil().max(0.0) as usize;
                let hi = (centre + BINS_PER_SEMITONE as f32).floor();
                if hi < 0.0 {
                    continue;
                }
                let hi = (hi as usize).min(n - 1);
                for (b, s) in salience.iter_mut().enumerate().take(hi + 1).skip(lo) {
                    let delta = (b as f32 - centre).abs() / BINS_PER_SEMITONE as f32;
                    let shape = (delta * std::f32::consts::FRAC_PI_2).cos().powi(2);
                    *s += shape * weight * peak.amplitude;
                }
            }
            weight *= self.config.harmonic_weight;
        }
        salience
    }

    /// Best salience bin, preferring a strong candidate near `previous`.
    fn choose(&self, salience: &[f32], previous: Option<usize>) -> Option<usize> {
        let (best, best_value) = salience
            .iter()
            .enumerate()
            .fold((0, 0.0f32), |acc, (i, &v)| if v > acc.1 { (i, v) } else { acc });
        if best_value <= 0.0 {
            return None;
        }
        if let Some(prev) = previous {
            let lo = prev.saturating_sub(CONTINUITY_BINS);
            let hi = (prev + CONTINUITY_BINS + 1).min(salience.len());
            let (near, near_value) = salience[lo..hi]
                .iter()
                .enumerate()
                .fold((lo, 0.0f32), |acc, (i, &v)| if v > acc.1 { (lo + i, v) } else { acc });
            if near_value >= CONTINUITY_RATIO * best_value {
                return Some(near);
            }
        }
        Some(best)
    }

    /// Refine a salience bin to a frequency with parabolic interpolation.
    fn refine(&self, salience: &[f32], bin: usize) -> f32 {
        if bin == 0 || bin + 1 >= salience.len() {
            return self.bin_frequency(bin as f32);
        }
        let (a, b, c) = (salience[bin - 1], salience[bin], salience[bin + 1]);
        let denom = a - 2.0 * b + c;
        let shift = if denom.abs() > 1e-12 {
            (0.5 * (a - c) / denom).clamp(-0.5, 0.5)
        } else {
            0.0
        };
        self.bin_frequency(bin as f32 + shift)
    }
}

impl PitchEstimator for MelodyEstimator {
    fn track(&self, signal: &Signal) -> crate::Result<PitchTrack> {
        let sr = signal.sample_rate();

        // (frequency, salience) per frame; frequency 0 where nothing voted.
        let mut previous = None;
        let raw: Vec<(f32, f32)> = self
            .analyzer
            .spectra(signal)
            .map(|spectrum| {
                let peaks = self.peaks(&spectrum, sr);
                let salience = self.salience(&peaks);
                match self.choose(&salience, previous) {
                    Some(bin) => {
                        previous = Some(bin);
                        (self.refine(&salience, bin), salience[bin])
                    }
                    None => {
                        previous = None;
                        (0.0, 0.0)
                    }
                }
            })
            .collect();

        let voiced: Vec<f32> = raw.iter().filter(|r| r.0 > 0.0).map(|r| r.1).collect();
        let max_salience = voiced.iter().copied().fold(0.0f32, f32::max);
        let threshold = if voiced.is_empty() {
            0.0
        } else {
            let mean = crate::utils::mean(&voiced);
            let var = voiced.iter().map(|v| (v - mean).powi(2)).sum::<f32>() / voiced.len() as f32;
            mean - self.config.voicing_tolerance * var.sqrt()
        };

        let frames: Vec<PitchFrame> = raw
            .into_iter()
            .enumerate()
            .map(|(i, (frequency, salience))| {
                let confidence = if max_salience > 0.0 {
                    salience / max_salience
                } else {
                    0.0
                };
                let unvoiced = salience < threshold && !self.config.guess_unvoiced;
                PitchFrame {
                    time: self.analyzer.frame_time(i, sr),
                    frequency: if unvoiced { 0.0 } else { frequency },
                    confidence: Some(confidence),
                }
            })
            .collect();

        log::debug!(
            "melody: {} frames, {} voiced, voicing threshold {:.4}",
            frames.len(),
            frames.iter().filter(|f| f.is_voiced()).count(),
            threshold
        );
        Ok(PitchTrack::new(frames))
    }

    fn hop_size(&self) -> usize {
        self.config.hop_size
    }
}
