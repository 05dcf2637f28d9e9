//! Signal framing and per-frame spectra.
//!
//! Every other analysis stage walks a [`Signal`] through a
//! [`FrameAnalyzer`]: fixed-size overlapping frames, windowed and transformed
//! into magnitude and phase.

use crate::fft::RealFftPlan;
use crate::window::WindowType;
use crate::Signal;

/// Framing parameters.
///
/// # Example
/// ```
/// use groovescribe::frame::FrameConfig;
///
/// let config = FrameConfig::new(1024, 512).with_fft_size(2048);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct FrameConfig {
    /// Samples per frame
    pub frame_size: usize,
    /// Samples between frame starts
    pub hop_size: usize,
    /// FFT length (>= frame_size; frames are zero-padded)
    pub fft_size: usize,
    /// If true the first frame starts at sample 0, otherwise it is
    /// centered on sample 0
    pub start_from_zero: bool,
    /// Analysis window
    pub window: WindowType,
}

impl FrameConfig {
    pub fn new(frame_size: usize, hop_size: usize) -> Self {
        Self {
            frame_size,
            hop_size,
            fft_size: frame_size,
            start_from_zero: true,
            window: WindowType::Hann,
        }
    }

    pub fn with_fft_size(mut self, fft_size: usize) -> Self {
        self.fft_size = fft_size;
        self
    }

    pub fn with_start_from_zero(mut self, start_from_zero: bool) -> Self {
        self.start_from_zero = start_from_zero;
        self
    }

    pub fn with_window(mut self, window: WindowType) -> Self {
        self.window = window;
        self
    }

    pub fn validate(&self) -> crate::Result<()> {
        if self.frame_size == 0 {
            return Err(crate::Error::InvalidSize {
                name: "frame_size",
                value: 0,
                reason: "must be > 0",
            });
        }
        if self.hop_size == 0 {
            return Err(crate::Error::InvalidSize {
                name: "hop_size",
                value: 0,
                reason: "must be > 0",
            });
        }
        if self.fft_size < self.frame_size {
            return Err(crate::Error::InvalidSize {
                name: "fft_size",
                value: self.fft_size,
                reason: "must be >= frame_size",
            });
        }
        Ok(())
    }
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self::new(2048, 512)
    }
}

/// Number of frames produced for a signal of `len` samples.
///
/// With `start_from_zero` this is `floor((len - frame_size) / hop_size) + 1`
/// full frames; a signal shorter than one frame yields a single zero-padded
/// frame, and an empty signal yields none. Centered framing prepends
/// `frame_size / 2` zeros and produces `floor(len / hop_size) + 1` frames.
///
/// # Example
/// ```
/// use groovescribe::frame::frame_count;
///
/// assert_eq!(frame_count(4096, 1024, 512, true), 7);
/// assert_eq!(frame_count(100, 1024, 512, true), 1);
/// assert_eq!(frame_count(0, 1024, 512, true), 0);
/// ```
pub fn frame_count(len: usize, frame_size: usize, hop_size: usize, start_from_zero: bool) -> usize {
    if len == 0 || frame_size == 0 || hop_size == 0 {
        return 0;
    }
    if start_from_zero {
        if len < frame_size {
            1
        } else {
            (len - frame_size) / hop_size + 1
        }
    } else {
        len / hop_size + 1
    }
}

/// One analysis frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// Frame number
    pub index: usize,
    /// Samples (always `frame_size` long, zero-padded at the edges)
    pub samples: Vec<f32>,
}

/// Magnitude and phase of one windowed frame (`fft_size / 2 + 1` bins).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SpectralFrame {
    pub magnitude: Vec<f32>,
    pub phase: Vec<f32>,
}

/// Lazy iterator over the frames of a signal.
#[derive(Debug, Clone)]
pub struct Frames<'a> {
    samples: &'a [f32],
    frame_size: usize,
    hop_size: usize,
    offset: isize,
    next: usize,
    count: usize,
}

impl Iterator for Frames<'_> {
    type Item = Frame;

    fn next(&mut self) -> Option<Frame> {
        if self.next >= self.count {
            return None;
        }
        let index = self.next;
        self.next += 1;

        let start = (index * self.hop_size) as isize - self.offset;
        let samples = (0..self.frame_size as isize)
            .map(|i| {
                let pos = start + i;
                if pos < 0 {
                    0.0
                } else {
                    self.samples.get(pos as usize).copied().unwrap_or(0.0)
                }
            })
            .collect();
        Some(Frame { index, samples })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.count - self.next;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Frames<'_> {}

/// Frames a signal and computes per-frame spectra.
///
/// The analyzer owns its window and FFT plan, so one instance can be reused
/// across signals.
///
/// # Example
/// ```
/// use groovescribe::frame::{FrameAnalyzer, FrameConfig};
/// use groovescribe::Signal;
///
/// let analyzer = FrameAnalyzer::new(FrameConfig::new(1024, 512)).unwrap();
/// let signal = Signal::tone(440.0, 44100, 0.5).unwrap();
/// let spectra: Vec<_> = analyzer.spectra(&signal).collect();
/// assert_eq!(spectra.len(), analyzer.frame_count(&signal));
/// assert_eq!(spectra[0].magnitude.len(), 513);
/// ```
#[derive(Debug)]
pub struct FrameAnalyzer {
    config: FrameConfig,
    window: Vec<f32>,
    plan: RealFftPlan,
}

impl FrameAnalyzer {
    pub fn new(config: FrameConfig) -> crate::Result<Self> {
        config.validate()?;
        let window = config.window.build(config.frame_size);
        let plan = RealFftPlan::new(config.fft_size);
        Ok(Self {
            config,
            window,
            plan,
        })
    }

    pub fn config(&self) -> &FrameConfig {
        &self.config
    }

    /// Number of spectrum bins per frame.
    pub fn n_bins(&self) -> usize {
        self.plan.n_bins()
    }

    pub fn frame_count(&self, signal: &Signal) -> usize {
        frame_count(
            signal.len(),
            self.config.frame_size,
            self.config.hop_size,
            self.config.start_from_zero,
        )
    }

    /// Lazy frame sequence; calling it again restarts from the beginning.
    pub fn frames<'a>(&self, signal: &'a Signal) -> Frames<'a> {
        let offset = if self.config.start_from_zero {
            0
        } else {
            (self.config.frame_size / 2) as isize
        };
        Frames {
            samples: signal.samples(),
            frame_size: self.config.frame_size,
            hop_size: self.config.hop_size,
            offset,
            next: 0,
            count: self.frame_count(signal),
        }
    }

    /// Window, zero-pad and transform one frame.
    pub fn spectrum(&self, frame: &Frame) -> SpectralFrame {
        let mut buffer = vec![0.0f32; self.config.fft_size];
        for (i, (&s, &w)) in frame.samples.iter().zip(self.window.iter()).enumerate() {
            buffer[i] = s * w;
        }
        let bins = self.plan.process(&mut buffer);
        let magnitude = bins.iter().map(|c| c.norm()).collect();
        let phase = bins.iter().map(|c| c.arg()).collect();
        SpectralFrame { magnitude, phase }
    }

    /// Lazy spectrum sequence over every frame of `signal`.
    pub fn spectra<'a>(&'a self, signal: &'a Signal) -> impl Iterator<Item = SpectralFrame> + 'a {
        self.frames(signal).map(move |frame| self.spectrum(&frame))
    }

    /// Time in seconds of frame `index` (`index * hop / sample_rate`).
    pub fn frame_time(&self, index: usize, sample_rate: u32) -> f32 {
        index as f32 * self.config.hop_size as f32 / sample_rate as f32
    }

    /// Times of the first `n_frames` frames.
    pub fn frame_times(&self, n_frames: usize, sample_rate: u32) -> Vec<f32> {
        crate::convert::frames_to_time(
            &(0..n_frames).collect::<Vec<_>>(),
            sample_rate,
            self.config.hop_size,
        )
    }
}
