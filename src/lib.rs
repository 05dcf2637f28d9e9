//! Bassline and drum transcription for Rust.
//!
//! Groovescribe turns decoded mono audio into note events aligned to a
//! beat grid. A mix is split into harmonic and percussive parts; the
//! harmonic part yields a bassline of MIDI notes and the percussive part a
//! matrix of drum hits per frequency band and grid step.
//!
//! # Features
//!
//! - **Framing and spectra**: overlapping frames, windowed FFT magnitude
//!   and phase, STFT/ISTFT
//! - **Onsets**: complex-domain, HFC and flux novelty with adaptive
//!   peak picking
//! - **Rhythm**: beat tracking, bar segmentation, beat-subdivision grids
//! - **Pitch**: YIN and a harmonic-salience melody estimator
//! - **Transcription**: run-based bassline pipeline, onset-anchored
//!   bassline, multi-band drum matrix
//! - **Separation**: median-filtering harmonic/percussive split
//!
//! # Quick Start
//!
//! ```rust
//! use groovescribe::beat::BeatSource;
//! use groovescribe::transcribe::{BasslineConfig, BasslineTranscriber};
//! use groovescribe::Signal;
//!
//! let bass = Signal::harmonic_tone(110.0, &[1.0, 0.5, 0.25], 22050, 1.0).unwrap();
//! let config = BasslineConfig::new().with_beats(BeatSource::Fixed(vec![0.0, 0.5, 1.0]));
//! let analysis = BasslineTranscriber::new(config).unwrap().transcribe(&bass).unwrap();
//! assert_eq!(analysis.frame_times.len(), analysis.quantized_midi.len());
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`signal`] | Sample buffer with rate, synthetic generators |
//! | [`frame`] | Frame slicing and per-frame spectra |
//! | [`spectrum`] | STFT/ISTFT |
//! | [`onset`] | Novelty functions and onset picking |
//! | [`beat`] | Beat tracking, beat sequences, segmentation metadata |
//! | [`grid`] | Beat-subdivision grids and snapping |
//! | [`pitch`] | YIN and melody pitch estimators |
//! | [`transcribe`] | Bassline and drum transcribers |
//! | [`separation`] | Harmonic/percussive separation |
//! | [`filters`] | Band-pass biquads |
//! | [`convert`] | Hz/MIDI/note and time/frame conversions |
//!
//! # Error Handling
//!
//! All fallible operations return [`Result<T>`], which is an alias for
//! `std::result::Result<T, Error>`. Invalid configuration is reported when
//! a component is built; silent or empty audio gives empty results.
//!
//! # Feature Flags
//!
//! | Flag | Description |
//! |------|-------------|
//! | `parallel` | rayon-parallel STFT frames and drum bands |

#![forbid(unsafe_code)]

mod error;
pub use error::{Error, Result};

pub mod beat;
pub mod convert;
pub mod fft;
pub mod filters;
pub mod frame;
pub mod grid;
pub mod onset;
pub mod pitch;
pub mod separation;
pub mod signal;
pub mod spectrum;
pub mod transcribe;
pub mod utils;
pub mod window;

pub use signal::Signal;
