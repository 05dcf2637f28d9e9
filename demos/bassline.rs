//! Bassline Transcription Example
//!
//! Separates a mix into harmonic and percussive parts and transcribes the
//! harmonic part into grid-aligned MIDI notes.
//!
//! Usage: `cargo run --example bassline [mono.wav]`. Without a file a
//! synthetic bass riff over a click track is used.

use groovescribe::beat::BeatSource;
use groovescribe::convert::midi_to_note;
use groovescribe::separation::{MedianFilterSeparator, SourceSeparator};
use groovescribe::transcribe::{BasslineConfig, BasslineTranscriber};
use groovescribe::Signal;
use log::info;

fn read_wav(path: &str) -> Result<Signal, Box<dyn std::error::Error>> {
    let mut reader = hound::WavReader::open(path)?;
    let spec = reader.spec();
    let channels = spec.channels as usize;
    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader.samples::<f32>().collect::<Result<_, _>>()?,
        hound::SampleFormat::Int => {
            let scale = (1u64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<Result<_, _>>()?
        }
    };
    // downmix
    let mono = samples
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect();
    Ok(Signal::new(mono, spec.sample_rate)?)
}

fn synthetic_riff(sr: u32) -> Result<Signal, Box<dyn std::error::Error>> {
    let notes = [55.0, 55.0, 73.42, 82.41, 55.0, 98.0, 82.41, 73.42];
    let parts = notes
        .iter()
        .map(|&f| {
            Signal::harmonic_tone(f, &[1.0, 0.6, 0.3, 0.15], sr, 0.5)
                .map(|s| s.shape_envelope(0.005, 0.05))
        })
        .collect::<Result<Vec<_>, _>>()?;
    let bass = Signal::concat(&parts)?;
    let clicks: Vec<f32> = (0..8).map(|i| i as f32 * 0.5).collect();
    let drums = Signal::clicks(&clicks, sr, bass.duration(), 0.02, 3000.0)?;
    Ok(bass.mix(&drums)?)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let mix = match std::env::args().nth(1) {
        Some(path) => {
            info!("Reading {path}");
            read_wav(&path)?
        }
        None => {
            info!("Generating synthetic riff");
            synthetic_riff(44100)?
        }
    };
    info!("{:.2}s at {} Hz", mix.duration(), mix.sample_rate());

    info!("Separating harmonic and percussive parts");
    let parts = MedianFilterSeparator::new().separate(&mix)?;

    // beats are tracked on the percussive part, notes on the harmonic part
    let (tempo, beats) = groovescribe::beat::track_beats(
        &parts.percussive,
        &groovescribe::beat::BeatTrackConfig::new(),
    )?;
    info!("Tempo: {tempo:.1} BPM, {} beats", beats.len());

    let config = BasslineConfig::new().with_beats(BeatSource::Fixed(beats.into_vec()));
    let transcriber = BasslineTranscriber::new(config)?;
    let analysis = transcriber.transcribe(&parts.harmonic)?;

    info!(
        "{} runs, {} onsets, {} grid steps",
        analysis.runs.len(),
        analysis.onsets.len(),
        analysis.grid.len()
    );
    for note in &analysis.notes {
        info!(
            "  {:>6.3}s - {:>6.3}s  {:<4} ({})",
            note.onset,
            note.offset,
            midi_to_note(note.midi as i32),
            note.midi
        );
    }

    let anchored = transcriber.onsets_with_pitch(&parts.harmonic)?;
    info!("Onset-anchored alternative: {} notes", anchored.notes.len());

    Ok(())
}
