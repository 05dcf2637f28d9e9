//! Drum Transcription Example
//!
//! Transcribes a percussive signal into a band x grid-step hit matrix and
//! prints it as a step-sequencer pattern.
//!
//! Usage: `cargo run --example drums [mono.wav] [segmentation.json]`.

use groovescribe::beat::{BeatSource, Segmentation};
use groovescribe::separation::{MedianFilterSeparator, SourceSeparator};
use groovescribe::transcribe::{DrumConfig, DrumTranscriber};
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
    let mono = samples
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect();
    Ok(Signal::new(mono, spec.sample_rate)?)
}

fn synthetic_beat(sr: u32) -> Result<Signal, Box<dyn std::error::Error>> {
    let duration = 4.0;
    let kicks: Vec<f32> = (0..4).map(|i| i as f32).collect();
    let snares: Vec<f32> = (0..4).map(|i| i as f32 + 0.5).collect();
    let hats: Vec<f32> = (0..16).map(|i| i as f32 * 0.25).collect();
    let kick = Signal::clicks(&kicks, sr, duration, 0.1, 55.0)?;
    let snare = Signal::clicks(&snares, sr, duration, 0.05, 350.0)?;
    let hat = Signal::clicks(&hats, sr, duration, 0.02, 8000.0)?;
    Ok(kick.mix(&snare)?.mix(&hat)?)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let signal = match args.next() {
        Some(path) => {
            info!("Reading {path}");
            let mix = read_wav(&path)?;
            MedianFilterSeparator::new().separate(&mix)?.percussive
        }
        None => {
            info!("Generating synthetic beat");
            synthetic_beat(44100)?
        }
    };

    let mut config = DrumConfig::new();
    if let Some(path) = args.next() {
        let segmentation = Segmentation::from_json(&std::fs::read_to_string(path)?)?;
        info!(
            "Segmentation: {} bars over {:.2}s",
            segmentation.length_bar, segmentation.length_s
        );
        config = config.with_beats(BeatSource::Segmentation(segmentation), false);
    }

    let analysis = DrumTranscriber::new(config)?.transcribe(&signal)?;
    info!(
        "{} beats, {} grid steps, {} broadband onsets",
        analysis.beats.len(),
        analysis.grid.len(),
        analysis.onsets.len()
    );

    for (band, row) in analysis.bands.iter().zip(analysis.onset_matrix.rows()) {
        let pattern: String = row.iter().map(|&h| if h == 1 { 'x' } else { '.' }).collect();
        info!(
            "{:>6.0}-{:<6.0} Hz  {}",
            band.band.lower_hz, band.band.upper_hz, pattern
        );
    }

    Ok(())
}
