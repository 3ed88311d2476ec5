//! Repeating Pattern Separation Example
//!
//! Builds a synthetic mixture of a repeating accompaniment (a two-chord
//! figure with a kick on every bar) and a sparse melody, then separates it
//! with the stationary, segmented and adaptive methods.
//!
//! Pass a directory as the first argument to also write the mixture and
//! every background/foreground pair as 16-bit WAV files.

use hound::{SampleFormat, WavSpec, WavWriter};
use log::info;
use ndarray::Array2;
use repet::separation::{Method, Progress, SeparationConfig, foreground, separate};
use std::path::Path;

fn tone(freq: f32, sr: u32, samples: usize) -> Vec<f32> {
    (0..samples)
        .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / sr as f32).sin())
        .collect()
}

fn chord(freqs: &[f32], sr: u32, samples: usize) -> Vec<f32> {
    let mut out = vec![0.0f32; samples];
    for &f in freqs {
        for (o, v) in out.iter_mut().zip(tone(f, sr, samples)) {
            *o += v * 0.15;
        }
    }
    out
}

fn accompaniment(sr: u32, bars: usize) -> Vec<f32> {
    let bar = sr as usize * 3 / 2;
    let half = bar / 2;
    let mut figure = chord(&[261.63, 329.63, 392.00], sr, half);
    figure.extend(chord(&[349.23, 440.00, 523.25], sr, half));
    for (i, v) in figure.iter_mut().enumerate().take(sr as usize / 20) {
        let decay = (-(i as f32) / (sr as f32 / 100.0)).exp();
        *v += 0.6 * decay * (2.0 * std::f32::consts::PI * 60.0 * i as f32 / sr as f32).sin();
    }
    figure.iter().cycle().take(bar * bars).copied().collect()
}

fn melody(sr: u32, len: usize) -> Vec<f32> {
    let notes = [(659.25, 1.0), (587.33, 2.5), (783.99, 5.2), (698.46, 8.0), (880.00, 11.3)];
    let mut out = vec![0.0f32; len];
    let note_len = sr as usize * 3 / 5;
    for (freq, start) in notes {
        let start = (start * sr as f32) as usize;
        for (i, v) in tone(freq, sr, note_len).into_iter().enumerate() {
            if let Some(o) = out.get_mut(start + i) {
                let envelope = (std::f32::consts::PI * i as f32 / note_len as f32).sin();
                *o += 0.3 * envelope * v;
            }
        }
    }
    out
}

fn save_wav(path: &Path, data: &Array2<f32>, sample_rate: u32) -> Result<(), hound::Error> {
    let spec = WavSpec {
        channels: data.nrows() as u16,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut writer = WavWriter::create(path, spec)?;
    for frame in 0..data.ncols() {
        for ch in 0..data.nrows() {
            let sample = data[(ch, frame)].clamp(-1.0, 1.0);
            writer.write_sample((sample * i16::MAX as f32) as i16)?;
        }
    }
    writer.finalize()
}

fn energy(x: &Array2<f32>) -> f32 {
    x.iter().map(|v| v * v).sum()
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    info!("Repeating Pattern Separation Example");

    let sr = 16000;
    let background = accompaniment(sr, 10);
    let voice = melody(sr, background.len());
    let n = background.len();
    let mixture = Array2::from_shape_fn((2, n), |(c, i)| {
        // Melody panned slightly left
        let gain = if c == 0 { 1.0 } else { 0.7 };
        background[i] + gain * voice[i]
    });
    info!(
        "Mixture: {} channels, {:.1} s at {} Hz",
        mixture.nrows(),
        n as f32 / sr as f32,
        sr
    );

    let out_dir = std::env::args().nth(1);
    if let Some(dir) = &out_dir {
        save_wav(&Path::new(dir).join("mixture.wav"), &mixture, sr)?;
    }

    let config = SeparationConfig {
        period_range: (0.5, 3.0),
        segment_length: 6.0,
        segment_step: 3.0,
        ..SeparationConfig::default()
    };
    let report = |p: Progress| log::debug!("{}/{}", p.completed, p.total);

    for method in [Method::Stationary, Method::Segmented, Method::Adaptive] {
        let bg = separate(method, &mixture, sr, &config, Some(&report))?;
        let fg = foreground(&mixture, &bg)?;
        info!(
            "{:?}: background {:.1}% / foreground {:.1}% of mixture energy",
            method,
            100.0 * energy(&bg) / energy(&mixture),
            100.0 * energy(&fg) / energy(&mixture)
        );
        if let Some(dir) = &out_dir {
            let name = format!("{:?}", method).to_lowercase();
            save_wav(&Path::new(dir).join(format!("{}_background.wav", name)), &bg, sr)?;
            save_wav(&Path::new(dir).join(format!("{}_foreground.wav", name)), &fg, sr)?;
        }
    }

    Ok(())
}
