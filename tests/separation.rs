use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use repet::separation::{
    Method, Progress, SegmentLayout, SeparationConfig, estimate_repeating_period, foreground,
    separate, separate_adaptive, separate_segmented, separate_stationary,
};
use std::sync::Mutex;

const SR: u32 = 8000;
// 0.04 s at 8 kHz rounds up to a 512-sample window, 256-sample hop
const STEP: usize = 256;

fn noise(len: usize, amplitude: f32, seed: u64) -> Vec<f32> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..len)
        .map(|_| rng.gen_range(-amplitude..amplitude))
        .collect()
}

/// `repetitions` copies of one noise bar lasting `period_frames` hops.
fn repeating(period_frames: usize, repetitions: usize, seed: u64) -> Vec<f32> {
    let bar = noise(period_frames * STEP, 0.5, seed);
    bar.iter().cycle().take(bar.len() * repetitions).copied().collect()
}

/// Adds independent noise to the first quarter of the given bars.
fn with_foreground(mut signal: Vec<f32>, period_frames: usize, bars: &[usize], seed: u64) -> Vec<f32> {
    let bar_len = period_frames * STEP;
    let burst = noise(bar_len / 4, 0.3, seed);
    for &bar in bars {
        for (i, &v) in burst.iter().enumerate() {
            signal[bar * bar_len + i] += v;
        }
    }
    signal
}

fn energy(x: &[f32]) -> f32 {
    x.iter().map(|v| v * v).sum()
}

fn mono(x: &[f32]) -> Array2<f32> {
    Array2::from_shape_vec((1, x.len()), x.to_vec()).unwrap()
}

fn short_config() -> SeparationConfig {
    SeparationConfig {
        period_range: (0.3, 0.9),
        segment_length: 2.0,
        segment_step: 1.0,
        ..SeparationConfig::default()
    }
}

#[test]
fn stationary_recovers_repeating_period() {
    let pattern = repeating(20, 12, 1);
    let mixture = with_foreground(pattern.clone(), 20, &[2, 6, 9], 2);
    let cfg = short_config();

    let period = estimate_repeating_period(&mixture, SR, &cfg).unwrap();
    assert_eq!(period, 20);

    let background = separate_stationary(&mono(&mixture), SR, &cfg, None).unwrap();
    let background = background.row(0).to_vec();
    assert_eq!(background.len(), mixture.len());

    let ratio = energy(&background) / energy(&pattern);
    assert!((ratio - 1.0).abs() < 0.1, "energy ratio {}", ratio);

    // Bar 4 and its neighbours are foreground-free: the mask is 1 there
    let bar = 20 * STEP;
    for i in 4 * bar..5 * bar {
        assert!(
            (background[i] - pattern[i]).abs() < 1e-3,
            "sample {}: {} vs {}",
            i,
            background[i],
            pattern[i]
        );
    }
}

#[test]
fn stationary_background_removes_foreground_energy() {
    let pattern = repeating(20, 12, 3);
    let mixture = with_foreground(pattern.clone(), 20, &[2, 6, 9], 4);
    let cfg = short_config();

    let background = separate_stationary(&mono(&mixture), SR, &cfg, None).unwrap();
    let fg = foreground(&mono(&mixture), &background).unwrap();
    let fg = fg.row(0).to_vec();

    // Foreground estimate is concentrated in the bursts
    let bar = 20 * STEP;
    let burst_energy: f32 = [2usize, 6, 9]
        .iter()
        .map(|&b| energy(&fg[b * bar..b * bar + bar / 4]))
        .sum();
    assert!(burst_energy > 0.5 * energy(&fg));
}

#[test]
fn silence_separates_to_silence() {
    let signal = Array2::<f32>::zeros((2, 6 * SR as usize));
    let cfg = short_config();
    for method in [Method::Stationary, Method::Segmented, Method::Adaptive] {
        let background = separate(method, &signal, SR, &cfg, None).unwrap();
        assert_eq!(background.dim(), signal.dim());
        assert!(background.iter().all(|&v| v == 0.0), "{:?}", method);
    }
}

#[test]
fn channels_are_processed_independently() {
    let left = with_foreground(repeating(20, 10, 5), 20, &[3], 6);
    let right = with_foreground(repeating(14, 14, 7), 14, &[1, 8], 8);
    let n = left.len().min(right.len());

    let mut stereo = Array2::<f32>::zeros((2, n));
    stereo.row_mut(0).assign(&ndarray::ArrayView1::from(&left[..n]));
    stereo.row_mut(1).assign(&ndarray::ArrayView1::from(&right[..n]));

    let cfg = short_config();
    let both = separate_stationary(&stereo, SR, &cfg, None).unwrap();
    for (c, channel) in [&left[..n], &right[..n]].iter().enumerate() {
        let alone = separate_stationary(&mono(channel), SR, &cfg, None).unwrap();
        for (a, b) in both.row(c).iter().zip(alone.row(0).iter()) {
            assert!((a - b).abs() < 1e-6);
        }
    }
}

#[test]
fn segmented_single_segment_matches_stationary() {
    // 2.5 s is shorter than segment_length + segment_step
    let signal = mono(&repeating(10, 8, 9)[..20000]);
    let cfg = short_config();
    let segmented = separate_segmented(&signal, SR, &cfg, None).unwrap();
    let stationary = separate_stationary(&signal, SR, &cfg, None).unwrap();
    assert_eq!(segmented, stationary);
}

/// A 20-frame pattern followed by a 12-frame one, under steady low-level noise
/// so every segment's mask is its own.
fn two_regimes(seed: u64) -> Vec<f32> {
    let mut signal = repeating(20, 8, seed);
    signal.extend(repeating(12, 14, seed + 1));
    let hiss = noise(signal.len(), 0.1, seed + 2);
    signal.iter().zip(hiss.iter()).map(|(s, h)| s + h).collect()
}

#[test]
fn segmented_splices_more_smoothly_than_concatenation() {
    let signal = two_regimes(10);
    let cfg = short_config();
    let blended = separate_segmented(&mono(&signal), SR, &cfg, None).unwrap();
    let blended = blended.row(0).to_vec();
    assert_eq!(blended.len(), signal.len());

    let length = (cfg.segment_length * SR as f32) as usize;
    let step = (cfg.segment_step * SR as f32) as usize;
    let layout = SegmentLayout::new(signal.len(), length, step);
    assert!(layout.segments.len() > 2);
    let estimates: Vec<Vec<f32>> = layout
        .segments
        .iter()
        .map(|range| {
            let segment = mono(&signal[range.clone()]);
            separate_stationary(&segment, SR, &cfg, None)
                .unwrap()
                .row(0)
                .to_vec()
        })
        .collect();

    for i in 1..layout.segments.len() {
        let previous_start = layout.segments[i - 1].start;
        let start = layout.segments[i].start;
        let outgoing = &estimates[i - 1];
        let at = start - previous_start;
        // Jump at the splice beyond what the outgoing estimate does on its own
        let own_step = outgoing[at] - outgoing[at - 1];
        let naive = (estimates[i][0] - outgoing[at - 1] - own_step).abs();
        let smooth = (blended[start] - blended[start - 1] - own_step).abs();
        assert!(
            smooth < naive,
            "boundary at {}: crossfaded {} vs concatenated {}",
            start,
            smooth,
            naive
        );
    }
}

#[test]
fn segmented_reports_each_segment() {
    let signal = mono(&repeating(20, 10, 12));
    let seen = Mutex::new(Vec::new());
    let callback = |p: Progress| seen.lock().unwrap().push(p);
    separate_segmented(&signal, SR, &short_config(), Some(&callback)).unwrap();

    let seen = seen.into_inner().unwrap();
    // 51200 samples, 16000-sample segments every 8000 samples
    let expected = (51200 - 16000) / 8000 + 1;
    assert_eq!(seen.len(), expected);
    assert_eq!(seen.last(), Some(&Progress { completed: expected, total: expected }));
}

#[test]
fn adaptive_tracks_repeating_background() {
    let pattern = repeating(20, 12, 13);
    let mixture = with_foreground(pattern.clone(), 20, &[3, 8], 14);
    let cfg = short_config();

    let seen = Mutex::new(0usize);
    let callback = |_: Progress| *seen.lock().unwrap() += 1;
    let background = separate_adaptive(&mono(&mixture), SR, &cfg, Some(&callback)).unwrap();
    assert!(*seen.lock().unwrap() > 0);

    let background = background.row(0).to_vec();
    assert_eq!(background.len(), mixture.len());
    assert!(background.iter().all(|v| v.is_finite()));
    let ratio = energy(&background) / energy(&pattern);
    assert!(ratio > 0.7 && ratio < 1.2, "energy ratio {}", ratio);
}

#[test]
fn adaptive_follows_period_change() {
    use repet::beat::beat_spectrogram;
    use repet::period::{PeriodRange, estimate_periods};
    use repet::spectrum::{StftConfig, magnitude, stft};

    let first = with_foreground(repeating(20, 8, 21), 20, &[2, 5], 22);
    let second = with_foreground(repeating(12, 14, 23), 12, &[3, 9], 24);
    let mut mixture = first.clone();
    mixture.extend_from_slice(&second);
    let mut pattern = repeating(20, 8, 21);
    pattern.extend(repeating(12, 14, 23));

    // Same analysis as the adaptive method: 2 s windows are 63 frames
    let stft_cfg = StftConfig::from_duration(0.04, SR).unwrap();
    let power = magnitude(&stft(&mixture, &stft_cfg).unwrap()).mapv(|v| v * v);
    let bsg = beat_spectrogram(power.view(), 63, 1).unwrap();
    let range = PeriodRange::from_seconds((0.3, 0.9), SR, STEP).unwrap();
    let periods = estimate_periods(&bsg, range).unwrap();

    // The change is at frame 160; windows reach 31 frames back, 32 ahead
    assert!(periods[40..=120].iter().all(|&p| p == 20), "{:?}", &periods[40..=120]);
    assert!(periods[200..=290].iter().all(|&p| p == 12), "{:?}", &periods[200..=290]);

    let cfg = short_config();
    let adaptive = separate_adaptive(&mono(&mixture), SR, &cfg, None).unwrap();
    let stationary = separate_stationary(&mono(&mixture), SR, &cfg, None).unwrap();
    let error = |y: &[f32]| -> f32 {
        y.iter().zip(pattern.iter()).map(|(a, b)| (a - b) * (a - b)).sum()
    };
    let adaptive_error = error(&adaptive.row(0).to_vec());
    let stationary_error = error(&stationary.row(0).to_vec());
    assert!(
        adaptive_error < stationary_error,
        "adaptive {} vs stationary {}",
        adaptive_error,
        stationary_error
    );
}

#[test]
fn stationary_reports_each_channel() {
    let signal = Array2::from_shape_fn((3, 4 * SR as usize), |(c, i)| {
        ((i % (STEP * 10)) as f32 * 0.01 * (c + 1) as f32).sin()
    });
    let seen = Mutex::new(Vec::new());
    let callback = |p: Progress| seen.lock().unwrap().push(p.completed);
    separate_stationary(&signal, SR, &short_config(), Some(&callback)).unwrap();
    let mut seen = seen.into_inner().unwrap();
    seen.sort_unstable();
    assert_eq!(seen, vec![1, 2, 3]);
}

#[test]
fn background_never_louder_than_mixture_spectrum() {
    use repet::mask::repeating_spectrogram;
    use repet::spectrum::{StftConfig, magnitude, stft};

    let mixture = with_foreground(repeating(20, 6, 15), 20, &[1], 16);
    let cfg = StftConfig::from_duration(0.04, SR).unwrap();
    let mag = magnitude(&stft(&mixture, &cfg).unwrap());
    let rep = repeating_spectrogram(&mag, 20).unwrap();
    assert_eq!(rep.dim(), mag.dim());
    assert!(rep.iter().zip(mag.iter()).all(|(r, m)| r <= m));
}
