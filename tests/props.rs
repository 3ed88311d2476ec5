use ndarray::Array2;
use proptest::prelude::*;
use repet::mask::{adaptive_mask, repeating_mask, repeating_spectrogram};
use repet::period::{PeriodRange, estimate_period};
use repet::spectrum::{StftConfig, istft, stft};

proptest! {
    #[test]
    fn stft_istft_roundtrip_prop(len in 256usize..4096, freq in 0.001f32..0.4) {
        let cfg = StftConfig::new(256).unwrap();
        let y: Vec<f32> = (0..len).map(|i| ((i as f32) * freq).sin()).collect();
        let s = stft(&y, &cfg).unwrap();
        let y_rec = istft(&s, &cfg).unwrap();
        prop_assert!(y_rec.len() >= y.len());
        for i in 0..y.len() {
            prop_assert!((y[i] - y_rec[i]).abs() < 1e-3);
        }
    }

    #[test]
    fn repeating_mask_is_bounded(
        values in prop::collection::vec(0.0f32..100.0, 8 * 24),
        period in 1usize..12,
    ) {
        let mag = Array2::from_shape_vec((8, 24), values).unwrap();
        let mask = repeating_mask(&mag, period).unwrap();
        prop_assert!(mask.iter().all(|&m| m > 0.0 && m <= 1.0));

        let rep = repeating_spectrogram(&mag, period).unwrap();
        prop_assert!(rep.iter().zip(mag.iter()).all(|(r, m)| r <= m));
    }

    #[test]
    fn adaptive_mask_is_bounded(
        values in prop::collection::vec(0.0f32..10.0, 6 * 30),
        periods in prop::collection::vec(1usize..10, 30),
        points in 1usize..8,
    ) {
        let mag = Array2::from_shape_vec((6, 30), values).unwrap();
        let mask = adaptive_mask(&mag, &periods, points).unwrap();
        prop_assert!(mask.iter().all(|&m| m > 0.0 && m <= 1.0));
    }

    #[test]
    fn estimated_period_stays_in_range(
        spectrum in prop::collection::vec(0.0f32..1000.0, 30..200),
        min in 1usize..10,
        extra in 0usize..100,
    ) {
        let range = PeriodRange::new(min, min + extra).unwrap();
        let upper = range.upper_bound(spectrum.len());
        match estimate_period(&spectrum, range) {
            Ok(period) => prop_assert!(period >= min && period <= upper),
            Err(_) => prop_assert!(upper < min),
        }
    }
}
