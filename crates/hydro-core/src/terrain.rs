//! Synthetic height fields for tests, demos and the CLI when no terrain file
//! is supplied. World terrain proper comes from the upstream initializer.
use noise::{NoiseFn, Perlin};

use crate::field::HeightField;

/// Metres per unit of normalised fBm, matching the upstream initializer.
pub const DEFAULT_RELIEF_M: f32 = 2000.0;

/// Level ground at `elevation` metres.
pub fn flat(n: usize, elevation: f32) -> HeightField {
    HeightField::new(n, n, elevation)
}

/// A bowl: lowest at the centre cell, rising with distance to `rim` metres
/// at the corners.
pub fn bowl(n: usize, rim: f32) -> HeightField {
    let mut hf = HeightField::square(n);
    let centre = (n as f32 - 1.0) / 2.0;
    let max_dist = (2.0 * centre * centre).sqrt().max(f32::EPSILON);
    for r in 0..n {
        for c in 0..n {
            let dr = r as f32 - centre;
            let dc = c as f32 - centre;
            hf.set(r, c, rim * (dr * dr + dc * dc).sqrt() / max_dist);
        }
    }
    hf
}

/// Octaves summed for the synthetic fixtures.
const FBM_OCTAVES: u32 = 6;
/// Amplitude ratio between successive octaves.
const FBM_PERSISTENCE: f64 = 0.5;

/// Rolling Perlin fBm terrain, normalised to [0, 1] then multiplied by
/// `relief` metres. Frequency doubles each octave.
pub fn fbm(n: usize, seed: u32, relief: f32) -> HeightField {
    let perlin = Perlin::new(seed);
    let base_freq = 4.0 / n.max(1) as f64;
    let mut hf = HeightField::square(n);
    for (i, v) in hf.data.iter_mut().enumerate() {
        let (x, y) = ((i % n) as f64 * base_freq, (i / n) as f64 * base_freq);
        let mut amp = 1.0;
        let mut sum = 0.0;
        for octave in 0..FBM_OCTAVES {
            let freq = (1u32 << octave) as f64;
            sum += amp * perlin.get([x * freq, y * freq]);
            amp *= FBM_PERSISTENCE;
        }
        *v = sum as f32;
    }
    let lo = hf.min_value();
    let span = (hf.max_value() - lo).max(f32::EPSILON);
    for v in &mut hf.data {
        *v = (*v - lo) / span * relief;
    }
    hf
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bowl_is_lowest_at_centre() {
        let hf = bowl(5, 10.0);
        assert_eq!(hf.get(2, 2), 0.0);
        assert!((hf.get(0, 0) - 10.0).abs() < 1e-5);
        assert!(hf.get(2, 1) < hf.get(1, 1));
        assert_eq!(hf.min_value(), 0.0);
    }

    #[test]
    fn fbm_spans_requested_relief() {
        let hf = fbm(32, 7, DEFAULT_RELIEF_M);
        assert!(hf.min_value().abs() < 1e-3);
        assert!((hf.max_value() - DEFAULT_RELIEF_M).abs() < 1e-1);
        assert_eq!(hf, fbm(32, 7, DEFAULT_RELIEF_M));
    }
}
