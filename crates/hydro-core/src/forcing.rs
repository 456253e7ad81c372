//! Precipitation and evaporation, applied around every flow step.
use rand::Rng;

use crate::field::WaterField;
use crate::params::{Evaporation, RainParams};

/// Add one iteration of rain to `water`.
///
/// Noisy rain scales each cell independently by a uniform draw in [0, 1)
/// from `rng`, so a seeded rng gives a reproducible run.
pub fn apply_rain<R: Rng + ?Sized>(water: &mut WaterField, rain: &RainParams, rng: &mut R) {
    if rain.per_iteration == 0.0 {
        return;
    }
    if rain.noisy {
        for w in &mut water.data {
            *w += rain.per_iteration * rng.gen::<f32>();
        }
    } else {
        for w in &mut water.data {
            *w += rain.per_iteration;
        }
    }
}

/// Remove one iteration of evaporation from `water`. Never leaves a cell negative.
pub fn apply_evaporation(water: &mut WaterField, evaporation: Evaporation) {
    match evaporation {
        Evaporation::Depth(d) => {
            if d == 0.0 {
                return;
            }
            for w in &mut water.data {
                *w = (*w - d).max(0.0);
            }
        }
        Evaporation::Fraction(f) => {
            if f == 0.0 {
                return;
            }
            let keep = 1.0 - f;
            for w in &mut water.data {
                *w = (*w * keep).max(0.0);
            }
        }
    }
}
