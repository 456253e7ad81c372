//! Gradient-advection hydraulic erosion.
//!
//! Instead of eight pipes, each cell moves its water and sediment one step
//! down its terrain gradient. Per iteration:
//!   1. Downhill unit vector from the terrain gradient.
//!   2. `height_delta = H − H(sampled one step downhill)`.
//!   3. Capacity `= max(height_delta, min_delta) / L · velocity · W · K`.
//!   4. Deposit or dissolve against that capacity.
//!   5. Advect sediment and water along the downhill vector.
//!   6. Relax slopes steeper than the repose slope.
//!   7. `velocity = g · height_delta / L`.
use crate::field::{Field, HeightField, SedimentField, WaterField};
use crate::params::ErosionParams;

use super::gradient::{displace, downhill_directions, sample_along};
use super::slippage::apply_slippage;
use super::{FlowStrategy, StepContext};

/// Amount moved from suspension onto the terrain at one cell. Negative values
/// dissolve terrain into suspension.
///
/// Pits (`height_delta < 0`) are filled from suspended sediment, up to their
/// depth. Erosion never removes more than the drop to the downhill neighbour,
/// and deposition never exceeds what is suspended.
#[inline]
pub fn deposit_amount(height_delta: f32, sediment: f32, capacity: f32, p: &ErosionParams) -> f32 {
    if height_delta < 0.0 {
        return (-height_delta).min(sediment);
    }
    let deposit = if sediment > capacity {
        p.deposition_rate * (sediment - capacity)
    } else {
        (p.dissolving_rate * (sediment - capacity)).max(-height_delta)
    };
    deposit.min(sediment)
}

/// Sediment a cell can carry at the given slope, speed and depth.
#[inline]
pub fn sediment_capacity(
    height_delta: f32,
    velocity: f32,
    water: f32,
    cell_width: f32,
    p: &ErosionParams,
) -> f32 {
    height_delta.max(p.min_height_delta) / cell_width * velocity * water * p.sediment_capacity_constant
}

/// Erosive strategy. Mutates terrain; carries sediment and a per-cell speed.
#[derive(Debug, Clone)]
pub struct GradientFlow {
    pub sediment: SedimentField,
    pub velocity: Field,
    params: ErosionParams,
}

impl GradientFlow {
    pub fn new(width: usize, height: usize, params: ErosionParams) -> Self {
        Self {
            sediment: Field::new(width, height, 0.0),
            velocity: Field::new(width, height, 0.0),
            params,
        }
    }
}

impl FlowStrategy for GradientFlow {
    fn name(&self) -> &'static str {
        "erosion"
    }

    fn advance(&mut self, height: &mut HeightField, water: &mut WaterField, ctx: &StepContext) {
        let p = self.params;
        let edge = ctx.edge_mode;
        let dirs = downhill_directions(height, edge);
        let downhill = sample_along(height, &dirs, edge);

        let height_delta: Vec<f32> = height
            .data
            .iter()
            .zip(&downhill.data)
            .map(|(h, n)| h - n)
            .collect();

        for i in 0..height.len() {
            let hd = height_delta[i];
            let s = self.sediment.data[i];
            let capacity =
                sediment_capacity(hd, self.velocity.data[i], water.data[i], ctx.cell_width, &p);
            let deposit = deposit_amount(hd, s, capacity, &p);
            self.sediment.data[i] = (s - deposit).max(0.0);
            height.data[i] += deposit;
        }

        self.sediment = displace(&self.sediment, &dirs, edge);
        *water = displace(water, &dirs, edge);

        apply_slippage(height, p.repose_slope, ctx.cell_width, p.slippage_sigma, edge);

        for (v, hd) in self.velocity.data.iter_mut().zip(&height_delta) {
            *v = ctx.gravity_constant * hd / ctx.cell_width;
        }
    }

    fn sediment(&self) -> Option<&SedimentField> {
        Some(&self.sediment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::EdgeMode;
    use approx::assert_abs_diff_eq;

    fn ctx() -> StepContext {
        StepContext {
            cell_width: 1.0,
            gravity_constant: 30.0,
            iteration_length: 1.0,
            edge_mode: EdgeMode::Wall,
        }
    }

    /// Falls 0.02 per column eastward: below the default repose slope, so
    /// slippage leaves it alone.
    fn gentle_ramp(n: usize) -> HeightField {
        let mut hf = Field::square(n);
        for r in 0..n {
            for c in 0..n {
                hf.set(r, c, 10.0 - c as f32 * 0.02);
            }
        }
        hf
    }

    #[test]
    fn pit_is_filled_from_suspension() {
        let p = ErosionParams::default();
        assert_abs_diff_eq!(deposit_amount(-0.5, 2.0, 0.0, &p), 0.5);
        assert_abs_diff_eq!(deposit_amount(-0.5, 0.1, 0.0, &p), 0.1);
    }

    #[test]
    fn surplus_deposits_at_deposition_rate() {
        let p = ErosionParams::default();
        assert_abs_diff_eq!(deposit_amount(1.0, 3.0, 1.0, &p), 0.001 * 2.0);
    }

    #[test]
    fn deficit_dissolves_but_not_below_the_drop() {
        let p = ErosionParams::default();
        // 0.25 · (0 − 2) = −0.5, drop is 1.0: dissolves 0.5.
        assert_abs_diff_eq!(deposit_amount(1.0, 0.0, 2.0, &p), -0.5);
        // Drop of 0.1 caps the dissolved amount.
        assert_abs_diff_eq!(deposit_amount(0.1, 0.0, 2.0, &p), -0.1);
    }

    #[test]
    fn capacity_uses_height_floor() {
        let p = ErosionParams::default();
        let flat = sediment_capacity(0.0, 2.0, 1.0, 1.0, &p);
        assert_abs_diff_eq!(flat, 0.05 * 2.0 * 1.0 * 50.0);
    }

    #[test]
    fn water_moves_downhill_and_erodes() {
        let mut hf = gentle_ramp(8);
        let start = hf.clone();
        let mut water = Field::new(8, 8, 0.1);
        let mut flow = GradientFlow::new(8, 8, ErosionParams::default());
        for _ in 0..5 {
            flow.advance(&mut hf, &mut water, &ctx());
        }
        // Closed edges: water piles up against the low (eastern) wall.
        assert!(water.get(4, 7) > water.get(4, 0));
        assert_abs_diff_eq!(water.total(), 6.4, epsilon = 1e-3);
        assert!(flow.sediment.data.iter().all(|&s| s >= 0.0));
        let eroded = hf.data.iter().zip(&start.data).any(|(a, b)| a < b);
        assert!(eroded, "moving water should dissolve some terrain");
    }

    #[test]
    fn flat_terrain_is_left_alone() {
        let mut hf = Field::new(5, 5, 2.0);
        let mut water = Field::new(5, 5, 0.3);
        let mut flow = GradientFlow::new(5, 5, ErosionParams::default());
        for _ in 0..3 {
            flow.advance(&mut hf, &mut water, &ctx());
        }
        assert!(hf.data.iter().all(|&h| h == 2.0));
        assert!(water.data.iter().all(|&w| (w - 0.3).abs() < 1e-6));
    }
}
