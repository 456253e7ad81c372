//! Slope relaxation.
//!
//! Any cell whose gradient slope exceeds the repose slope takes the value of a
//! Gaussian-smoothed copy of the terrain. Approximates talus collapse; it is a
//! stabilising pass, not a flow.
use crate::field::{Field, HeightField};
use crate::grid::EdgeMode;

use super::for_each_row;
use super::gradient::central_gradient;

/// Normalised 1D Gaussian kernel of radius `ceil(3σ)`.
fn gaussian_kernel(sigma: f32) -> Vec<f32> {
    let radius = (3.0 * sigma).ceil().max(1.0) as isize;
    let two_sigma2 = 2.0 * sigma * sigma;
    let mut k: Vec<f32> = (-radius..=radius)
        .map(|x| (-(x * x) as f32 / two_sigma2).exp())
        .collect();
    let sum: f32 = k.iter().sum();
    for v in &mut k {
        *v /= sum;
    }
    k
}

/// Separable Gaussian blur. Edges wrap or replicate the border per `edge`.
pub fn gaussian_blur(field: &Field, sigma: f32, edge: EdgeMode) -> Field {
    let (w, h) = field.shape();
    let kernel = gaussian_kernel(sigma);
    let radius = (kernel.len() / 2) as isize;

    let mut horizontal = field.zeros_like();
    for_each_row(&mut horizontal.data, w, |r, row| {
        for (c, v) in row.iter_mut().enumerate() {
            *v = kernel
                .iter()
                .enumerate()
                .map(|(k, &wt)| {
                    let cc = edge.resolve_clamped(c as isize + k as isize - radius, w);
                    wt * field.get(r, cc)
                })
                .sum();
        }
    });

    let mut out = field.zeros_like();
    for_each_row(&mut out.data, w, |r, row| {
        for (c, v) in row.iter_mut().enumerate() {
            *v = kernel
                .iter()
                .enumerate()
                .map(|(k, &wt)| {
                    let rr = edge.resolve_clamped(r as isize + k as isize - radius, h);
                    wt * horizontal.get(rr, c)
                })
                .sum();
        }
    });
    out
}

/// Replace over-steep cells with their smoothed height.
///
/// `repose_slope` is rise over run; the gradient is divided by `cell_width`
/// before comparison. Returns the number of cells relaxed.
pub fn apply_slippage(
    hf: &mut HeightField,
    repose_slope: f32,
    cell_width: f32,
    sigma: f32,
    edge: EdgeMode,
) -> usize {
    let gradient = central_gradient(hf, edge);
    let steep: Vec<usize> = gradient
        .iter()
        .enumerate()
        .filter(|(_, g)| (g.0 * g.0 + g.1 * g.1).sqrt() / cell_width > repose_slope)
        .map(|(i, _)| i)
        .collect();
    if steep.is_empty() {
        return 0;
    }

    let smoothed = gaussian_blur(hf, sigma, edge);
    for &i in &steep {
        hf.data[i] = smoothed.data[i];
    }
    steep.len()
}
