//! Continuous-gradient helpers for the erosive strategy: central-difference
//! gradient, bilinear sampling at fractional offsets, and mass-conserving
//! bilinear displacement.
//!
//! Vectors are `(d_col, d_row)` in cells. Positive `d_col` points east,
//! positive `d_row` points south.
use crate::field::Field;
use crate::grid::EdgeMode;

use super::for_each_row;

/// Below this magnitude a gradient is treated as flat.
const FLAT_GRADIENT: f32 = 1e-10;

/// Central-difference gradient `(dz/dcol, dz/drow)` per cell, in height units
/// per cell. Closed and open edges fall back to one-sided differences.
pub fn central_gradient(field: &Field, edge: EdgeMode) -> Vec<(f32, f32)> {
    let (w, h) = field.shape();
    let mut out = vec![(0.0f32, 0.0f32); field.len()];
    for_each_row(&mut out, w, |r, row| {
        let up = edge.resolve_clamped(r as isize - 1, h);
        let down = edge.resolve_clamped(r as isize + 1, h);
        for (c, g) in row.iter_mut().enumerate() {
            let left = edge.resolve_clamped(c as isize - 1, w);
            let right = edge.resolve_clamped(c as isize + 1, w);
            let dx = 0.5 * (field.get(r, right) - field.get(r, left));
            let dy = 0.5 * (field.get(down, c) - field.get(up, c));
            *g = (dx, dy);
        }
    });
    out
}

/// Unit vector pointing down the steepest slope at every cell.
/// Flat cells get `(0, 0)` and stay put.
pub fn downhill_directions(field: &Field, edge: EdgeMode) -> Vec<(f32, f32)> {
    central_gradient(field, edge)
        .into_iter()
        .map(|(dx, dy)| {
            let mag = (dx * dx + dy * dy).sqrt();
            if mag < FLAT_GRADIENT {
                (0.0, 0.0)
            } else {
                (-dx / mag, -dy / mag)
            }
        })
        .collect()
}

/// Bilinear sample at fractional `(row, col)`.
pub fn sample_bilinear(field: &Field, row: f32, col: f32, edge: EdgeMode) -> f32 {
    let (w, h) = field.shape();
    let r0 = row.floor();
    let c0 = col.floor();
    let ty = row - r0;
    let tx = col - c0;
    let (r0, c0) = (r0 as isize, c0 as isize);

    let ra = edge.resolve_clamped(r0, h);
    let rb = edge.resolve_clamped(r0 + 1, h);
    let ca = edge.resolve_clamped(c0, w);
    let cb = edge.resolve_clamped(c0 + 1, w);

    let v00 = field.get(ra, ca);
    let v01 = field.get(ra, cb);
    let v10 = field.get(rb, ca);
    let v11 = field.get(rb, cb);

    let top = v00 + (v01 - v00) * tx;
    let bottom = v10 + (v11 - v10) * tx;
    top + (bottom - top) * ty
}

/// Sample `field` one step along each cell's direction vector.
pub fn sample_along(field: &Field, dirs: &[(f32, f32)], edge: EdgeMode) -> Field {
    let w = field.width;
    let mut out = field.zeros_like();
    for_each_row(&mut out.data, w, |r, row| {
        for (c, v) in row.iter_mut().enumerate() {
            let (dx, dy) = dirs[r * w + c];
            *v = sample_bilinear(field, r as f32 + dy, c as f32 + dx, edge);
        }
    });
    out
}

/// Per-axis splat weights for offsets -1, 0, +1 given a displacement in [-1, 1].
#[inline]
fn splat_weights(d: f32) -> [f32; 3] {
    [(-d).max(0.0), 1.0 - d.abs(), d.max(0.0)]
}

/// Move each cell's content by its direction vector, splitting it bilinearly
/// over the cells it lands between. Conserves the total except for what
/// crosses an open (`Sink`) edge.
pub fn displace(field: &Field, dirs: &[(f32, f32)], edge: EdgeMode) -> Field {
    let (w, h) = field.shape();
    let mut out = field.zeros_like();
    for r in 0..h {
        for c in 0..w {
            let i = r * w + c;
            let amount = field.data[i];
            if amount == 0.0 {
                continue;
            }
            let (dx, dy) = dirs[i];
            let wx = splat_weights(dx);
            let wy = splat_weights(dy);
            for (oy, &fy) in wy.iter().enumerate() {
                if fy == 0.0 {
                    continue;
                }
                for (ox, &fx) in wx.iter().enumerate() {
                    if fx == 0.0 {
                        continue;
                    }
                    let tr = r as isize + oy as isize - 1;
                    let tc = c as isize + ox as isize - 1;
                    let target = match edge {
                        EdgeMode::Sink => edge.resolve(tr, h).zip(edge.resolve(tc, w)),
                        _ => Some((edge.resolve_clamped(tr, h), edge.resolve_clamped(tc, w))),
                    };
                    if let Some((rr, cc)) = target {
                        out.data[rr * w + cc] += amount * fx * fy;
                    }
                }
            }
        }
    }
    out
}
