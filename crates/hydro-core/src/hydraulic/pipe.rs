//! Eight-pipe hydrostatic flow.
//!
//! Each cell owns eight outflow pipes, one per neighbour. Per iteration:
//!   1. Surface `S = H + W`.
//!   2. `flux_d ← max(0, flux_d + dt · A · g · (S − S_d) / L)` for every pipe.
//!   3. Scale all of a cell's pipes by `W · L² / (Σ flux · dt)`, times the
//!      damping constant, so a cell never ships more water than it holds.
//!   4. `W += dt / L² · (inflow − outflow)`, where inflow is each neighbour's
//!      outflow in the opposite direction.
//!
//! Flux is never negative; reverse flow is carried by the opposite pipe.
use crate::field::{Field, HeightField, WaterField};
use crate::grid::{Direction, EdgeMode};
use crate::params::PipeParams;

use super::{for_each_row, FlowStrategy, StepContext};

/// Outflow rate from every cell through each of its eight pipes.
/// Stored per cell, indexed by [`Direction::index`].
#[derive(Debug, Clone, PartialEq)]
pub struct FluxField {
    pub data: Vec<[f32; 8]>,
    pub width: usize,
    pub height: usize,
}

impl FluxField {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            data: vec![[0.0; 8]; width * height],
            width,
            height,
        }
    }

    /// Total outflow from cell `i`.
    #[inline]
    pub fn outflow(&self, i: usize) -> f32 {
        self.data[i].iter().sum()
    }

    /// Total inflow into `(row, col)`: each in-grid neighbour's pipe pointing back.
    pub fn inflow(&self, row: usize, col: usize, edge: EdgeMode) -> f32 {
        Direction::ALL
            .iter()
            .filter_map(|&d| {
                edge.neighbour(row, col, d.offset(), self.width, self.height)
                    .map(|j| self.data[j][d.opposite().index()])
            })
            .sum()
    }

    /// Copy one direction's pipes out as a scalar field.
    pub fn direction(&self, d: Direction) -> Field {
        Field {
            data: self.data.iter().map(|f| f[d.index()]).collect(),
            width: self.width,
            height: self.height,
        }
    }
}

/// Surface height of the neighbour of `(row, col)` in direction `d`, or
/// `None` when no pipe exists there.
#[inline]
fn neighbour_surface(
    surface: &[f32],
    height: &HeightField,
    row: usize,
    col: usize,
    d: Direction,
    edge: EdgeMode,
) -> Option<f32> {
    match edge.neighbour(row, col, d.offset(), height.width, height.height) {
        Some(j) => Some(surface[j]),
        // Open edge: bare ground at this cell's own terrain height.
        None if edge == EdgeMode::Sink => Some(height.get(row, col)),
        None => None,
    }
}

/// Step 2: accelerate every pipe by its surface drop.
pub fn update_flux(
    flux: &mut FluxField,
    height: &HeightField,
    water: &WaterField,
    ctx: &StepContext,
) {
    let surface: Vec<f32> = height
        .data
        .iter()
        .zip(&water.data)
        .map(|(h, w)| h + w)
        .collect();
    let k = ctx.iteration_length * ctx.pipe_area() * ctx.gravity_constant / ctx.cell_width;
    let width = height.width;
    let edge = ctx.edge_mode;

    for_each_row(&mut flux.data, width, |r, row| {
        for (c, pipes) in row.iter_mut().enumerate() {
            let s = surface[r * width + c];
            for d in Direction::ALL {
                let f = &mut pipes[d.index()];
                *f = match neighbour_surface(&surface, height, r, c, d, edge) {
                    Some(sd) => (*f + k * (s - sd)).max(0.0),
                    None => 0.0,
                };
            }
        }
    });
}

/// Step 3: rescale each cell's pipes to its available water, then damp.
pub fn scale_flux(flux: &mut FluxField, water: &WaterField, ctx: &StepContext, damping: f32) {
    let width = flux.width;
    let cell_area = ctx.cell_area();
    let dt = ctx.iteration_length;

    for_each_row(&mut flux.data, width, |r, row| {
        for (c, pipes) in row.iter_mut().enumerate() {
            let total: f32 = pipes.iter().sum();
            let scale = if total > 0.0 {
                water.data[r * width + c] * cell_area / (total * dt)
            } else {
                1.0
            };
            for f in pipes.iter_mut() {
                *f *= scale * damping;
            }
        }
    });
}

/// Step 4: move water along the pipes. Clamps the result at zero.
pub fn apply_flux(flux: &FluxField, water: &mut WaterField, ctx: &StepContext) {
    let width = water.width;
    let rate = ctx.iteration_length / ctx.cell_area();
    let edge = ctx.edge_mode;
    let before = water.data.clone();

    for_each_row(&mut water.data, width, |r, row| {
        for (c, w) in row.iter_mut().enumerate() {
            let i = r * width + c;
            let delta = rate * (flux.inflow(r, c, edge) - flux.outflow(i));
            *w = (before[i] + delta).max(0.0);
        }
    });
}

/// Eight-direction pipe strategy. Terrain is read-only.
#[derive(Debug, Clone)]
pub struct PipeFlow {
    pub flux: FluxField,
    params: PipeParams,
}

impl PipeFlow {
    pub fn new(width: usize, height: usize, params: PipeParams) -> Self {
        Self {
            flux: FluxField::new(width, height),
            params,
        }
    }
}

impl FlowStrategy for PipeFlow {
    fn name(&self) -> &'static str {
        "pipe"
    }

    fn advance(&mut self, height: &mut HeightField, water: &mut WaterField, ctx: &StepContext) {
        update_flux(&mut self.flux, height, water, ctx);
        scale_flux(&mut self.flux, water, ctx, self.params.flux_damping);
        apply_flux(&self.flux, water, ctx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn ctx(edge_mode: EdgeMode) -> StepContext {
        StepContext {
            cell_width: 1.0,
            gravity_constant: 9.8,
            iteration_length: 1.0,
            edge_mode,
        }
    }

    /// 3×3 terrain with a tall centre and ground-level rim.
    fn peak() -> HeightField {
        let mut h = Field::square(3);
        h.set(1, 1, 10.0);
        h
    }

    #[test]
    fn flux_follows_surface_drop_only() {
        let h = peak();
        let w = Field::new(3, 3, 1.0);
        let mut flux = FluxField::new(3, 3);
        update_flux(&mut flux, &h, &w, &ctx(EdgeMode::Wall));

        // Centre pushes into every neighbour.
        let centre = flux.data[4];
        assert!(centre.iter().all(|&f| f > 0.0));
        assert_abs_diff_eq!(centre[0], 9.8 * 10.0, epsilon = 1e-3);
        // Rim never pushes uphill into the centre.
        assert_eq!(flux.data[1][Direction::South.index()], 0.0);
        // Equal surfaces on the rim give no flow.
        assert_eq!(flux.data[1][Direction::East.index()], 0.0);
    }

    #[test]
    fn wall_has_no_pipes_off_grid() {
        let h = peak();
        let w = Field::new(3, 3, 1.0);
        let mut flux = FluxField::new(3, 3);
        // Pre-load a stale off-grid pipe; the update must zero it.
        flux.data[0][Direction::North.index()] = 5.0;
        update_flux(&mut flux, &h, &w, &ctx(EdgeMode::Wall));
        assert_eq!(flux.data[0][Direction::North.index()], 0.0);
    }

    #[test]
    fn sink_drains_through_edges() {
        let h = Field::square(3);
        let w = Field::new(3, 3, 1.0);
        let mut flux = FluxField::new(3, 3);
        update_flux(&mut flux, &h, &w, &ctx(EdgeMode::Sink));
        // Corner has five off-grid pipes, each seeing a drop equal to its depth.
        let corner = flux.data[0];
        let open = corner.iter().filter(|&&f| f > 0.0).count();
        assert_eq!(open, 5);
        // The interior cell has no off-grid pipes and no drop.
        assert!(flux.data[4].iter().all(|&f| f == 0.0));
    }

    #[test]
    fn scaling_bounds_drain_by_damped_water() {
        let mut flux = FluxField::new(1, 1);
        flux.data[0] = [1.0e6, 2.0e6, 0.0, 0.0, 5.0e5, 0.0, 0.0, 3.0e6];
        let w = Field::new(1, 1, 0.8);
        let c = ctx(EdgeMode::Wall);
        scale_flux(&mut flux, &w, &c, 0.5);
        let drained = flux.outflow(0) * c.iteration_length / c.cell_area();
        assert!(drained <= 0.8 + 1e-6);
        assert_abs_diff_eq!(drained, 0.4, epsilon = 1e-5);
    }

    #[test]
    fn zero_flux_scale_is_identity() {
        let mut flux = FluxField::new(2, 2);
        let w = Field::new(2, 2, 3.0);
        scale_flux(&mut flux, &w, &ctx(EdgeMode::Wrap), 0.5);
        assert!(flux.data.iter().all(|p| p.iter().all(|&f| f == 0.0)));
    }

    #[test]
    fn mass_is_conserved_with_closed_edges() {
        let h = peak();
        let mut w = Field::new(3, 3, 1.0);
        let mut s = PipeFlow::new(3, 3, PipeParams::default());
        let mut hh = h.clone();
        let before = w.total();
        for _ in 0..20 {
            s.advance(&mut hh, &mut w, &ctx(EdgeMode::Wall));
        }
        assert_abs_diff_eq!(w.total(), before, epsilon = 1e-4);
        assert_eq!(hh, h, "pipe flow must not touch terrain");
        // Water ran off the peak.
        assert!(w.get(1, 1) < 1.0);
    }

    #[test]
    fn mass_is_conserved_with_wrapped_edges() {
        let mut h = Field::square(4);
        h.set(0, 0, 3.0);
        let mut w = Field::new(4, 4, 0.5);
        let mut s = PipeFlow::new(4, 4, PipeParams::default());
        let before = w.total();
        for _ in 0..30 {
            s.advance(&mut h, &mut w, &ctx(EdgeMode::Wrap));
        }
        assert_abs_diff_eq!(w.total(), before, epsilon = 1e-4);
    }

    #[test]
    fn inflow_reads_opposite_pipe() {
        let mut flux = FluxField::new(3, 3);
        // Cell west of centre pushes east.
        flux.data[3][Direction::East.index()] = 2.0;
        // Cell north-east of centre pushes south-west.
        flux.data[2][Direction::SouthWest.index()] = 1.5;
        assert_abs_diff_eq!(flux.inflow(1, 1, EdgeMode::Wall), 3.5);
        assert_eq!(flux.direction(Direction::East).get(1, 0), 2.0);
    }
}
