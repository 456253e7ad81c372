//! Water movement: one shared per-iteration skeleton with two interchangeable
//! flow strategies.
//!
//! Every iteration runs, in order:
//!   1. rain forcing
//!   2. the strategy's flow step (eight-pipe flux, or gradient advection with
//!      sediment transport)
//!   3. non-negativity clamp
//!   4. evaporation
//!
//! Steps 1, 3 and 4 live here so both strategies share the same invariants.
pub mod erosion;
pub mod gradient;
pub mod pipe;
pub mod slippage;

use rand::Rng;

use crate::field::{HeightField, SedimentField, WaterField};
use crate::forcing::{apply_evaporation, apply_rain};
use crate::grid::EdgeMode;
use crate::params::{FlowMode, SimulationParams};
use erosion::GradientFlow;
use pipe::PipeFlow;

/// Scalars every strategy needs for one step.
#[derive(Debug, Clone, Copy)]
pub struct StepContext {
    pub cell_width: f32,
    pub gravity_constant: f32,
    pub iteration_length: f32,
    pub edge_mode: EdgeMode,
}

impl StepContext {
    pub fn from_params(p: &SimulationParams) -> Self {
        Self {
            cell_width: p.cell_width,
            gravity_constant: p.gravity_constant,
            iteration_length: p.iteration_length,
            edge_mode: p.edge_mode,
        }
    }

    /// Cross-section of the virtual pipe between two cells.
    #[inline]
    pub fn pipe_area(&self) -> f32 {
        self.cell_width * self.cell_width
    }

    #[inline]
    pub fn cell_area(&self) -> f32 {
        self.cell_width * self.cell_width
    }
}

/// The per-iteration flow update. Called after rain and before evaporation.
pub trait FlowStrategy: Send {
    fn name(&self) -> &'static str;

    /// Move water (and, for erosive strategies, terrain) by one iteration.
    fn advance(&mut self, height: &mut HeightField, water: &mut WaterField, ctx: &StepContext);

    /// Suspended sediment, for strategies that carry it.
    fn sediment(&self) -> Option<&SedimentField> {
        None
    }
}

/// Build the strategy selected by `mode` for a `width × height` grid.
pub fn strategy_for(mode: &FlowMode, width: usize, height: usize) -> Box<dyn FlowStrategy> {
    match *mode {
        FlowMode::Pipe(p) => Box::new(PipeFlow::new(width, height, p)),
        FlowMode::Erosion(e) => Box::new(GradientFlow::new(width, height, e)),
    }
}

/// Run one full iteration: forcing, flow, clamp, evaporation.
pub fn flow_update<R: Rng + ?Sized>(
    strategy: &mut dyn FlowStrategy,
    height: &mut HeightField,
    water: &mut WaterField,
    params: &SimulationParams,
    rng: &mut R,
) {
    apply_rain(water, &params.rain, rng);
    strategy.advance(height, water, &StepContext::from_params(params));
    water.clamp_non_negative();
    apply_evaporation(water, params.evaporation);
}

/// Run `f(row_index, row)` over every row of `out`, in parallel when the
/// `threading` feature is enabled. Rows must be independent.
pub(crate) fn for_each_row<T, F>(out: &mut [T], width: usize, f: F)
where
    T: Send,
    F: Fn(usize, &mut [T]) + Send + Sync,
{
    if width == 0 {
        return;
    }
    #[cfg(feature = "threading")]
    {
        use rayon::prelude::*;
        out.par_chunks_mut(width)
            .enumerate()
            .for_each(|(r, row)| f(r, row));
    }
    #[cfg(not(feature = "threading"))]
    {
        out.chunks_mut(width)
            .enumerate()
            .for_each(|(r, row)| f(r, row));
    }
}
