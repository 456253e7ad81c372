//! Simulation driver: owns the fields for one run and steps the selected flow
//! strategy through a fixed iteration budget.
//!
//! States: `Uninitialized → Running → Complete`. There is no convergence
//! test; a run always spends its whole budget unless cancelled.

use std::sync::atomic::{AtomicBool, Ordering};

use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::classify::{classify_field, WaterClass};
use crate::error::{HydroError, Result};
use crate::field::{Field, HeightField, SedimentField, WaterField};
use crate::hydraulic::{flow_update, strategy_for, FlowStrategy};
use crate::params::SimulationParams;
use crate::snapshot::{NoSnapshots, SnapshotSink};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Uninitialized,
    Running,
    Complete,
}

/// Water totals after one iteration, for logs and diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IterationStats {
    pub iteration: u32,
    pub total_water: f64,
    pub max_depth: f32,
}

impl IterationStats {
    fn measure(iteration: u32, water: &WaterField) -> Self {
        Self {
            iteration,
            total_water: water.total(),
            max_depth: water.max_value(),
        }
    }
}

/// Everything a finished run hands to world building.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HydrologyResult {
    pub mode: String,
    pub cell_width: f32,
    pub iterations: u32,
    pub water: WaterField,
    /// Final terrain; only differs from the input in erosion mode.
    pub height: HeightField,
    pub sediment: Option<SedimentField>,
    pub categories: Vec<WaterClass>,
}

pub struct Simulation {
    params: SimulationParams,
    state: RunState,
    height: HeightField,
    initial_water: Option<WaterField>,
    water: Option<WaterField>,
    strategy: Option<Box<dyn FlowStrategy>>,
    rng: Box<dyn RngCore + Send>,
    iteration: u32,
    budget: u32,
    last_stats: Option<IterationStats>,
}

impl Simulation {
    /// A new, unstarted run over `height`. Nothing is validated until
    /// [`Simulation::start`].
    pub fn new(height: HeightField, params: SimulationParams) -> Self {
        let rng = Box::new(StdRng::seed_from_u64(params.seed));
        Self {
            params,
            state: RunState::Uninitialized,
            height,
            initial_water: None,
            water: None,
            strategy: None,
            rng,
            iteration: 0,
            budget: 0,
            last_stats: None,
        }
    }

    /// Start from this water field instead of a uniform `initial_water` depth.
    pub fn with_initial_water(mut self, water: WaterField) -> Self {
        self.initial_water = Some(water);
        self
    }

    /// Replace the seeded default random source used for noisy rain.
    pub fn with_rng<R: RngCore + Send + 'static>(mut self, rng: R) -> Self {
        self.rng = Box::new(rng);
        self
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn params(&self) -> &SimulationParams {
        &self.params
    }

    /// Iterations completed so far.
    pub fn iteration(&self) -> u32 {
        self.iteration
    }

    /// Total iterations this run will perform. Zero before start.
    pub fn budget(&self) -> u32 {
        self.budget
    }

    pub fn height(&self) -> &HeightField {
        &self.height
    }

    pub fn water(&self) -> Option<&WaterField> {
        self.water.as_ref()
    }

    pub fn sediment(&self) -> Option<&SedimentField> {
        self.strategy.as_ref().and_then(|s| s.sediment())
    }

    pub fn last_stats(&self) -> Option<IterationStats> {
        self.last_stats
    }

    /// Validate inputs and allocate the run's fields. Idempotent while running.
    pub fn start(&mut self) -> Result<()> {
        match self.state {
            RunState::Running => return Ok(()),
            RunState::Complete => return Err(HydroError::AlreadyComplete),
            RunState::Uninitialized => {}
        }

        self.params.validate()?;
        let n = self.height.validate_square()?;

        if let Some(w) = &self.initial_water {
            self.height.ensure_same_shape(w)?;
            if let Some(index) = w.data.iter().position(|v| !v.is_finite()) {
                return Err(HydroError::NonFinite { index });
            }
        }
        let water = match self.initial_water.take() {
            Some(mut w) => {
                w.clamp_non_negative();
                w
            }
            None => Field::new(n, n, self.params.initial_water),
        };

        self.budget = self.params.iteration_budget(n);
        self.strategy = Some(strategy_for(&self.params.mode, n, n));
        info!(
            "hydrology: {n}x{n} grid, {} mode, {} iterations, {:.3} m summed water depth",
            self.params.mode.name(),
            self.budget,
            water.total()
        );
        self.water = Some(water);
        self.state = if self.budget == 0 {
            RunState::Complete
        } else {
            RunState::Running
        };
        Ok(())
    }

    /// Advance exactly one iteration. Starts the run if needed.
    pub fn step(&mut self) -> Result<RunState> {
        if self.state == RunState::Uninitialized {
            self.start()?;
        }
        if self.state == RunState::Complete {
            return Err(HydroError::AlreadyComplete);
        }
        let (Some(strategy), Some(water)) = (self.strategy.as_deref_mut(), self.water.as_mut())
        else {
            return Err(HydroError::NotStarted);
        };

        flow_update(strategy, &mut self.height, water, &self.params, self.rng.as_mut());

        let stats = IterationStats::measure(self.iteration, water);
        debug!(
            "iteration {}/{}: total water {:.4}, max depth {:.4}",
            self.iteration + 1,
            self.budget,
            stats.total_water,
            stats.max_depth
        );
        self.last_stats = Some(stats);
        self.iteration += 1;
        if self.iteration >= self.budget {
            self.state = RunState::Complete;
        }
        Ok(self.state)
    }

    /// Run to completion, reporting each iteration's water to `sink`.
    /// `cancel` is checked between iterations.
    pub fn run_with(
        &mut self,
        sink: &mut dyn SnapshotSink,
        cancel: Option<&AtomicBool>,
    ) -> Result<()> {
        self.start()?;
        while self.state == RunState::Running {
            if cancel.is_some_and(|c| c.load(Ordering::Relaxed)) {
                warn!("hydrology cancelled after {} of {} iterations", self.iteration, self.budget);
                return Err(HydroError::Cancelled {
                    completed: self.iteration,
                });
            }
            let index = self.iteration;
            self.step()?;
            if let Some(water) = &self.water {
                sink.record(index, water);
            }
        }
        if let Some(water) = &self.water {
            info!(
                "hydrology complete after {} iterations: {:.3} total water, max depth {:.3} m",
                self.iteration,
                water.total(),
                water.max_value()
            );
        }
        Ok(())
    }

    /// Run to completion without snapshots.
    pub fn run(&mut self) -> Result<()> {
        self.run_with(&mut NoSnapshots, None)
    }

    /// Freeze the fields into a result. The run must have started.
    pub fn into_result(self) -> Result<HydrologyResult> {
        let water = self.water.ok_or(HydroError::NotStarted)?;
        let sediment = self
            .strategy
            .as_ref()
            .and_then(|s| s.sediment().cloned());
        Ok(HydrologyResult {
            mode: self.params.mode.name().to_string(),
            cell_width: self.params.cell_width,
            iterations: self.iteration,
            categories: classify_field(&water),
            water,
            height: self.height,
            sediment,
        })
    }
}

/// Run a whole simulation over `height` and return its frozen result.
pub fn simulate(height: HeightField, params: SimulationParams) -> Result<HydrologyResult> {
    let mut sim = Simulation::new(height, params);
    sim.run()?;
    sim.into_result()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{Evaporation, RainParams};
    use crate::snapshot::MemorySnapshots;

    fn short(iterations: u32) -> SimulationParams {
        SimulationParams {
            cell_width: 1.0,
            iteration_count: Some(iterations),
            rain: RainParams { per_iteration: 0.1, noisy: false },
            evaporation: Evaporation::Depth(0.0),
            ..SimulationParams::default()
        }
    }

    #[test]
    fn state_machine_walks_to_complete() {
        let mut sim = Simulation::new(Field::square(3), short(2));
        assert_eq!(sim.state(), RunState::Uninitialized);
        assert_eq!(sim.step().unwrap(), RunState::Running);
        assert_eq!(sim.budget(), 2);
        assert_eq!(sim.step().unwrap(), RunState::Complete);
        assert_eq!(sim.step(), Err(HydroError::AlreadyComplete));
        assert_eq!(sim.start(), Err(HydroError::AlreadyComplete));
        assert_eq!(sim.iteration(), 2);
    }

    #[test]
    fn empty_height_field_refuses_to_start() {
        let mut sim = Simulation::new(Field::new(0, 0, 0.0), short(5));
        assert_eq!(sim.run(), Err(HydroError::EmptyGrid));
        assert_eq!(sim.state(), RunState::Uninitialized);
        assert!(sim.water().is_none());
    }

    #[test]
    fn mismatched_initial_water_is_rejected() {
        let sim = Simulation::new(Field::square(4), short(1));
        let mut sim = sim.with_initial_water(Field::square(3));
        assert!(matches!(sim.start(), Err(HydroError::ShapeMismatch { .. })));
    }

    #[test]
    fn unstarted_run_has_no_result() {
        let sim = Simulation::new(Field::square(3), short(1));
        assert!(matches!(sim.into_result(), Err(HydroError::NotStarted)));
    }

    #[test]
    fn zero_budget_completes_immediately() {
        let mut sim = Simulation::new(Field::square(3), short(0));
        sim.run().unwrap();
        assert_eq!(sim.state(), RunState::Complete);
        let result = sim.into_result().unwrap();
        assert_eq!(result.iterations, 0);
    }

    #[test]
    fn snapshots_see_every_iteration() {
        let mut sim = Simulation::new(Field::square(3), short(4));
        let mut snaps = MemorySnapshots::new(1);
        sim.run_with(&mut snaps, None).unwrap();
        let seen: Vec<u32> = snaps.frames.iter().map(|(i, _)| *i).collect();
        assert_eq!(seen, vec![0, 1, 2, 3]);
        assert!((snaps.frames[3].1.get(1, 1) - 0.4).abs() < 1e-6);
    }

    #[test]
    fn cancellation_stops_between_iterations() {
        let flag = AtomicBool::new(true);
        let mut sim = Simulation::new(Field::square(3), short(10));
        let err = sim.run_with(&mut NoSnapshots, Some(&flag)).unwrap_err();
        assert_eq!(err, HydroError::Cancelled { completed: 0 });
        assert_eq!(sim.state(), RunState::Running);
    }

    #[test]
    fn result_carries_categories_and_mode() {
        let mut p = short(25);
        p.initial_water = 0.0;
        let result = simulate(Field::square(3), p).unwrap();
        assert_eq!(result.mode, "pipe");
        assert_eq!(result.iterations, 25);
        // 25 × 0.1 = 2.5 m everywhere.
        assert!(result.categories.iter().all(|&c| c == WaterClass::Lake));
        assert!(result.sediment.is_none());
        let json = serde_json::to_string(&result).unwrap();
        assert!(json.contains("\"lake\""));
    }
}
