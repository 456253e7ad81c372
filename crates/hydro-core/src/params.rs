//! Run parameters. Fixed for the lifetime of one simulation.
//!
//! Defaults are calibrated to a one-day step over three simulated years with
//! Britain-average rain and evaporation rates.

use serde::{Deserialize, Serialize};

use crate::error::{HydroError, Result};
use crate::grid::EdgeMode;

pub const SECONDS_PER_DAY: f32 = 24.0 * 60.0 * 60.0;
pub const SECONDS_PER_YEAR: f32 = 365.0 * SECONDS_PER_DAY;

/// Extra multiplier on conservation-scaled flux. Keeps a cell from emptying
/// into its neighbours in one step, which on flat ground otherwise settles
/// into an alternating-cell pattern.
pub const DEFAULT_FLUX_DAMPING: f32 = 0.5;

/// Precipitation added at the start of every iteration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RainParams {
    /// Metres of water added per iteration.
    pub per_iteration: f32,
    /// Scale each cell's rain by independent uniform noise in [0, 1).
    pub noisy: bool,
}

impl Default for RainParams {
    fn default() -> Self {
        Self {
            per_iteration: 0.000_000_042 * SECONDS_PER_DAY,
            noisy: true,
        }
    }
}

/// Water removed at the end of every iteration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "kind", content = "amount")]
pub enum Evaporation {
    /// Subtract a fixed depth (metres) per iteration, clamped at zero.
    Depth(f32),
    /// Remove this fraction of the standing water per iteration.
    Fraction(f32),
}

impl Default for Evaporation {
    fn default() -> Self {
        Evaporation::Depth(0.000_000_03 * SECONDS_PER_DAY)
    }
}

/// Constants for the eight-pipe accumulation strategy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipeParams {
    /// Multiplier on conservation-scaled flux, in (0, 1].
    pub flux_damping: f32,
}

impl Default for PipeParams {
    fn default() -> Self {
        Self { flux_damping: DEFAULT_FLUX_DAMPING }
    }
}

/// Constants for the gradient-advection erosion strategy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ErosionParams {
    /// Slope (rise over run) above which terrain is relaxed by smoothing.
    pub repose_slope: f32,
    pub sediment_capacity_constant: f32,
    /// Fraction of the capacity deficit dissolved per iteration.
    pub dissolving_rate: f32,
    /// Fraction of the capacity surplus deposited per iteration.
    pub deposition_rate: f32,
    /// Floor on the height delta used for capacity, so flat water still carries.
    pub min_height_delta: f32,
    /// Gaussian sigma (cells) of the slippage smoothing kernel.
    pub slippage_sigma: f32,
}

impl Default for ErosionParams {
    fn default() -> Self {
        Self {
            repose_slope: 0.03,
            sediment_capacity_constant: 50.0,
            dissolving_rate: 0.25,
            deposition_rate: 0.001,
            min_height_delta: 0.05,
            slippage_sigma: 1.5,
        }
    }
}

/// Which flow strategy drives the run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "strategy")]
pub enum FlowMode {
    /// Eight-pipe hydrostatic accumulation; terrain is read-only.
    Pipe(PipeParams),
    /// Single-gradient advection with sediment transport; terrain is mutated.
    Erosion(ErosionParams),
}

impl Default for FlowMode {
    fn default() -> Self {
        FlowMode::Pipe(PipeParams::default())
    }
}

impl FlowMode {
    pub fn name(&self) -> &'static str {
        match self {
            FlowMode::Pipe(_) => "pipe",
            FlowMode::Erosion(_) => "erosion",
        }
    }
}

/// Every tunable of one simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationParams {
    /// Metres per cell; also pipe length. Pipe area is its square.
    pub cell_width: f32,
    /// m/s².
    pub gravity_constant: f32,
    /// Simulated seconds per iteration.
    pub iteration_length: f32,
    /// Total simulated seconds; sets the iteration budget.
    pub simulation_time: f32,
    /// Explicit iteration budget, overriding the derived one.
    pub iteration_count: Option<u32>,
    /// Uniform starting water depth in metres.
    pub initial_water: f32,
    pub rain: RainParams,
    pub evaporation: Evaporation,
    pub edge_mode: EdgeMode,
    /// Seed for noisy rain.
    pub seed: u64,
    pub mode: FlowMode,
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self::water_defaults(100.0)
    }
}

impl SimulationParams {
    /// Accumulation-mode preset for cells `cell_width` metres across.
    pub fn water_defaults(cell_width: f32) -> Self {
        Self {
            cell_width,
            gravity_constant: 9.8,
            iteration_length: SECONDS_PER_DAY,
            simulation_time: 3.0 * SECONDS_PER_YEAR,
            iteration_count: None,
            initial_water: 0.0,
            rain: RainParams::default(),
            evaporation: Evaporation::default(),
            edge_mode: EdgeMode::default(),
            seed: 42,
            mode: FlowMode::Pipe(PipeParams::default()),
        }
    }

    /// Erosion-mode preset for cells `cell_width` metres across.
    /// Iterations are dimensionless here, so the budget is the grid floor.
    pub fn erosion_defaults(cell_width: f32) -> Self {
        Self {
            cell_width,
            gravity_constant: 30.0,
            iteration_length: 1.0,
            simulation_time: 0.0,
            iteration_count: None,
            initial_water: 0.0,
            rain: RainParams {
                per_iteration: 0.0008 * cell_width * cell_width,
                noisy: true,
            },
            evaporation: Evaporation::Fraction(0.0005),
            edge_mode: EdgeMode::default(),
            seed: 42,
            mode: FlowMode::Erosion(ErosionParams::default()),
        }
    }

    /// Parse parameters from JSON; missing fields take their defaults.
    pub fn from_json(text: &str) -> Result<Self> {
        let params: Self =
            serde_json::from_str(text).map_err(|e| HydroError::Config(e.to_string()))?;
        params.validate()?;
        Ok(params)
    }

    /// Iterations for a grid of side `n`: enough to cover the configured
    /// simulated time, and never fewer than it takes a disturbance to cross
    /// the grid.
    pub fn iteration_budget(&self, n: usize) -> u32 {
        if let Some(count) = self.iteration_count {
            return count;
        }
        let by_time = if self.iteration_length > 0.0 {
            (self.simulation_time / self.iteration_length).floor().max(0.0) as u32
        } else {
            0
        };
        let crossing = (1.4 * n as f64).ceil() as u32;
        by_time.max(crossing)
    }

    pub fn validate(&self) -> Result<()> {
        positive("cell_width", self.cell_width)?;
        positive("iteration_length", self.iteration_length)?;
        finite_non_negative("gravity_constant", self.gravity_constant)?;
        finite_non_negative("simulation_time", self.simulation_time)?;
        finite_non_negative("initial_water", self.initial_water)?;
        finite_non_negative("rain.per_iteration", self.rain.per_iteration)?;
        match self.evaporation {
            Evaporation::Depth(d) => finite_non_negative("evaporation", d)?,
            Evaporation::Fraction(f) => {
                if !(0.0..=1.0).contains(&f) {
                    return Err(invalid("evaporation", format!("fraction {f} outside [0, 1]")));
                }
            }
        }
        match self.mode {
            FlowMode::Pipe(p) => {
                if !(p.flux_damping > 0.0 && p.flux_damping <= 1.0) {
                    return Err(invalid(
                        "flux_damping",
                        format!("{} outside (0, 1]", p.flux_damping),
                    ));
                }
            }
            FlowMode::Erosion(e) => {
                finite_non_negative("repose_slope", e.repose_slope)?;
                finite_non_negative("sediment_capacity_constant", e.sediment_capacity_constant)?;
                finite_non_negative("dissolving_rate", e.dissolving_rate)?;
                finite_non_negative("deposition_rate", e.deposition_rate)?;
                finite_non_negative("min_height_delta", e.min_height_delta)?;
                positive("slippage_sigma", e.slippage_sigma)?;
            }
        }
        Ok(())
    }
}

fn invalid(name: &'static str, reason: String) -> HydroError {
    HydroError::InvalidParameter { name, reason }
}

fn positive(name: &'static str, v: f32) -> Result<()> {
    if v.is_finite() && v > 0.0 {
        Ok(())
    } else {
        Err(invalid(name, format!("{v} must be positive and finite")))
    }
}

fn finite_non_negative(name: &'static str, v: f32) -> Result<()> {
    if v.is_finite() && v >= 0.0 {
        Ok(())
    } else {
        Err(invalid(name, format!("{v} must be non-negative and finite")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_budget_covers_three_years_of_days() {
        let p = SimulationParams::water_defaults(100.0);
        assert_eq!(p.iteration_budget(10), 1095);
    }

    #[test]
    fn budget_never_below_grid_crossing() {
        let mut p = SimulationParams::water_defaults(100.0);
        p.simulation_time = 2.0 * SECONDS_PER_DAY;
        // ceil(1.4 · 1000) = 1400 > 2 days.
        assert_eq!(p.iteration_budget(1000), 1400);
        assert_eq!(p.iteration_budget(3), 5);
        assert_eq!(SimulationParams::erosion_defaults(100.0).iteration_budget(64), 90);
    }

    #[test]
    fn explicit_count_overrides_derivation() {
        let p = SimulationParams {
            iteration_count: Some(7),
            ..SimulationParams::default()
        };
        assert_eq!(p.iteration_budget(1000), 7);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let p = SimulationParams::from_json(
            r#"{ "cell_width": 50.0, "iteration_count": 12, "edge_mode": "wrap" }"#,
        )
        .unwrap();
        assert_eq!(p.cell_width, 50.0);
        assert_eq!(p.iteration_count, Some(12));
        assert_eq!(p.edge_mode, EdgeMode::Wrap);
        assert_eq!(p.gravity_constant, 9.8);
        assert_eq!(p.mode, FlowMode::Pipe(PipeParams::default()));
    }

    #[test]
    fn erosion_mode_parses_from_tagged_json() {
        let p = SimulationParams::from_json(
            r#"{ "mode": { "strategy": "erosion", "repose_slope": 0.1 },
                 "evaporation": { "kind": "fraction", "amount": 0.01 } }"#,
        )
        .unwrap();
        match p.mode {
            FlowMode::Erosion(e) => {
                assert_eq!(e.repose_slope, 0.1);
                assert_eq!(e.dissolving_rate, 0.25);
            }
            other => panic!("expected erosion mode, got {other:?}"),
        }
        assert_eq!(p.evaporation, Evaporation::Fraction(0.01));
    }

    #[test]
    fn validation_rejects_bad_constants() {
        let mut p = SimulationParams::default();
        p.cell_width = 0.0;
        assert!(matches!(
            p.validate(),
            Err(HydroError::InvalidParameter { name: "cell_width", .. })
        ));

        let mut p = SimulationParams::default();
        p.mode = FlowMode::Pipe(PipeParams { flux_damping: 1.5 });
        assert!(p.validate().is_err());

        assert!(matches!(
            SimulationParams::from_json("{ not json"),
            Err(HydroError::Config(_))
        ));
    }
}
