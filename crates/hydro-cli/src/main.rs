//! Command-line driver: load or synthesise a height field, run the hydrology
//! simulation and write the result as JSON.

mod snapshots;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use hydro_core::{
    terrain, EdgeMode, Field, HeightField, NoSnapshots, SimulationParams, Simulation, WaterClass,
};
use log::info;
use serde::Deserialize;

use snapshots::PngSnapshots;

#[derive(Parser, Debug)]
#[command(name = "hydro", about = "Rain, flow and classify surface water over a height field")]
struct Args {
    /// Height field JSON: either `{data, width, height}` or nested rows.
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Multiply input heights by this factor. World files store the terrain
    /// initializer's [0, 1] output; pass 2000 (`terrain::DEFAULT_RELIEF_M`)
    /// to get metres.
    #[arg(long, default_value_t = 1.0)]
    height_scale: f32,

    /// Replace the terrain with level ground at zero, keeping its shape.
    #[arg(long)]
    flat_terrain: bool,

    /// Side length of a synthetic fBm terrain, used when no input is given.
    #[arg(long, default_value_t = 64)]
    size: usize,

    /// Seed for the synthetic terrain.
    #[arg(long, default_value_t = 1)]
    terrain_seed: u32,

    /// Parameter JSON. Missing fields take the preset's values.
    #[arg(short, long)]
    params: Option<PathBuf>,

    /// Parameter preset used when no parameter file is given.
    #[arg(long, value_enum, default_value_t = Preset::Water)]
    preset: Preset,

    /// Metres per cell for the preset.
    #[arg(long, default_value_t = 100.0)]
    cell_width: f32,

    #[arg(long)]
    seed: Option<u64>,

    /// Override the derived iteration budget.
    #[arg(long)]
    iterations: Option<u32>,

    /// Uniform starting water depth in metres.
    #[arg(long)]
    initial_water: Option<f32>,

    #[arg(long, value_enum)]
    edge: Option<CliEdgeMode>,

    /// Output result JSON.
    #[arg(short, long, default_value = "hydrology.json")]
    output: PathBuf,

    /// Write water-depth PNG snapshots into this directory.
    #[arg(long, value_name = "DIR")]
    snapshots: Option<PathBuf>,

    /// Keep every Nth snapshot.
    #[arg(long, default_value_t = 10)]
    snapshot_every: u32,

    /// Also combine the kept snapshots into `animation.gif`.
    #[arg(long, requires = "snapshots")]
    gif: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Preset {
    Water,
    Erosion,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum CliEdgeMode {
    Wrap,
    Wall,
    Sink,
}

impl From<CliEdgeMode> for EdgeMode {
    fn from(mode: CliEdgeMode) -> Self {
        match mode {
            CliEdgeMode::Wrap => EdgeMode::Wrap,
            CliEdgeMode::Wall => EdgeMode::Wall,
            CliEdgeMode::Sink => EdgeMode::Sink,
        }
    }
}

/// Accepted height field layouts.
#[derive(Deserialize)]
#[serde(untagged)]
enum HeightInput {
    Flat(Field),
    Rows(Vec<Vec<f32>>),
}

fn load_height(path: &Path) -> Result<HeightField> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("cannot read height field {}", path.display()))?;
    let input: HeightInput = serde_json::from_str(&text)
        .with_context(|| format!("cannot parse height field {}", path.display()))?;
    match input {
        HeightInput::Flat(field) => {
            if field.data.len() != field.width * field.height {
                bail!(
                    "{}: {} values for a {}x{} grid",
                    path.display(),
                    field.data.len(),
                    field.width,
                    field.height
                );
            }
            Ok(field)
        }
        HeightInput::Rows(rows) => Ok(Field::from_rows(&rows)?),
    }
}

/// Apply `--height-scale` and `--flat-terrain` to a loaded height field.
fn prepare_height(mut height: HeightField, scale: f32, flat: bool) -> Result<HeightField> {
    if !scale.is_finite() {
        bail!("height scale must be finite, got {scale}");
    }
    if flat {
        return Ok(height.zeros_like());
    }
    if scale != 1.0 {
        for h in &mut height.data {
            *h *= scale;
        }
    }
    Ok(height)
}

fn load_params(args: &Args) -> Result<SimulationParams> {
    let mut params = match &args.params {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("cannot read parameters {}", path.display()))?;
            SimulationParams::from_json(&text)
                .with_context(|| format!("invalid parameters in {}", path.display()))?
        }
        None => match args.preset {
            Preset::Water => SimulationParams::water_defaults(args.cell_width),
            Preset::Erosion => SimulationParams::erosion_defaults(args.cell_width),
        },
    };
    if let Some(seed) = args.seed {
        params.seed = seed;
    }
    if let Some(n) = args.iterations {
        params.iteration_count = Some(n);
    }
    if let Some(w) = args.initial_water {
        params.initial_water = w;
    }
    if let Some(edge) = args.edge {
        params.edge_mode = edge.into();
    }
    params.validate()?;
    Ok(params)
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let height = match &args.input {
        Some(path) => prepare_height(load_height(path)?, args.height_scale, args.flat_terrain)?,
        None if args.flat_terrain => terrain::flat(args.size, 0.0),
        None => {
            eprintln!(
                "No input given; generating {0}x{0} fBm terrain (seed {1}).",
                args.size, args.terrain_seed
            );
            terrain::fbm(args.size, args.terrain_seed, terrain::DEFAULT_RELIEF_M)
        }
    };
    let params = load_params(&args)?;

    let mut sim = Simulation::new(height, params);
    match &args.snapshots {
        Some(dir) => {
            let mut frames = PngSnapshots::new(dir, args.snapshot_every, args.gif)?;
            sim.run_with(&mut frames, None)?;
            if let Some(path) = frames.write_gif()? {
                println!("Wrote {}", path.display());
            }
        }
        None => sim.run_with(&mut NoSnapshots, None)?,
    }
    let result = sim.into_result()?;

    let counts = WaterClass::histogram(&result.categories);
    for (class, count) in WaterClass::ALL.iter().zip(counts) {
        info!("{:>6}: {count} cells", class.name());
    }

    let json = serde_json::to_string(&result).context("cannot serialise result")?;
    fs::write(&args.output, json)
        .with_context(|| format!("cannot write {}", args.output.display()))?;
    println!(
        "Wrote {} ({} iterations, {} mode)",
        args.output.display(),
        result.iterations,
        result.mode
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp() -> HeightField {
        Field::from_vec(2, 2, vec![0.0, 0.25, 0.5, 1.0]).unwrap()
    }

    #[test]
    fn world_file_heights_scale_to_metres() {
        let h = prepare_height(ramp(), terrain::DEFAULT_RELIEF_M, false).unwrap();
        assert_eq!(h.data, vec![0.0, 500.0, 1000.0, 2000.0]);
        assert_eq!(h.shape(), (2, 2));
    }

    #[test]
    fn unit_scale_leaves_heights_alone() {
        assert_eq!(prepare_height(ramp(), 1.0, false).unwrap(), ramp());
    }

    #[test]
    fn flat_terrain_zeroes_heights() {
        let h = prepare_height(ramp(), 2000.0, true).unwrap();
        assert!(h.data.iter().all(|&v| v == 0.0));
        assert_eq!(h.shape(), (2, 2));
    }

    #[test]
    fn non_finite_scale_is_rejected() {
        assert!(prepare_height(ramp(), f32::NAN, false).is_err());
    }

    #[test]
    fn flags_parse() {
        let args = Args::try_parse_from([
            "hydro", "--height-scale", "2000", "--flat-terrain", "--snapshots", "snaps", "--gif",
        ])
        .unwrap();
        assert_eq!(args.height_scale, 2000.0);
        assert!(args.flat_terrain && args.gif);
        assert!(Args::try_parse_from(["hydro", "--gif"]).is_err());
    }
}
