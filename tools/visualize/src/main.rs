//! Diagnostic visualizer: renders a hydrology result JSON into three PNGs.
//! Not part of the main pipeline.

use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use hydro_core::{HeightField, HydrologyResult, WaterClass};

#[derive(Parser, Debug)]
#[command(name = "visualize", about = "Render water, terrain and category maps from a hydrology result")]
struct Args {
    /// Result JSON written by `hydro`.
    #[arg(default_value = "hydrology.json")]
    input: PathBuf,

    /// Output directory.
    #[arg(short, long, default_value = "data/debug")]
    out_dir: PathBuf,
}

// ── Colour helpers ────────────────────────────────────────────────────────────

/// Water category → fixed RGB colour.
fn class_color(class: WaterClass) -> [u8; 3] {
    match class {
        WaterClass::None   => [225, 215, 190], // sand
        WaterClass::Stream => [140, 200, 240], // pale blue
        WaterClass::River  => [ 40, 120, 220], // blue
        WaterClass::Lake   => [ 10,  40, 120], // navy
    }
}

/// Depth (m) → blue heatmap: 0 m = white, `max_depth` = deep blue.
fn depth_to_rgb(depth: f32, max_depth: f32) -> [u8; 3] {
    let t = (depth / max_depth).clamp(0.0, 1.0);
    let lo = (255.0 * (1.0 - t)) as u8;
    let b = (255.0 - 100.0 * t) as u8;
    [lo, lo, b]
}

/// Lambertian shade in [0, 1] with the light in the north-west.
fn hillshade(hf: &HeightField, cell_width: f32) -> Vec<f32> {
    let (w, h) = (hf.width, hf.height);
    let at = |r: isize, c: isize| {
        let r = r.clamp(0, h as isize - 1) as usize;
        let c = c.clamp(0, w as isize - 1) as usize;
        hf.get(r, c)
    };
    let light = [-1.0f32, -1.0, 1.0];
    let norm = (light[0] * light[0] + light[1] * light[1] + light[2] * light[2]).sqrt();
    let mut shade = Vec::with_capacity(w * h);
    for r in 0..h as isize {
        for c in 0..w as isize {
            let dx = (at(r, c + 1) - at(r, c - 1)) / (2.0 * cell_width);
            let dy = (at(r + 1, c) - at(r - 1, c)) / (2.0 * cell_width);
            let n = [-dx, -dy, 1.0];
            let n_len = (n[0] * n[0] + n[1] * n[1] + 1.0).sqrt();
            let dot = (n[0] * light[0] + n[1] * light[1] + n[2] * light[2]) / (n_len * norm);
            shade.push(dot.clamp(0.0, 1.0));
        }
    }
    shade
}

fn save(img: &image::RgbImage, args: &Args, name: &str) -> Result<()> {
    let path = args.out_dir.join(name);
    img.save(&path)
        .with_context(|| format!("failed to save {}", path.display()))?;
    println!("Wrote {}", path.display());
    Ok(())
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let args = Args::parse();
    let text = fs::read_to_string(&args.input)
        .with_context(|| format!("cannot read {}", args.input.display()))?;
    let result: HydrologyResult = serde_json::from_str(&text)
        .with_context(|| format!("cannot parse {}", args.input.display()))?;
    fs::create_dir_all(&args.out_dir)
        .with_context(|| format!("cannot create {}", args.out_dir.display()))?;

    let (w, h) = (result.water.width, result.water.height);
    if w == 0 || h == 0 || result.categories.len() != w * h || result.height.shape() != (w, h) {
        bail!("{}: fields do not share a {w}×{h} grid", args.input.display());
    }
    println!(
        "{w}×{h} {} result after {} iterations, {:.2} m summed depth",
        result.mode,
        result.iterations,
        result.water.total()
    );

    // ── 1. water.png ─────────────────────────────────────────────────────────
    {
        let max_depth = result.water.max_value().max(1e-6);
        let mut img = image::RgbImage::new(w as u32, h as u32);
        for r in 0..h {
            for c in 0..w {
                let px = depth_to_rgb(result.water.get(r, c), max_depth);
                img.put_pixel(c as u32, r as u32, image::Rgb(px));
            }
        }
        save(&img, &args, "water.png")?;
    }

    // ── 2. terrain.png (hillshade, classified water on top) ──────────────────
    {
        let shade = hillshade(&result.height, result.cell_width);
        let mut img = image::RgbImage::new(w as u32, h as u32);
        for r in 0..h {
            for c in 0..w {
                let idx = r * w + c;
                let px = match result.categories[idx] {
                    WaterClass::None => {
                        let g = (shade[idx] * 255.0) as u8;
                        [g, g, g]
                    }
                    class => class_color(class),
                };
                img.put_pixel(c as u32, r as u32, image::Rgb(px));
            }
        }
        save(&img, &args, "terrain.png")?;
    }

    // ── 3. categories.png ────────────────────────────────────────────────────
    {
        let mut img = image::RgbImage::new(w as u32, h as u32);
        for r in 0..h {
            for c in 0..w {
                let px = class_color(result.categories[r * w + c]);
                img.put_pixel(c as u32, r as u32, image::Rgb(px));
            }
        }
        save(&img, &args, "categories.png")?;
    }

    let counts = WaterClass::histogram(&result.categories);
    for (class, count) in WaterClass::ALL.iter().zip(counts) {
        println!("  {:>6}: {count}", class.name());
    }
    Ok(())
}
