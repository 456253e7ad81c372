//! Water-depth PNG frames written while a run is in progress, and the
//! optional `animation.gif` built from them.

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use hydro_core::classify::LAKE_DEPTH;
use hydro_core::{SnapshotSink, WaterField};
use image::codecs::gif::{GifEncoder, Repeat};
use image::{Delay, DynamicImage, Frame};
use log::warn;

/// Depth (m) rendered as the darkest blue.
const FULL_SCALE_DEPTH: f32 = 2.0 * LAKE_DEPTH;

/// Depth → blue ramp: dry = white, `FULL_SCALE_DEPTH` and deeper = navy.
pub fn depth_to_rgb(depth: f32) -> [u8; 3] {
    let t = (depth / FULL_SCALE_DEPTH).clamp(0.0, 1.0);
    let lo = (255.0 * (1.0 - t)) as u8;
    let b = (255.0 - 127.0 * t) as u8;
    [lo, lo, b]
}

pub fn render_depth(water: &WaterField) -> image::RgbImage {
    let mut img = image::RgbImage::new(water.width as u32, water.height as u32);
    for r in 0..water.height {
        for c in 0..water.width {
            img.put_pixel(c as u32, r as u32, image::Rgb(depth_to_rgb(water.get(r, c))));
        }
    }
    img
}

/// Milliseconds each frame is shown in `animation.gif`.
const GIF_FRAME_MS: u32 = 100;

/// Writes `water_NNNNN.png` for every `every`-th iteration, optionally
/// keeping the frames for an animated GIF.
pub struct PngSnapshots {
    dir: PathBuf,
    every: u32,
    animation: Option<Vec<image::RgbImage>>,
}

impl PngSnapshots {
    pub fn new(dir: &Path, every: u32, gif: bool) -> Result<Self> {
        fs::create_dir_all(dir)
            .with_context(|| format!("cannot create snapshot directory {}", dir.display()))?;
        Ok(Self {
            dir: dir.to_path_buf(),
            every: every.max(1),
            animation: gif.then(Vec::new),
        })
    }

    /// Encode the kept frames as `animation.gif`. Returns the path written, or
    /// `None` when GIF output was not requested or nothing was recorded.
    pub fn write_gif(self) -> Result<Option<PathBuf>> {
        let Some(frames) = self.animation.filter(|f| !f.is_empty()) else {
            return Ok(None);
        };
        let path = self.dir.join("animation.gif");
        let file = File::create(&path)
            .with_context(|| format!("cannot create {}", path.display()))?;
        let mut encoder = GifEncoder::new(BufWriter::new(file));
        encoder.set_repeat(Repeat::Infinite)?;
        let delay = Delay::from_numer_denom_ms(GIF_FRAME_MS, 1);
        encoder
            .encode_frames(frames.into_iter().map(|img| {
                Frame::from_parts(DynamicImage::ImageRgb8(img).into_rgba8(), 0, 0, delay)
            }))
            .with_context(|| format!("cannot encode {}", path.display()))?;
        Ok(Some(path))
    }
}

impl SnapshotSink for PngSnapshots {
    fn record(&mut self, iteration: u32, water: &WaterField) {
        if iteration % self.every != 0 {
            return;
        }
        let path = self.dir.join(format!("water_{iteration:05}.png"));
        let img = render_depth(water);
        if let Err(e) = img.save(&path) {
            warn!("cannot write snapshot {}: {e}", path.display());
        }
        if let Some(frames) = &mut self.animation {
            frames.push(img);
        }
    }
}
