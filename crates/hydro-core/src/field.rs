use serde::{Deserialize, Serialize};

use crate::error::{HydroError, Result};

/// A 2D scalar grid in metres, row-major.
/// Row 0 is the northern edge; column 0 is the western edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    /// Row-major cell values.
    pub data: Vec<f32>,
    pub width: usize,
    pub height: usize,
}

/// Terrain elevation in metres.
pub type HeightField = Field;
/// Standing water depth in metres.
pub type WaterField = Field;
/// Suspended sediment, in metres of terrain-equivalent material.
pub type SedimentField = Field;

impl Field {
    /// Create a new field filled with the given value.
    pub fn new(width: usize, height: usize, fill: f32) -> Self {
        Self {
            data: vec![fill; width * height],
            width,
            height,
        }
    }

    /// Create a square `n × n` field filled with zero.
    pub fn square(n: usize) -> Self {
        Self::new(n, n, 0.0)
    }

    /// Wrap an existing row-major buffer, checking its length.
    pub fn from_vec(width: usize, height: usize, data: Vec<f32>) -> Result<Self> {
        if data.len() != width * height {
            return Err(HydroError::ShapeMismatch {
                expected: (width, height),
                found: (data.len(), 1),
            });
        }
        Ok(Self { data, width, height })
    }

    /// Build a field from nested rows (the layout world files use).
    pub fn from_rows(rows: &[Vec<f32>]) -> Result<Self> {
        let height = rows.len();
        let width = rows.first().map_or(0, Vec::len);
        if let Some(bad) = rows.iter().find(|r| r.len() != width) {
            return Err(HydroError::ShapeMismatch {
                expected: (width, height),
                found: (bad.len(), height),
            });
        }
        Self::from_vec(width, height, rows.concat())
    }

    /// Nested-row copy of the data.
    pub fn to_rows(&self) -> Vec<Vec<f32>> {
        self.data.chunks(self.width.max(1)).map(<[f32]>::to_vec).collect()
    }

    /// A zero-filled field with the same shape as `self`.
    pub fn zeros_like(&self) -> Self {
        Self::new(self.width, self.height, 0.0)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    pub fn shape(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    #[inline]
    pub fn index(&self, row: usize, col: usize) -> usize {
        row * self.width + col
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f32 {
        self.data[row * self.width + col]
    }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize, val: f32) {
        self.data[row * self.width + col] = val;
    }

    pub fn min_value(&self) -> f32 {
        self.data.iter().cloned().fold(f32::INFINITY, f32::min)
    }

    pub fn max_value(&self) -> f32 {
        self.data.iter().cloned().fold(f32::NEG_INFINITY, f32::max)
    }

    /// Sum of all cells, accumulated in f64.
    pub fn total(&self) -> f64 {
        self.data.iter().map(|&v| v as f64).sum()
    }

    /// Check the field is a non-empty square grid of finite values.
    /// Returns the side length.
    pub fn validate_square(&self) -> Result<usize> {
        if self.data.is_empty() || self.width == 0 || self.height == 0 {
            return Err(HydroError::EmptyGrid);
        }
        if self.width != self.height {
            return Err(HydroError::NotSquare {
                width: self.width,
                height: self.height,
            });
        }
        if self.data.len() != self.width * self.height {
            return Err(HydroError::ShapeMismatch {
                expected: (self.width, self.height),
                found: (self.data.len(), 1),
            });
        }
        if let Some(index) = self.data.iter().position(|v| !v.is_finite()) {
            return Err(HydroError::NonFinite { index });
        }
        Ok(self.width)
    }

    /// Error unless `other` has the same shape.
    pub fn ensure_same_shape(&self, other: &Field) -> Result<()> {
        if self.shape() != other.shape() || self.len() != other.len() {
            return Err(HydroError::ShapeMismatch {
                expected: self.shape(),
                found: other.shape(),
            });
        }
        Ok(())
    }

    /// Clamp every cell to be non-negative.
    /// Absorbs the tiny negative residue left by float subtraction.
    pub fn clamp_non_negative(&mut self) {
        for v in &mut self.data {
            if *v < 0.0 {
                *v = 0.0;
            }
        }
    }
}
