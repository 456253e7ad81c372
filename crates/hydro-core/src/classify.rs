//! Water-depth categories handed to biome and room placement.
use serde::{Deserialize, Serialize};

use crate::field::WaterField;

/// Minimum depth (m) for a stream.
pub const STREAM_DEPTH: f32 = 0.3;
/// Minimum depth (m) for a river.
pub const RIVER_DEPTH: f32 = 1.0;
/// Minimum depth (m) for a lake.
pub const LAKE_DEPTH: f32 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WaterClass {
    None,
    Stream,
    River,
    Lake,
}

impl WaterClass {
    pub const ALL: [WaterClass; 4] = [
        WaterClass::None,
        WaterClass::Stream,
        WaterClass::River,
        WaterClass::Lake,
    ];

    pub fn name(self) -> &'static str {
        match self {
            WaterClass::None => "none",
            WaterClass::Stream => "stream",
            WaterClass::River => "river",
            WaterClass::Lake => "lake",
        }
    }

    /// Cell counts in `ALL` order.
    pub fn histogram(classes: &[WaterClass]) -> [usize; 4] {
        let mut counts = [0usize; 4];
        for &c in classes {
            counts[c as usize] += 1;
        }
        counts
    }
}

/// Category for a single final water depth.
pub fn classify_depth(depth: f32) -> WaterClass {
    if depth >= LAKE_DEPTH {
        WaterClass::Lake
    } else if depth >= RIVER_DEPTH {
        WaterClass::River
    } else if depth >= STREAM_DEPTH {
        WaterClass::Stream
    } else {
        WaterClass::None
    }
}

/// Row-major categories for every cell of `water`.
pub fn classify_field(water: &WaterField) -> Vec<WaterClass> {
    water.data.iter().map(|&w| classify_depth(w)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::Field;

    #[test]
    fn thresholds_match_table() {
        let depths = [0.0, 0.29, 0.3, 0.99, 1.0, 1.99, 2.0, 5.0];
        let expected = [
            WaterClass::None,
            WaterClass::None,
            WaterClass::Stream,
            WaterClass::Stream,
            WaterClass::River,
            WaterClass::River,
            WaterClass::Lake,
            WaterClass::Lake,
        ];
        for (d, e) in depths.iter().zip(expected) {
            assert_eq!(classify_depth(*d), e, "depth {d}");
        }
    }

    #[test]
    fn field_classification_and_histogram() {
        let w = Field::from_vec(2, 2, vec![0.0, 0.5, 1.5, 3.0]).unwrap();
        let classes = classify_field(&w);
        assert_eq!(WaterClass::histogram(&classes), [1, 1, 1, 1]);
        assert_eq!(classes[3].name(), "lake");
        assert_eq!(serde_json::to_string(&classes[1]).unwrap(), "\"stream\"");
    }
}
