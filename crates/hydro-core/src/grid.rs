//! Neighbour topology: the eight pipe directions and how lookups behave at
//! the grid edge.
//!
//! ```text
//!   NW(-1,-1)  N(-1, 0)  NE(-1,+1)
//!   W ( 0,-1)  *         E ( 0,+1)
//!   SW(+1,-1)  S(+1, 0)  SE(+1,+1)
//! ```
use serde::{Deserialize, Serialize};

/// How neighbour lookups treat cells beyond the grid edge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeMode {
    /// Periodic: the last row/column neighbours the first.
    Wrap,
    /// Closed: nothing crosses the edge; samples clamp to the border cell.
    #[default]
    Wall,
    /// Open outlet: off-grid neighbours are bare ground at the cell's own
    /// terrain height, and anything crossing the edge leaves the system.
    Sink,
}

impl EdgeMode {
    /// Resolve a possibly out-of-range coordinate along an axis of length `len`.
    /// `None` means the coordinate is off-grid.
    #[inline]
    pub fn resolve(self, i: isize, len: usize) -> Option<usize> {
        let n = len as isize;
        match self {
            EdgeMode::Wrap => Some(i.rem_euclid(n) as usize),
            EdgeMode::Wall | EdgeMode::Sink => {
                if (0..n).contains(&i) {
                    Some(i as usize)
                } else {
                    None
                }
            }
        }
    }

    /// Resolve a coordinate for interpolation. Closed and open edges both clamp
    /// to the border cell; only `Wrap` wraps.
    #[inline]
    pub fn resolve_clamped(self, i: isize, len: usize) -> usize {
        match self {
            EdgeMode::Wrap => i.rem_euclid(len as isize) as usize,
            EdgeMode::Wall | EdgeMode::Sink => i.clamp(0, len as isize - 1) as usize,
        }
    }

    /// Flat index of the neighbour of `(row, col)` at offset `(dr, dc)` on a
    /// `width × height` grid.
    #[inline]
    pub fn neighbour(
        self,
        row: usize,
        col: usize,
        (dr, dc): (isize, isize),
        width: usize,
        height: usize,
    ) -> Option<usize> {
        let r = self.resolve(row as isize + dr, height)?;
        let c = self.resolve(col as isize + dc, width)?;
        Some(r * width + c)
    }
}

/// One of the eight pipes leaving a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    North,
    NorthEast,
    East,
    SouthEast,
    South,
    SouthWest,
    West,
    NorthWest,
}

impl Direction {
    pub const ALL: [Direction; 8] = [
        Direction::North,
        Direction::NorthEast,
        Direction::East,
        Direction::SouthEast,
        Direction::South,
        Direction::SouthWest,
        Direction::West,
        Direction::NorthWest,
    ];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// `(d_row, d_col)` toward the neighbour.
    #[inline]
    pub fn offset(self) -> (isize, isize) {
        match self {
            Direction::North => (-1, 0),
            Direction::NorthEast => (-1, 1),
            Direction::East => (0, 1),
            Direction::SouthEast => (1, 1),
            Direction::South => (1, 0),
            Direction::SouthWest => (1, -1),
            Direction::West => (0, -1),
            Direction::NorthWest => (-1, -1),
        }
    }

    #[inline]
    pub fn opposite(self) -> Direction {
        Direction::ALL[(self.index() + 4) % 8]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opposite_offsets_cancel() {
        for d in Direction::ALL {
            let (a, b) = d.offset();
            let (c, e) = d.opposite().offset();
            assert_eq!((a + c, b + e), (0, 0), "{d:?}");
            assert_eq!(d.opposite().opposite(), d);
        }
    }

    #[test]
    fn wrap_links_opposite_edges() {
        // Cell 0's northern neighbour is in the last row.
        let n = EdgeMode::Wrap.neighbour(0, 0, Direction::North.offset(), 4, 4);
        assert_eq!(n, Some(12));
        let nw = EdgeMode::Wrap.neighbour(0, 0, Direction::NorthWest.offset(), 4, 4);
        assert_eq!(nw, Some(15));
    }

    #[test]
    fn closed_edges_have_no_off_grid_neighbour() {
        for mode in [EdgeMode::Wall, EdgeMode::Sink] {
            assert_eq!(mode.neighbour(0, 0, Direction::North.offset(), 4, 4), None);
            assert_eq!(mode.neighbour(0, 0, Direction::SouthEast.offset(), 4, 4), Some(5));
        }
    }

    #[test]
    fn clamped_resolution_stays_in_range() {
        assert_eq!(EdgeMode::Wall.resolve_clamped(-3, 5), 0);
        assert_eq!(EdgeMode::Sink.resolve_clamped(9, 5), 4);
        assert_eq!(EdgeMode::Wrap.resolve_clamped(-1, 5), 4);
    }
}
