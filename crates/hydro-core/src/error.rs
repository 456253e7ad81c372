//! Error type shared by every fallible entry point in the crate.

use thiserror::Error;

/// Errors reported before or during a hydrology run.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HydroError {
    #[error("height field is empty")]
    EmptyGrid,
    #[error("grid must be square, got {width}x{height}")]
    NotSquare { width: usize, height: usize },
    #[error("field shape mismatch: expected {expected:?}, found {found:?}")]
    ShapeMismatch {
        expected: (usize, usize),
        found: (usize, usize),
    },
    #[error("non-finite value at cell {index}")]
    NonFinite { index: usize },
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },
    #[error("simulation has not been started")]
    NotStarted,
    #[error("simulation already complete")]
    AlreadyComplete,
    #[error("simulation cancelled after {completed} iterations")]
    Cancelled { completed: u32 },
    #[error("malformed parameter file: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, HydroError>;
