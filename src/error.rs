//! Error types returned by grid mutation and search.
use grid_util::point::Point;
use thiserror::Error;

/// Errors raised by role-mutating [Grid](crate::Grid) calls.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GridError {
    #[error("invalid preset '{name}': {reason}")]
    InvalidPreset { name: String, reason: String },

    #[error("grid is locked by a running search")]
    GridLocked,

    #[error("{0} lies outside the grid")]
    OutOfBounds(Point),

    #[error("a {width}x{height} grid is too small for a start and goal, or too large to address")]
    InvalidDimensions { width: usize, height: usize },
}

/// Errors raised when starting or stepping a search.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SearchError {
    #[error("grid does not hold exactly one start and one distinct goal")]
    InvalidSearchState,

    #[error("a search is already running")]
    SearchAlreadyRunning,

    /// Parent links from the cell touching the goal did not lead back to the start.
    #[error("parent chain from {from} does not end at the start")]
    BrokenParentChain { from: Point },
}

pub type Result<T, E = GridError> = std::result::Result<T, E>;
