//! # grid_search
//!
//! Shortest-path search on an editable 4-connected grid with a single start and a single goal.
//! Runs either [Dijkstra's algorithm](https://en.wikipedia.org/wiki/Dijkstra%27s_algorithm) or
//! [A*](https://en.wikipedia.org/wiki/A*_search_algorithm) with a Manhattan or Euclidean
//! heuristic. Every move has unit cost.
//!
//! A [Grid] holds cell roles (empty, wall, start, goal) plus the transient search state that a
//! renderer can display. A [SearchEngine] locks the grid for the duration of a run, expands the
//! frontier one cell at a time and reports tag changes over a channel while it goes.
//!
//! ```
//! use grid_search::{Algorithm, Grid, Heuristic, PathResult, SearchEngine};
//!
//! let mut grid = Grid::new(10, 10).unwrap();
//! let result = SearchEngine::new()
//!     .start(&mut grid, Algorithm::AStar, Heuristic::Manhattan)
//!     .unwrap();
//! assert_eq!(result.path().map(|p| p.len()), Some(19));
//! ```
pub mod cell;
pub mod error;
pub mod grid;
pub mod heuristic;
pub mod preset;
pub mod shared;
pub mod solver;

pub use cell::{Cell, CellSnapshot, Role, SearchTag};
pub use error::{GridError, SearchError};
pub use grid::Grid;
pub use grid_util::point::Point;
pub use heuristic::{estimate, Heuristic};
pub use preset::Preset;
pub use shared::SharedGrid;
pub use solver::events::TagChange;
pub use solver::{Algorithm, CancelHandle, PathResult, RunState, SearchEngine, SearchRun};

/// Width of the reference grid.
pub const DEFAULT_WIDTH: usize = 10;
/// Height of the reference grid.
pub const DEFAULT_HEIGHT: usize = 10;
/// Cost of a single orthogonal move.
pub const UNIT_COST: f64 = 1.0;

/// Total cost of following `path`, one [UNIT_COST] per step.
pub fn path_length(path: &[Point]) -> f64 {
    path.len().saturating_sub(1) as f64 * UNIT_COST
}
