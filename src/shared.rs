use crate::cell::{CellSnapshot, Role};
use crate::error::{GridError, SearchError};
use crate::grid::Grid;
use crate::heuristic::Heuristic;
use crate::preset::Preset;
use crate::solver::{Algorithm, PathResult, SearchEngine};
use grid_util::point::Point;
use log::debug;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

/// A [Grid] shared between an interactive caller and a background search.
///
/// A background run takes the mutex once per expansion, so snapshots can be read between
/// steps. Role mutations in that window see the run-lock and fail with
/// [GridError::GridLocked].
#[derive(Clone, Debug)]
pub struct SharedGrid {
    inner: Arc<Mutex<Grid>>,
}

impl SharedGrid {
    pub fn new(grid: Grid) -> SharedGrid {
        SharedGrid {
            inner: Arc::new(Mutex::new(grid)),
        }
    }

    /// Locks the underlying grid. A panic on another thread does not leave the grid unusable.
    pub fn lock(&self) -> MutexGuard<'_, Grid> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_cell_role(&self, point: Point, role: Role) -> Result<(), GridError> {
        self.lock().set_cell_role(point, role)
    }

    pub fn apply_preset(&self, preset: &Preset) -> Result<(), GridError> {
        self.lock().apply_preset(preset)
    }

    pub fn reset_search_state(&self) {
        self.lock().reset_search_state()
    }

    pub fn cell_snapshot(&self, point: Point) -> Option<CellSnapshot> {
        self.lock().cell_snapshot(point)
    }

    pub fn is_locked(&self) -> bool {
        self.lock().is_locked()
    }

    /// Starts a search on a background thread. Precondition failures are reported before the
    /// thread is spawned; on success the grid is already locked when this returns.
    pub fn spawn_search(
        &self,
        engine: &SearchEngine,
        algorithm: Algorithm,
        heuristic: Heuristic,
    ) -> Result<JoinHandle<Result<PathResult, SearchError>>, SearchError> {
        let mut run = engine.begin(&mut self.lock(), algorithm, heuristic)?;
        let shared = self.clone();
        Ok(thread::spawn(move || -> Result<PathResult, SearchError> {
            loop {
                let step = run.step(&mut shared.lock())?;
                if let Some(result) = step {
                    debug!(
                        "Background search finished after {} expansions",
                        run.expanded()
                    );
                    return Ok(result);
                }
                thread::yield_now();
            }
        }))
    }
}

impl From<Grid> for SharedGrid {
    fn from(grid: Grid) -> SharedGrid {
        SharedGrid::new(grid)
    }
}
