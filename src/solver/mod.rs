//! Unified Dijkstra / A* search over a [Grid].
//!
//! A run is a small state machine, `Idle -> Running -> {Succeeded, Exhausted}`, driven by
//! [SearchRun::step]. [SearchEngine::start] simply steps a run to completion.
use crate::cell::{Cell, Role, SearchTag};
use crate::error::SearchError;
use crate::grid::Grid;
use crate::heuristic::Heuristic;
use crate::UNIT_COST;
use crossbeam_channel::Sender;
use grid_util::point::Point;
use log::{info, trace, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

pub mod events;
mod frontier;
pub mod path;

use events::{Notifier, TagChange};
use frontier::Frontier;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum Algorithm {
    #[default]
    Dijkstra,
    AStar,
}

impl Algorithm {
    /// Frontier ordering key: cost so far, plus the estimate to the goal for A*.
    pub fn priority(self, cell: &Cell) -> f64 {
        match self {
            Algorithm::Dijkstra => cell.cost_from_start,
            Algorithm::AStar => cell.cost_from_start + cell.cost_to_goal,
        }
    }
}

/// Outcome of a completed run. [PathResult::NotFound] is a normal result, not an error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PathResult {
    /// Coordinates from start to goal, both included.
    Found(Vec<Point>),
    NotFound,
    /// The run observed its [CancelHandle] before reaching a result.
    Cancelled,
}

impl PathResult {
    pub fn path(&self) -> Option<&[Point]> {
        match self {
            PathResult::Found(path) => Some(path),
            _ => None,
        }
    }
    pub fn is_found(&self) -> bool {
        matches!(self, PathResult::Found(_))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum RunState {
    #[default]
    Idle,
    Running,
    Succeeded,
    Exhausted,
    Cancelled,
}

/// Cooperative cancellation flag, checked before every frontier selection.
#[derive(Clone, Debug, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
    fn clear(&self) {
        self.0.store(false, Ordering::Relaxed);
    }
}

#[derive(Clone, Copy, Debug, Default)]
struct EngineStatus {
    state: RunState,
    expanded: usize,
    /// Bumped by every `begin` and `reset`; a run whose generation no longer matches is stale.
    generation: u64,
}

/// Starts search runs and tracks whether one is in flight. Clones share the same run state,
/// so a clone can be handed to a background thread.
#[derive(Clone, Debug, Default)]
pub struct SearchEngine {
    status: Arc<Mutex<EngineStatus>>,
    events: Option<Sender<TagChange>>,
    cancel: CancelHandle,
}

impl SearchEngine {
    pub fn new() -> SearchEngine {
        SearchEngine::default()
    }

    /// Sends a [TagChange] to `sender` whenever a cell's search tag changes.
    pub fn with_events(mut self, sender: Sender<TagChange>) -> SearchEngine {
        self.events = Some(sender);
        self
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    fn status(&self) -> std::sync::MutexGuard<'_, EngineStatus> {
        self.status.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn state(&self) -> RunState {
        self.status().state
    }

    /// Number of cells expanded by the current or most recent run.
    pub fn expanded(&self) -> usize {
        self.status().expanded
    }

    /// Runs a search to completion and returns its result.
    pub fn start(
        &self,
        grid: &mut Grid,
        algorithm: Algorithm,
        heuristic: Heuristic,
    ) -> Result<PathResult, SearchError> {
        let mut run = self.begin(grid, algorithm, heuristic)?;
        loop {
            if let Some(result) = run.step(grid)? {
                return Ok(result);
            }
        }
    }

    /// Prepares a run without expanding anything. The grid stays locked until the returned
    /// [SearchRun] finishes or [reset](Self::reset) is called.
    ///
    /// Fails without touching the grid's search state if a run is already in flight or the
    /// grid does not hold exactly one start and one distinct goal.
    pub fn begin(
        &self,
        grid: &mut Grid,
        algorithm: Algorithm,
        heuristic: Heuristic,
    ) -> Result<SearchRun, SearchError> {
        let mut status = self.status();
        if status.state == RunState::Running || grid.is_locked() {
            warn!("Search requested while another run owns the grid");
            return Err(SearchError::SearchAlreadyRunning);
        }
        if !grid.has_valid_endpoints() {
            return Err(SearchError::InvalidSearchState);
        }
        status.state = RunState::Running;
        status.expanded = 0;
        status.generation += 1;
        let generation = status.generation;
        drop(status);
        self.cancel.clear();

        let start = grid.start();
        let goal = grid.goal();
        info!(
            "Starting {:?} search from {} to {} ({:?})",
            algorithm, start, goal, heuristic
        );
        let token = Arc::new(());
        grid.lock(&token);
        grid.reset_search_state();
        if algorithm == Algorithm::AStar {
            for y in 0..grid.height() as i32 {
                for x in 0..grid.width() as i32 {
                    let p = Point::new(x, y);
                    grid.cell_mut(p).cost_to_goal = heuristic.estimate(&p, &goal);
                }
            }
        }

        let mut run = SearchRun {
            status: self.status.clone(),
            generation,
            token,
            notifier: Notifier::new(self.events.clone()),
            cancel: self.cancel.clone(),
            algorithm,
            start,
            goal,
            frontier: Frontier::new(),
            expanded: 0,
            result: None,
        };
        run.frontier.push(start);
        grid.cell_mut(start).tag = SearchTag::Frontier;
        run.notifier.notify(grid, start);
        Ok(run)
    }

    /// Abandons any run in flight, releases the grid and clears its search state. An abandoned
    /// [SearchRun] stops with [PathResult::Cancelled] on its next step without touching the grid.
    pub fn reset(&self, grid: &mut Grid) {
        {
            let mut status = self.status();
            status.state = RunState::Idle;
            status.expanded = 0;
            status.generation += 1;
        }
        grid.release();
        clear_search_state(grid, &mut Notifier::new(self.events.clone()));
    }
}

/// Clears the search state and reports every cell whose tag changed.
fn clear_search_state(grid: &mut Grid, notifier: &mut Notifier) {
    let touched = grid
        .snapshots()
        .filter(|(_, s)| s.tag != SearchTag::Unvisited)
        .map(|(p, _)| p)
        .collect::<Vec<_>>();
    grid.reset_search_state();
    for point in touched {
        notifier.notify(grid, point);
    }
}

/// A single run over a grid, advanced one expansion at a time.
#[derive(Debug)]
pub struct SearchRun {
    status: Arc<Mutex<EngineStatus>>,
    generation: u64,
    /// Keeps the grid's run-lock alive; dropping the run releases it.
    token: Arc<()>,
    notifier: Notifier,
    cancel: CancelHandle,
    algorithm: Algorithm,
    start: Point,
    goal: Point,
    frontier: Frontier,
    expanded: usize,
    result: Option<PathResult>,
}

impl SearchRun {
    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// Cells expanded so far.
    pub fn expanded(&self) -> usize {
        self.expanded
    }

    pub fn frontier_len(&self) -> usize {
        self.frontier.len()
    }

    pub fn result(&self) -> Option<&PathResult> {
        self.result.as_ref()
    }

    fn is_current(&self) -> bool {
        self.status
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .generation
            == self.generation
    }

    /// Selects and expands one frontier cell. Returns the result once the run has finished;
    /// further calls keep returning it without touching the grid.
    ///
    /// The run stops as soon as the goal shows up as a neighbour of the expanded cell, rather
    /// than when the goal itself is selected.
    pub fn step(&mut self, grid: &mut Grid) -> Result<Option<PathResult>, SearchError> {
        if let Some(result) = &self.result {
            return Ok(Some(result.clone()));
        }
        if !self.is_current() {
            warn!("Search superseded by a reset after {} expansions", self.expanded);
            self.result = Some(PathResult::Cancelled);
            return Ok(self.result.clone());
        }
        if self.cancel.is_cancelled() {
            info!("Search cancelled after {} expansions", self.expanded);
            clear_search_state(grid, &mut self.notifier);
            return Ok(Some(self.finish(grid, PathResult::Cancelled, RunState::Cancelled)));
        }
        let algorithm = self.algorithm;
        let view: &Grid = grid;
        let next = self
            .frontier
            .pop_min(|p| algorithm.priority(&view[*p]));
        let Some(current) = next else {
            info!(
                "No path from {} to {} after {} expansions",
                self.start, self.goal, self.expanded
            );
            return Ok(Some(self.finish(grid, PathResult::NotFound, RunState::Exhausted)));
        };

        grid.cell_mut(current).tag = SearchTag::Visited;
        self.notifier.notify(grid, current);
        self.expanded += 1;
        self.status
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .expanded = self.expanded;
        let current_cost = grid[current].cost_from_start;
        trace!("Expanding {} at cost {}", current, current_cost);

        for neighbour in grid.neighbors_of(current) {
            let candidate = current_cost + UNIT_COST;
            let cell = grid.cell_mut(neighbour);
            match cell.role {
                Role::Wall => continue,
                Role::Goal => {
                    if candidate < cell.cost_from_start {
                        cell.cost_from_start = candidate;
                        cell.parent = Some(current);
                    }
                    return match path::reconstruct(grid, current, self.start, self.goal) {
                        Ok(path) => {
                            info!(
                                "Found path of {} cells after {} expansions",
                                path.len(),
                                self.expanded
                            );
                            Ok(Some(self.finish(
                                grid,
                                PathResult::Found(path),
                                RunState::Succeeded,
                            )))
                        }
                        Err(e) => {
                            self.finish(grid, PathResult::NotFound, RunState::Idle);
                            Err(e)
                        }
                    };
                }
                Role::Empty | Role::Start => {
                    if candidate < cell.cost_from_start && cell.tag != SearchTag::Visited {
                        cell.cost_from_start = candidate;
                        cell.parent = Some(current);
                        cell.tag = SearchTag::Frontier;
                        self.frontier.push(neighbour);
                        self.notifier.notify(grid, neighbour);
                    }
                }
            }
        }
        Ok(None)
    }

    fn finish(&mut self, grid: &mut Grid, result: PathResult, state: RunState) -> PathResult {
        grid.unlock(&self.token);
        let mut status = self.status.lock().unwrap_or_else(PoisonError::into_inner);
        if status.generation == self.generation {
            status.state = state;
        }
        self.result = Some(result.clone());
        result
    }
}

impl Drop for SearchRun {
    /// An unfinished run that is dropped hands the engine back; the grid lock lapses with
    /// `token`.
    fn drop(&mut self) {
        if self.result.is_some() {
            return;
        }
        let mut status = self.status.lock().unwrap_or_else(PoisonError::into_inner);
        if status.generation == self.generation && status.state == RunState::Running {
            status.state = RunState::Idle;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Asserts that the optimal path around a single wall is found.
    #[test]
    fn solve_simple_problem() {
        // |S  |
        // | # |
        // |  G|
        let mut grid = Grid::new(3, 3).unwrap();
        grid.set_cell_role(Point::new(1, 1), Role::Wall).unwrap();
        let engine = SearchEngine::new();
        for algorithm in [Algorithm::Dijkstra, Algorithm::AStar] {
            let result = engine
                .start(&mut grid, algorithm, Heuristic::Manhattan)
                .unwrap();
            assert_eq!(result.path().map(|p| p.len()), Some(5));
            assert_eq!(engine.state(), RunState::Succeeded);
            assert!(!grid.is_locked());
        }
    }

    /// West is tried before north-south, so ties resolve along the top row first.
    #[test]
    fn dijkstra_tie_breaking() {
        let mut grid = Grid::new(3, 3).unwrap();
        let result = SearchEngine::new()
            .start(&mut grid, Algorithm::Dijkstra, Heuristic::Manhattan)
            .unwrap();
        assert_eq!(
            result,
            PathResult::Found(vec![
                Point::new(0, 0),
                Point::new(1, 0),
                Point::new(2, 0),
                Point::new(2, 1),
                Point::new(2, 2),
            ])
        );
    }

    #[test]
    fn adjacent_goal() {
        let mut grid = Grid::new(2, 1).unwrap();
        let engine = SearchEngine::new();
        let result = engine
            .start(&mut grid, Algorithm::AStar, Heuristic::Euclidean)
            .unwrap();
        assert_eq!(
            result,
            PathResult::Found(vec![Point::new(0, 0), Point::new(1, 0)])
        );
        assert_eq!(engine.expanded(), 1);
        assert_eq!(grid[Point::new(1, 0)].cost_from_start, 1.0);
    }

    #[test]
    fn blocked_goal() {
        // |S#G|
        let mut grid = Grid::new(3, 1).unwrap();
        grid.set_cell_role(Point::new(1, 0), Role::Wall).unwrap();
        let engine = SearchEngine::new();
        let result = engine
            .start(&mut grid, Algorithm::Dijkstra, Heuristic::Manhattan)
            .unwrap();
        assert_eq!(result, PathResult::NotFound);
        assert_eq!(engine.state(), RunState::Exhausted);
        assert_eq!(engine.expanded(), 1);
    }

    #[test]
    fn second_begin_is_rejected() {
        let mut grid = Grid::new(5, 5).unwrap();
        let engine = SearchEngine::new();
        let mut run = engine
            .begin(&mut grid, Algorithm::Dijkstra, Heuristic::Manhattan)
            .unwrap();
        assert_eq!(run.step(&mut grid), Ok(None));
        let before = grid.clone();
        assert_eq!(
            engine.start(&mut grid, Algorithm::AStar, Heuristic::Manhattan),
            Err(SearchError::SearchAlreadyRunning)
        );
        assert_eq!(grid.to_string(), before.to_string());
        assert_eq!(grid[Point::new(1, 0)], before[Point::new(1, 0)]);
        assert_eq!(engine.state(), RunState::Running);
        // The first run carries on undisturbed.
        let result = loop {
            if let Some(result) = run.step(&mut grid).unwrap() {
                break result;
            }
        };
        assert_eq!(result.path().map(|p| p.len()), Some(9));
        assert_eq!(run.step(&mut grid), Ok(Some(result)));
    }

    #[test]
    fn running_grid_is_locked() {
        let mut grid = Grid::new(4, 4).unwrap();
        let engine = SearchEngine::new();
        let mut run = engine
            .begin(&mut grid, Algorithm::Dijkstra, Heuristic::Manhattan)
            .unwrap();
        assert!(grid.is_locked());
        assert_eq!(
            grid.set_cell_role(Point::new(2, 2), Role::Wall),
            Err(crate::GridError::GridLocked)
        );
        run.step(&mut grid).unwrap();
        engine.reset(&mut grid);
        assert_eq!(engine.state(), RunState::Idle);
        assert!(grid.set_cell_role(Point::new(2, 2), Role::Wall).is_ok());
        assert!(grid.snapshots().all(|(_, s)| s.tag == SearchTag::Unvisited));
    }

    #[test]
    fn cancelled_run_releases_grid() {
        let mut grid = Grid::new(6, 6).unwrap();
        let engine = SearchEngine::new();
        let mut run = engine
            .begin(&mut grid, Algorithm::AStar, Heuristic::Manhattan)
            .unwrap();
        run.step(&mut grid).unwrap();
        engine.cancel_handle().cancel();
        assert_eq!(run.step(&mut grid), Ok(Some(PathResult::Cancelled)));
        assert_eq!(engine.state(), RunState::Cancelled);
        assert!(!grid.is_locked());
        assert!(grid.snapshots().all(|(_, s)| s.tag == SearchTag::Unvisited));
        // A fresh run clears the flag.
        let result = engine
            .start(&mut grid, Algorithm::AStar, Heuristic::Manhattan)
            .unwrap();
        assert!(result.is_found());
    }

    #[test]
    fn reset_run_is_stale() {
        let mut grid = Grid::new(5, 5).unwrap();
        let engine = SearchEngine::new();
        let mut old = engine
            .begin(&mut grid, Algorithm::Dijkstra, Heuristic::Manhattan)
            .unwrap();
        old.step(&mut grid).unwrap();
        engine.reset(&mut grid);
        let mut new = engine
            .begin(&mut grid, Algorithm::AStar, Heuristic::Manhattan)
            .unwrap();
        assert_eq!(new.step(&mut grid), Ok(None));

        let before = grid.to_string();
        assert_eq!(old.step(&mut grid), Ok(Some(PathResult::Cancelled)));
        assert_eq!(grid.to_string(), before);
        assert_eq!(engine.state(), RunState::Running);
        assert!(grid.is_locked());
        assert_eq!(
            grid.set_cell_role(Point::new(2, 2), Role::Wall),
            Err(crate::GridError::GridLocked)
        );
        assert_eq!(
            engine
                .begin(&mut grid, Algorithm::Dijkstra, Heuristic::Manhattan)
                .err(),
            Some(SearchError::SearchAlreadyRunning)
        );
        drop(old);
        assert_eq!(engine.state(), RunState::Running);

        let result = loop {
            if let Some(result) = new.step(&mut grid).unwrap() {
                break result;
            }
        };
        assert_eq!(result.path().map(|p| p.len()), Some(9));
        assert_eq!(engine.state(), RunState::Succeeded);
        assert!(!grid.is_locked());
    }

    #[test]
    fn dropped_run_releases_engine() {
        let mut grid = Grid::new(5, 5).unwrap();
        let engine = SearchEngine::new();
        let mut run = engine
            .begin(&mut grid, Algorithm::Dijkstra, Heuristic::Manhattan)
            .unwrap();
        run.step(&mut grid).unwrap();
        drop(run);
        assert_eq!(engine.state(), RunState::Idle);
        assert!(!grid.is_locked());
        assert!(grid.set_cell_role(Point::new(2, 2), Role::Wall).is_ok());
        let result = engine
            .start(&mut grid, Algorithm::AStar, Heuristic::Manhattan)
            .unwrap();
        assert!(result.is_found());
    }

    #[test]
    fn stepping_exposes_progress() {
        let mut grid = Grid::new(3, 3).unwrap();
        let mut run = SearchEngine::new()
            .begin(&mut grid, Algorithm::AStar, Heuristic::Euclidean)
            .unwrap();
        assert_eq!(run.algorithm(), Algorithm::AStar);
        assert_eq!(run.frontier_len(), 1);
        assert_eq!(run.expanded(), 0);
        assert_eq!(run.result(), None);

        assert_eq!(run.step(&mut grid), Ok(None));
        assert_eq!(run.frontier_len(), 2);
        assert_eq!(run.expanded(), 1);
        assert_eq!(run.result(), None);

        let result = loop {
            if let Some(result) = run.step(&mut grid).unwrap() {
                break result;
            }
        };
        assert!(result.is_found());
        assert_eq!(run.result(), Some(&result));
    }

    /// Replays tag changes onto a plain map and checks it ends up matching the grid.
    fn replay(grid: &Grid, changes: impl Iterator<Item = TagChange>) {
        let mut tags = std::collections::HashMap::new();
        for change in changes {
            tags.insert(change.point, change.tag);
        }
        for (point, snapshot) in grid.snapshots() {
            let seen = tags.get(&point).copied().unwrap_or(SearchTag::Unvisited);
            assert_eq!(seen, snapshot.tag, "mismatch at {}", point);
        }
    }

    #[test]
    fn cancel_and_reset_report_cleared_tags() {
        let (tx, rx) = events::channel();
        let mut grid = Grid::new(6, 6).unwrap();
        let engine = SearchEngine::new().with_events(tx);

        let mut run = engine
            .begin(&mut grid, Algorithm::Dijkstra, Heuristic::Manhattan)
            .unwrap();
        run.step(&mut grid).unwrap();
        run.step(&mut grid).unwrap();
        engine.cancel_handle().cancel();
        assert_eq!(run.step(&mut grid), Ok(Some(PathResult::Cancelled)));
        replay(&grid, rx.try_iter());

        let mut run = engine
            .begin(&mut grid, Algorithm::AStar, Heuristic::Manhattan)
            .unwrap();
        run.step(&mut grid).unwrap();
        run.step(&mut grid).unwrap();
        engine.reset(&mut grid);
        assert!(grid.snapshots().all(|(_, s)| s.tag == SearchTag::Unvisited));
        replay(&grid, rx.try_iter());
    }

    #[test]
    fn invalid_state_leaves_search_state_alone() {
        let mut grid = Grid::new(3, 3).unwrap();
        SearchEngine::new()
            .start(&mut grid, Algorithm::Dijkstra, Heuristic::Manhattan)
            .unwrap();
        let before = grid.to_string();
        let start = grid.start();
        grid.cell_mut(start).role = Role::Empty;
        assert_eq!(
            SearchEngine::new().start(&mut grid, Algorithm::Dijkstra, Heuristic::Manhattan),
            Err(SearchError::InvalidSearchState)
        );
        grid.cell_mut(start).role = Role::Start;
        assert_eq!(grid.to_string(), before);
    }

    #[test]
    fn astar_costs_to_goal() {
        let mut grid = Grid::new(4, 4).unwrap();
        SearchEngine::new()
            .start(&mut grid, Algorithm::AStar, Heuristic::Manhattan)
            .unwrap();
        assert_eq!(grid[Point::new(0, 0)].cost_to_goal, 6.0);
        assert_eq!(grid[grid.goal()].cost_to_goal, 0.0);
    }

    #[test]
    fn tag_changes_are_reported_in_order() {
        let (tx, rx) = events::channel();
        let mut grid = Grid::new(2, 2).unwrap();
        let engine = SearchEngine::new().with_events(tx);
        engine
            .start(&mut grid, Algorithm::Dijkstra, Heuristic::Manhattan)
            .unwrap();
        let changes = rx.try_iter().collect::<Vec<_>>();
        assert_eq!(
            changes[..2],
            [
                TagChange {
                    point: Point::new(0, 0),
                    role: Role::Start,
                    tag: SearchTag::Frontier
                },
                TagChange {
                    point: Point::new(0, 0),
                    role: Role::Start,
                    tag: SearchTag::Visited
                },
            ]
        );
        assert_eq!(
            changes[2],
            TagChange {
                point: Point::new(1, 0),
                role: Role::Empty,
                tag: SearchTag::Frontier
            }
        );
    }

    #[test]
    fn dropped_receiver_does_not_stop_search() {
        let (tx, rx) = events::channel();
        drop(rx);
        let mut grid = Grid::new(5, 5).unwrap();
        let result = SearchEngine::new()
            .with_events(tx)
            .start(&mut grid, Algorithm::Dijkstra, Heuristic::Manhattan)
            .unwrap();
        assert!(result.is_found());
    }
}
