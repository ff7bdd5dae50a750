use crate::cell::{Cell, CellSnapshot, Role};
use crate::error::{GridError, Result};
use crate::preset::Preset;
use core::fmt;
use core::ops::Index;
use grid_util::point::Point;
use log::{debug, warn};
use petgraph::unionfind::UnionFind;
use smallvec::SmallVec;
use std::sync::{Arc, Weak};

/// [Grid] owns a fixed-size array of [Cell]s together with the tracked start and goal
/// coordinates. Exactly one cell has [Role::Start] and exactly one has [Role::Goal] at all times.
///
/// Connected components of walkable cells are maintained in a [UnionFind] structure that is
/// joined incrementally when cells open up and regenerated lazily when walls are added.
/// While a search run owns the grid it is locked and role mutations fail with
/// [GridError::GridLocked]. The lock refers to the run weakly, so it lapses once the run is
/// dropped.
#[derive(Clone, Debug)]
pub struct Grid {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
    start: Point,
    goal: Point,
    components: UnionFind<usize>,
    components_dirty: bool,
    run_lock: Option<Weak<()>>,
}

impl Default for Grid {
    fn default() -> Grid {
        // The default dimensions always hold a start and a goal.
        Grid::build(crate::DEFAULT_WIDTH, crate::DEFAULT_HEIGHT)
    }
}

impl Grid {
    /// Creates an empty grid with the start in the top-left and the goal in the bottom-right
    /// corner.
    pub fn new(width: usize, height: usize) -> Result<Grid> {
        // Coordinates are i32, so each side must fit one.
        let fits = i32::try_from(width).is_ok() && i32::try_from(height).is_ok();
        match width.checked_mul(height) {
            Some(cells) if fits && cells >= 2 => Ok(Grid::build(width, height)),
            _ => Err(GridError::InvalidDimensions { width, height }),
        }
    }

    fn build(width: usize, height: usize) -> Grid {
        let start = Point::new(0, 0);
        let goal = Point::new(width as i32 - 1, height as i32 - 1);
        let mut grid = Grid {
            width,
            height,
            cells: vec![Cell::default(); width * height],
            start,
            goal,
            components: UnionFind::new(width * height),
            components_dirty: false,
            run_lock: None,
        };
        grid.cell_mut(start).role = Role::Start;
        grid.cell_mut(goal).role = Role::Goal;
        grid.reset_search_state();
        grid.generate_components();
        grid
    }

    /// Creates a grid and applies `preset` to it.
    pub fn from_preset(width: usize, height: usize, preset: &Preset) -> Result<Grid> {
        let mut grid = Grid::new(width, height)?;
        grid.apply_preset(preset)?;
        Ok(grid)
    }

    pub fn width(&self) -> usize {
        self.width
    }
    pub fn height(&self) -> usize {
        self.height
    }
    pub fn start(&self) -> Point {
        self.start
    }
    pub fn goal(&self) -> Point {
        self.goal
    }
    /// Whether a search run currently owns the grid.
    pub fn is_locked(&self) -> bool {
        self.run_lock
            .as_ref()
            .is_some_and(|run| run.strong_count() > 0)
    }
    pub(crate) fn lock(&mut self, token: &Arc<()>) {
        self.run_lock = Some(Arc::downgrade(token));
    }
    /// Releases the lock only if it is still held by `token`.
    pub(crate) fn unlock(&mut self, token: &Arc<()>) {
        if self
            .run_lock
            .as_ref()
            .is_some_and(|run| std::ptr::eq(run.as_ptr(), Arc::as_ptr(token)))
        {
            self.run_lock = None;
        }
    }
    pub(crate) fn release(&mut self) {
        self.run_lock = None;
    }

    pub fn in_bounds(&self, point: Point) -> bool {
        point.x >= 0
            && point.y >= 0
            && (point.x as usize) < self.width
            && (point.y as usize) < self.height
    }
    fn get_ix_point(&self, point: &Point) -> usize {
        point.y as usize * self.width + point.x as usize
    }
    pub fn cell(&self, point: Point) -> Option<&Cell> {
        if self.in_bounds(point) {
            Some(&self.cells[self.get_ix_point(&point)])
        } else {
            None
        }
    }
    /// Panics if `point` is out of bounds; callers only pass coordinates produced by the grid.
    pub(crate) fn cell_mut(&mut self, point: Point) -> &mut Cell {
        let ix = self.get_ix_point(&point);
        &mut self.cells[ix]
    }
    pub fn cell_snapshot(&self, point: Point) -> Option<CellSnapshot> {
        self.cell(point).map(Cell::snapshot)
    }
    /// All cells in row-major order together with their coordinates.
    pub fn snapshots(&self) -> impl Iterator<Item = (Point, CellSnapshot)> + '_ {
        self.cells.iter().enumerate().map(move |(ix, cell)| {
            let point = Point::new((ix % self.width) as i32, (ix / self.width) as i32);
            (point, cell.snapshot())
        })
    }

    /// The in-bounds orthogonal neighbours of `point` in west, east, north, south order.
    /// This order determines tie-breaking in the frontier.
    pub fn neighbors_of(&self, point: Point) -> SmallVec<[Point; 4]> {
        [
            Point::new(point.x - 1, point.y),
            Point::new(point.x + 1, point.y),
            Point::new(point.x, point.y - 1),
            Point::new(point.x, point.y + 1),
        ]
        .into_iter()
        .filter(|p| self.in_bounds(*p))
        .collect()
    }

    /// Changes the role of a single cell while keeping a single start and goal.
    ///
    /// - [Role::Start] and [Role::Goal] demote the previous holder of the role to
    ///   [Role::Empty]. Placing one on top of the other is ignored.
    /// - [Role::Wall] toggles between wall and empty; it never overwrites the start or goal.
    /// - [Role::Empty] clears a wall; it never clears the start or goal.
    pub fn set_cell_role(&mut self, point: Point, role: Role) -> Result<()> {
        if self.is_locked() {
            warn!("Rejected role change at {} while a search owns the grid", point);
            return Err(GridError::GridLocked);
        }
        if !self.in_bounds(point) {
            return Err(GridError::OutOfBounds(point));
        }
        let current = self.cells[self.get_ix_point(&point)].role;
        let changed = match role {
            Role::Start => self.move_endpoint(point, Role::Start),
            Role::Goal => self.move_endpoint(point, Role::Goal),
            Role::Wall | Role::Empty => {
                if matches!(current, Role::Start | Role::Goal) {
                    false
                } else if role == Role::Wall && current == Role::Empty {
                    self.set_role(point, Role::Wall);
                    true
                } else if current == Role::Wall {
                    self.set_role(point, Role::Empty);
                    true
                } else {
                    false
                }
            }
        };
        if changed {
            debug!("Cell {} set to {:?}", point, self.cells[self.get_ix_point(&point)].role);
            self.reset_search_state();
        }
        Ok(())
    }

    fn move_endpoint(&mut self, point: Point, role: Role) -> bool {
        let (previous, other) = match role {
            Role::Start => (self.start, self.goal),
            _ => (self.goal, self.start),
        };
        if point == previous || point == other {
            return false;
        }
        self.set_role(previous, Role::Empty);
        self.set_role(point, role);
        if role == Role::Start {
            self.start = point;
        } else {
            self.goal = point;
            // Estimates towards the old goal are stale.
            for cell in &mut self.cells {
                cell.cost_to_goal = f64::INFINITY;
            }
        }
        true
    }

    /// Sets a role and keeps the connected components up to date. Joins newly connected
    /// components and flags the components as dirty if they are (potentially) broken apart.
    fn set_role(&mut self, point: Point, role: Role) {
        let ix = self.get_ix_point(&point);
        let was_walkable = self.cells[ix].role.walkable();
        self.cells[ix].role = role;
        if was_walkable && !role.walkable() {
            self.components_dirty = true;
        } else if role.walkable() {
            for n in self.neighbors_of(point) {
                if self[n].role.walkable() {
                    let n_ix = self.get_ix_point(&n);
                    self.components.union(ix, n_ix);
                }
            }
        }
    }

    /// Replaces every role with the layout described by `preset`. On failure the grid is left
    /// unchanged.
    pub fn apply_preset(&mut self, preset: &Preset) -> Result<()> {
        if self.is_locked() {
            warn!("Rejected preset '{}' while a search owns the grid", preset.name);
            return Err(GridError::GridLocked);
        }
        let invalid = |reason: String| GridError::InvalidPreset {
            name: preset.name.clone(),
            reason,
        };
        if let Some(p) = preset.points().find(|p| !self.in_bounds(**p)) {
            return Err(invalid(format!(
                "{} lies outside the {}x{} grid",
                p, self.width, self.height
            )));
        }
        if preset.start == preset.goal {
            return Err(invalid(format!("start and goal coincide at {}", preset.start)));
        }
        for cell in &mut self.cells {
            *cell = Cell::default();
        }
        for wall in &preset.walls {
            self.cell_mut(*wall).role = Role::Wall;
        }
        self.cell_mut(preset.start).role = Role::Start;
        self.cell_mut(preset.goal).role = Role::Goal;
        self.start = preset.start;
        self.goal = preset.goal;
        self.reset_search_state();
        self.generate_components();
        debug!(
            "Applied preset '{}' with {} walls",
            preset.name,
            preset.walls.len()
        );
        Ok(())
    }

    /// Returns every cell to [SearchTag::Unvisited](crate::SearchTag::Unvisited) with infinite
    /// cost (zero for the start) and no parent.
    pub fn reset_search_state(&mut self) {
        for cell in &mut self.cells {
            cell.clear_search_state();
        }
    }

    /// Counts the cells holding `role`.
    pub fn count_role(&self, role: Role) -> usize {
        self.cells.iter().filter(|c| c.role == role).count()
    }

    /// Checks the single start/goal invariant against the actual cell contents.
    pub fn has_valid_endpoints(&self) -> bool {
        self.start != self.goal
            && self.count_role(Role::Start) == 1
            && self.count_role(Role::Goal) == 1
            && self.cell(self.start).map(|c| c.role) == Some(Role::Start)
            && self.cell(self.goal).map(|c| c.role) == Some(Role::Goal)
    }

    /// Regenerates the components if they are marked as dirty.
    pub fn update(&mut self) {
        if self.components_dirty {
            debug!("Components are dirty: regenerating components");
            self.generate_components();
        }
    }

    /// Generates a new [UnionFind] structure and links up walkable neighbours to the same
    /// components.
    pub fn generate_components(&mut self) {
        self.components = UnionFind::new(self.width * self.height);
        self.components_dirty = false;
        for y in 0..self.height as i32 {
            for x in 0..self.width as i32 {
                let point = Point::new(x, y);
                if !self[point].role.walkable() {
                    continue;
                }
                let parent_ix = self.get_ix_point(&point);
                // Linking right and down covers every edge once.
                for n in [Point::new(x + 1, y), Point::new(x, y + 1)] {
                    if self.in_bounds(n) && self[n].role.walkable() {
                        let ix = self.get_ix_point(&n);
                        self.components.union(parent_ix, ix);
                    }
                }
            }
        }
    }

    /// Checks if `a` and `b` are walkable and on the same connected component.
    pub fn reachable(&mut self, a: &Point, b: &Point) -> bool {
        self.update();
        match (self.cell(*a), self.cell(*b)) {
            (Some(ca), Some(cb)) if ca.role.walkable() && cb.role.walkable() => self
                .components
                .equiv(self.get_ix_point(a), self.get_ix_point(b)),
            _ => false,
        }
    }
}

impl Index<Point> for Grid {
    type Output = Cell;

    fn index(&self, point: Point) -> &Cell {
        &self.cells[self.get_ix_point(&point)]
    }
}

impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for y in 0..self.height as i32 {
            let row = (0..self.width as i32)
                .map(|x| self[Point::new(x, y)].snapshot().glyph())
                .collect::<String>();
            writeln!(f, "{}", row)?;
        }
        Ok(())
    }
}
