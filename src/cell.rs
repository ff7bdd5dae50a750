use grid_util::point::Point;

/// What a cell is, independent of any search.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum Role {
    #[default]
    Empty,
    Wall,
    Start,
    Goal,
}

impl Role {
    pub fn walkable(self) -> bool {
        self != Role::Wall
    }
}

/// Transient state of a cell during (or after) a search run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum SearchTag {
    #[default]
    Unvisited,
    Frontier,
    Visited,
}

/// A single grid cell. The role is persistent; the remaining fields are search state that is
/// cleared by [Grid::reset_search_state](crate::Grid::reset_search_state).
#[derive(Clone, Debug, PartialEq)]
pub struct Cell {
    pub role: Role,
    pub tag: SearchTag,
    pub cost_from_start: f64,
    pub cost_to_goal: f64,
    /// Predecessor on the best known path, resolved by lookup into the owning grid.
    pub parent: Option<Point>,
}

impl Cell {
    pub fn new(role: Role) -> Cell {
        Cell {
            role,
            tag: SearchTag::Unvisited,
            cost_from_start: if role == Role::Start { 0.0 } else { f64::INFINITY },
            cost_to_goal: f64::INFINITY,
            parent: None,
        }
    }

    pub(crate) fn clear_search_state(&mut self) {
        self.tag = SearchTag::Unvisited;
        self.cost_from_start = if self.role == Role::Start {
            0.0
        } else {
            f64::INFINITY
        };
        self.parent = None;
    }

    pub fn snapshot(&self) -> CellSnapshot {
        CellSnapshot {
            role: self.role,
            tag: self.tag,
        }
    }
}

impl Default for Cell {
    fn default() -> Cell {
        Cell::new(Role::Empty)
    }
}

/// Read-only view of a cell used for rendering.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct CellSnapshot {
    pub role: Role,
    pub tag: SearchTag,
}

impl CellSnapshot {
    /// Single character used when drawing a grid as text.
    pub fn glyph(&self) -> char {
        match (self.role, self.tag) {
            (Role::Start, _) => 'S',
            (Role::Goal, _) => 'G',
            (Role::Wall, _) => '#',
            (Role::Empty, SearchTag::Visited) => '*',
            (Role::Empty, SearchTag::Frontier) => '+',
            (Role::Empty, SearchTag::Unvisited) => '.',
        }
    }
}
