//! Named start/goal/wall layouts that bulk-initialize a [Grid](crate::Grid).
use grid_util::point::Point;

/// Immutable layout applied with [Grid::apply_preset](crate::Grid::apply_preset).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Preset {
    pub name: String,
    pub start: Point,
    pub goal: Point,
    pub walls: Vec<Point>,
}

impl Preset {
    pub fn new(name: &str, start: Point, goal: Point, walls: Vec<Point>) -> Preset {
        Preset {
            name: name.to_owned(),
            start,
            goal,
            walls,
        }
    }

    /// Every coordinate the preset touches, start and goal first.
    pub fn points(&self) -> impl Iterator<Item = &Point> {
        [&self.start, &self.goal].into_iter().chain(self.walls.iter())
    }
}

/// No walls, opposite corners.
pub fn empty() -> Preset {
    Preset::new("empty", Point::new(0, 0), Point::new(9, 9), Vec::new())
}

/// A full row of walls at y = 5 with a single gap at x = 5.
pub fn wall_with_gap() -> Preset {
    let walls = (0..10)
        .filter(|&x| x != 5)
        .map(|x| Point::new(x, 5))
        .collect();
    Preset::new("wall_with_gap", Point::new(0, 0), Point::new(9, 9), walls)
}

// |S   #     |
// | ## # ### |
// |  #   #   |
// |# ##### # |
// |  #     # |
// | ## ### ##|
// |    #     |
// | #### ### |
// |    #   # |
// |### ###  G|
pub fn maze() -> Preset {
    const ROWS: [&str; 10] = [
        "    #     ",
        " ## # ### ",
        "  #   #   ",
        "# ##### # ",
        "  #     # ",
        " ## ### ##",
        "    #     ",
        " #### ### ",
        "    #   # ",
        "### ###   ",
    ];
    let walls = ROWS
        .iter()
        .enumerate()
        .flat_map(|(y, row)| {
            row.bytes()
                .enumerate()
                .filter(|(_, b)| *b == b'#')
                .map(move |(x, _)| Point::new(x as i32, y as i32))
        })
        .collect();
    Preset::new("maze", Point::new(0, 0), Point::new(9, 9), walls)
}

/// The goal corner is sealed off by two walls.
pub fn enclosed_goal() -> Preset {
    Preset::new(
        "enclosed_goal",
        Point::new(0, 0),
        Point::new(9, 9),
        vec![Point::new(8, 9), Point::new(9, 8)],
    )
}

/// The reference preset library for a 10x10 grid.
pub fn builtin() -> Vec<Preset> {
    vec![empty(), wall_with_gap(), maze(), enclosed_goal()]
}

pub fn by_name(name: &str) -> Option<Preset> {
    builtin().into_iter().find(|p| p.name == name)
}
