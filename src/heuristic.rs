use grid_util::point::Point;

/// Distance estimates available to A*. Both are admissible for unit-cost 4-connected movement.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum Heuristic {
    #[default]
    Manhattan,
    Euclidean,
}

impl Heuristic {
    /// Estimated remaining cost from `from` to `to`. Never negative.
    pub fn estimate(self, from: &Point, to: &Point) -> f64 {
        match self {
            Heuristic::Manhattan => from.manhattan_distance(to) as f64,
            Heuristic::Euclidean => {
                let dx = (from.x - to.x) as f64;
                let dy = (from.y - to.y) as f64;
                dx.hypot(dy)
            }
        }
    }
}

pub fn estimate(from: &Point, to: &Point, kind: Heuristic) -> f64 {
    kind.estimate(from, to)
}
