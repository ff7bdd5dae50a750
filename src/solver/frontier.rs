use fxhash::FxBuildHasher;
use grid_util::point::Point;
use indexmap::IndexSet;
use itertools::Itertools;

type FxIndexSet<K> = IndexSet<K, FxBuildHasher>;

/// Discovered cells awaiting expansion, kept in insertion order. Selection re-reads the priority
/// of every entry and takes the first minimum, so equal keys come out first-in first-out.
#[derive(Clone, Debug, Default)]
pub(crate) struct Frontier {
    open: FxIndexSet<Point>,
}

impl Frontier {
    pub fn new() -> Frontier {
        Frontier::default()
    }

    /// Appends `point` unless it is already waiting. Returns whether it was added.
    pub fn push(&mut self, point: Point) -> bool {
        self.open.insert(point)
    }

    pub fn len(&self) -> usize {
        self.open.len()
    }

    /// Removes and returns the entry with the smallest key, preferring the earliest inserted.
    pub fn pop_min<F>(&mut self, mut key: F) -> Option<Point>
    where
        F: FnMut(&Point) -> f64,
    {
        let ix = self
            .open
            .iter()
            .map(|p| key(p))
            .position_min_by(|a, b| a.total_cmp(b))?;
        self.open.shift_remove_index(ix)
    }
}
