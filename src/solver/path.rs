use crate::error::SearchError;
use crate::grid::Grid;
use grid_util::point::Point;

/// Walks parent links back from `goal_neighbour`, the cell that first touched the goal, and
/// returns the path oriented from `start` to `goal` with both endpoints included.
pub fn reconstruct(
    grid: &Grid,
    goal_neighbour: Point,
    start: Point,
    goal: Point,
) -> Result<Vec<Point>, SearchError> {
    let broken = SearchError::BrokenParentChain {
        from: goal_neighbour,
    };
    let mut path = vec![goal];
    let mut current = Some(goal_neighbour);
    let mut last = goal_neighbour;
    while let Some(point) = current {
        // A chain longer than the grid has a cycle.
        if path.len() > grid.width() * grid.height() {
            debug_assert!(false, "cyclic parent chain from {}", goal_neighbour);
            return Err(broken);
        }
        let cell = grid.cell(point).ok_or_else(|| broken.clone())?;
        path.push(point);
        last = point;
        current = cell.parent;
    }
    if last != start {
        debug_assert!(false, "parent chain from {} ends at {}", goal_neighbour, last);
        return Err(broken);
    }
    path.reverse();
    Ok(path)
}
