use crate::cell::{Role, SearchTag};
use crate::grid::Grid;
use crossbeam_channel::{Receiver, Sender};
use grid_util::point::Point;
use log::debug;

/// Emitted each time a cell's [SearchTag] changes during a run. Purely advisory: the run never
/// waits on a consumer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TagChange {
    pub point: Point,
    pub role: Role,
    pub tag: SearchTag,
}

/// Creates an unbounded, ordered channel for [TagChange] notifications.
pub fn channel() -> (Sender<TagChange>, Receiver<TagChange>) {
    crossbeam_channel::unbounded()
}

/// Forwards tag changes to an optional sender, going quiet once the receiver hangs up.
#[derive(Clone, Debug, Default)]
pub(crate) struct Notifier {
    sender: Option<Sender<TagChange>>,
}

impl Notifier {
    pub fn new(sender: Option<Sender<TagChange>>) -> Notifier {
        Notifier { sender }
    }

    pub fn notify(&mut self, grid: &Grid, point: Point) {
        let Some(sender) = &self.sender else {
            return;
        };
        let cell = &grid[point];
        let change = TagChange {
            point,
            role: cell.role,
            tag: cell.tag,
        };
        if sender.send(change).is_err() {
            debug!("Tag change receiver disconnected, dropping further notifications");
            self.sender = None;
        }
    }
}
