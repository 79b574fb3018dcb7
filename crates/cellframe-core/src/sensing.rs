use crate::Manager;
use crate::channel::ChannelId;
use crate::topology::rotate;

/// Read-only view of the neighbourhood seen by one frame.
///
/// Every query takes a direction relative to the frame's facing; a relative
/// direction of `0.0` looks straight ahead.
#[derive(Debug, Clone, Copy)]
pub struct Sensor<'a> {
    manager: &'a Manager,
    pos: usize,
    facing: usize,
}

impl<'a> Sensor<'a> {
    #[must_use]
    pub const fn new(manager: &'a Manager, pos: usize, facing: usize) -> Self {
        Self {
            manager,
            pos,
            facing,
        }
    }

    #[must_use]
    pub fn calc_dir(&self, relative: f64) -> usize {
        rotate(self.facing, relative)
    }

    #[must_use]
    pub fn neighbor(&self, relative: f64) -> usize {
        self.manager.neighbor(self.pos, self.calc_dir(relative))
    }

    #[must_use]
    pub fn is_live(&self, relative: f64) -> bool {
        self.manager.is_live(self.neighbor(relative))
    }

    /// Neighbour tile holds a channel, including partially dead tiles.
    #[must_use]
    pub fn is_occupied(&self, relative: f64) -> bool {
        self.manager.channel(self.neighbor(relative)).ids().is_some()
    }

    /// This cell is the neighbour's offspring.
    ///
    /// Reads from this cell's side: the subject is this cell, the neighbour is the parent.
    #[must_use]
    pub fn is_cell_child(&self, relative: f64) -> bool {
        let neigh = self.neighbor(relative);
        self.manager.is_live(neigh)
            && self.manager.family(self.pos).is_parent_pos(neigh)
            && self.manager.family(neigh).has_child_pos(self.pos)
    }

    /// This cell is the neighbour's parent.
    ///
    /// Reads from this cell's side: the subject is this cell, the neighbour is the child.
    #[must_use]
    pub fn is_cell_parent(&self, relative: f64) -> bool {
        let neigh = self.neighbor(relative);
        self.manager.is_live(neigh)
            && self.manager.family(self.pos).has_child_pos(neigh)
            && self.manager.family(neigh).is_parent_pos(self.pos)
    }

    #[must_use]
    pub fn is_channel_mate(&self, level: usize, relative: f64) -> bool {
        let neigh = self.neighbor(relative);
        self.manager
            .channel(self.pos)
            .check_match(self.manager.channel(neigh), level)
    }

    /// This cell descends from the propagule whose top-level channel the neighbour carries.
    ///
    /// Reads from this cell's side: compares our `prev_chan` with the neighbour's top id.
    #[must_use]
    pub fn is_propagule_child(&self, relative: f64) -> bool {
        let neigh = self.neighbor(relative);
        self.manager.is_live(neigh)
            && same_channel(
                self.manager.family(self.pos).prev_chan(),
                self.top_channel(neigh),
            )
    }

    /// The neighbour descends from this cell's propagule.
    ///
    /// Reads from the neighbour's side: compares its `prev_chan` with our top id.
    #[must_use]
    pub fn is_propagule_parent(&self, relative: f64) -> bool {
        let neigh = self.neighbor(relative);
        self.manager.is_live(neigh)
            && same_channel(
                self.manager.family(neigh).prev_chan(),
                self.top_channel(self.pos),
            )
    }

    /// Neighbour holds strictly less resource than this cell.
    ///
    /// Reads from the neighbour's side: the pro trigger means the facing cell is the poorer one.
    #[must_use]
    pub fn neighbor_is_poorer(&self, relative: f64) -> bool {
        let neigh = self.neighbor(relative);
        self.manager.stockpile(neigh).query_resource()
            < self.manager.stockpile(self.pos).query_resource()
    }

    /// Neighbour was born no later than this cell.
    ///
    /// Reads from the neighbour's side: the pro trigger means the facing cell is the older one.
    #[must_use]
    pub fn neighbor_is_older(&self, relative: f64) -> bool {
        let neigh = self.neighbor(relative);
        self.manager.family(neigh).birth_tick() <= self.manager.family(self.pos).birth_tick()
    }

    #[must_use]
    pub fn neighbor_expiration(&self, level: usize, relative: f64) -> u64 {
        self.manager.channel(self.neighbor(relative)).expiration(level)
    }

    /// Raw neighbour channel id: `None` when the neighbour is not live,
    /// `Some(None)` when it is live but holds no id at `level`.
    #[must_use]
    pub fn facing_channel(&self, level: usize, relative: f64) -> Option<Option<ChannelId>> {
        let neigh = self.neighbor(relative);
        self.manager
            .is_live(neigh)
            .then(|| self.manager.channel(neigh).id(level))
    }

    /// Neighbour resource, if the neighbour is live.
    #[must_use]
    pub fn facing_stockpile(&self, relative: f64) -> Option<f64> {
        let neigh = self.neighbor(relative);
        self.manager
            .is_live(neigh)
            .then(|| self.manager.stockpile(neigh).query_resource())
    }

    fn top_channel(&self, pos: usize) -> Option<ChannelId> {
        let top = self.manager.config().nlev.checked_sub(1)?;
        self.manager.channel(pos).id(top)
    }
}

fn same_channel(lhs: Option<ChannelId>, rhs: Option<ChannelId>) -> bool {
    matches!((lhs, rhs), (Some(lhs), Some(rhs)) if lhs == rhs)
}
