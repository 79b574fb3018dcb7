use cellframe_tags::Tag;
use cellframe_vm::{Event, Memory};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum MessageKind {
    /// Between sibling frames of one cell.
    Internal,
    /// To the facing frame of a neighbouring cell.
    External,
}

/// Tagged payload waiting in a frame inbox.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub kind: MessageKind,
    pub affinity: Tag,
    /// Output memory of the sending thread.
    pub payload: Memory,
    pub from_pos: usize,
    pub from_facing: usize,
}

impl Message {
    #[must_use]
    pub fn into_event(self) -> Event {
        Event::new(self.affinity, self.payload)
    }
}
