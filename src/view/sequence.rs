use std::collections::HashMap;

/// Independent streams of data the engine ingests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Roster,
    Snapshots,
    Distances,
}

/// Stamp handed out when a fetch starts and presented when its result lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    channel: Channel,
    seq: u64,
}

impl Ticket {
    pub fn channel(&self) -> Channel {
        self.channel
    }

    pub fn seq(&self) -> u64 {
        self.seq
    }
}

/// Last-write-wins by request order.
///
/// Only the most recently issued ticket of a channel may apply its result;
/// a late answer to an older request is dropped.
#[derive(Debug, Default)]
pub struct Sequencer {
    next: u64,
    latest: HashMap<Channel, u64>,
}

impl Sequencer {
    pub fn issue(&mut self, channel: Channel) -> Ticket {
        self.next += 1;
        self.latest.insert(channel, self.next);
        Ticket {
            channel,
            seq: self.next,
        }
    }

    pub fn is_current(&self, ticket: &Ticket) -> bool {
        self.latest.get(&ticket.channel) == Some(&ticket.seq)
    }
}
