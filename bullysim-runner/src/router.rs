//! Per-peer inboxes and phase-boundary message routing.
//!
//! The router is the only surface shared between peers. Peers queue
//! outbound copies into their own outboxes; the scheduler moves them here
//! at phase boundaries, which is what gives SEND-phase messages in-tick
//! delivery while RECV- and END-phase replies surface the following tick.
//! Delivery is FIFO per inbox and peers are routed in UID order, so the
//! interleaving is fully deterministic.

use std::collections::VecDeque;

use bullysim_core::{Envelope, Message, PeerId};

/// Predicate deciding whether a routed message is lost on the wire.
///
/// Used by test harnesses to emulate targeted loss (e.g. "all ELECTION
/// traffic is dropped"). The send event has already been recorded by the
/// emitting peer at this point; filtering here models loss in flight.
pub type DropFilter = Box<dyn Fn(&Message) -> bool>;

/// Owns one FIFO inbox per peer and moves envelopes between them.
pub struct Router {
    inboxes: Vec<VecDeque<Message>>,
    drop_filter: Option<DropFilter>,
}

impl Router {
    /// Create a router for a cluster of `num_peers`.
    pub fn new(num_peers: u32) -> Self {
        Self {
            inboxes: (0..num_peers).map(|_| VecDeque::new()).collect(),
            drop_filter: None,
        }
    }

    /// Install a wire-loss predicate. Matching messages vanish in flight.
    pub fn set_drop_filter(&mut self, filter: impl Fn(&Message) -> bool + 'static) {
        self.drop_filter = Some(Box::new(filter));
    }

    /// Deliver a batch of envelopes into their destination inboxes.
    pub fn route(&mut self, envelopes: Vec<Envelope>) {
        for envelope in envelopes {
            if let Some(filter) = &self.drop_filter {
                if filter(&envelope.msg) {
                    continue;
                }
            }
            self.inject(envelope.dst, envelope.msg);
        }
    }

    /// Append a message directly to a peer's inbox.
    ///
    /// Bypasses the sending peer entirely; used by harnesses to stage
    /// adversarial messages (e.g. a stale COORDINATOR).
    pub fn inject(&mut self, dst: PeerId, msg: Message) {
        let idx = (dst.get() - 1) as usize;
        if let Some(inbox) = self.inboxes.get_mut(idx) {
            inbox.push_back(msg);
        }
    }

    /// Pop up to `max` messages from a peer's inbox, oldest first.
    pub fn drain(&mut self, dst: PeerId, max: usize) -> Vec<Message> {
        let idx = (dst.get() - 1) as usize;
        let Some(inbox) = self.inboxes.get_mut(idx) else {
            return Vec::new();
        };
        let take = max.min(inbox.len());
        inbox.drain(..take).collect()
    }

    /// Number of messages waiting in a peer's inbox.
    pub fn pending(&self, dst: PeerId) -> usize {
        self.inboxes
            .get((dst.get() - 1) as usize)
            .map_or(0, VecDeque::len)
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("inboxes", &self.inboxes)
            .field("drop_filter", &self.drop_filter.is_some())
            .finish()
    }
}
