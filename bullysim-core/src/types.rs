//! Wire messages, state reports, and the bounded per-tick event buffer.
//!
//! These records are the only surface the simulator exposes to the outside
//! world: every line of the three NDJSON output streams is one of the
//! serializable types below. Field names and casing therefore match the
//! stream format exactly (`type`, `src`, `dst`, `dropped`, `dir`, ...).

use serde::{Deserialize, Serialize};

/// Discrete simulation time. Ticks start at zero; `-1` is the "never"
/// sentinel used by `last_hb` and similar fields.
pub type Tick = i64;

/// Destination sentinel meaning "all peers except the sender".
pub const BROADCAST: i64 = -1;

/// Maximum number of message events a peer may record in one tick.
///
/// Excess events are silently discarded; the buffer is the bounded-memory
/// contract between a peer and the harvest step.
pub const MAX_MSG_EVENTS_PER_TICK: usize = 32;

/// Unique peer identifier in `[1, N]`.
///
/// Ordering is leadership priority: a higher `PeerId` always wins an
/// election against a lower one.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct PeerId(pub u32);

impl PeerId {
    /// Create a new peer identifier.
    pub const fn new(n: u32) -> Self {
        Self(n)
    }

    /// The raw identifier value.
    pub const fn get(self) -> u32 {
        self.0
    }

    /// The identifier widened to the wire representation.
    ///
    /// Wire fields that can also hold the `-1` broadcast/unknown sentinel
    /// are `i64`, so comparisons against them go through this.
    pub const fn as_i64(self) -> i64 {
        self.0 as i64
    }
}

impl std::fmt::Display for PeerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The six message kinds of the election protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MsgKind {
    /// Periodic liveness broadcast from the current leader.
    Heartbeat,
    /// Challenge sent to every higher-priority peer when starting an election.
    Election,
    /// Suppression reply: "a higher peer is alive, stand down".
    Ok,
    /// Victory broadcast: the sender is the new leader.
    Coordinator,
    /// Background traffic probe with a correlation id in `aux`.
    Ping,
    /// Reply to a [`MsgKind::Ping`], echoing its correlation id.
    Ack,
}

impl MsgKind {
    /// The protocol name as it appears on the message stream.
    pub const fn as_str(self) -> &'static str {
        match self {
            MsgKind::Heartbeat => "HEARTBEAT",
            MsgKind::Election => "ELECTION",
            MsgKind::Ok => "OK",
            MsgKind::Coordinator => "COORDINATOR",
            MsgKind::Ping => "PING",
            MsgKind::Ack => "ACK",
        }
    }
}

impl std::fmt::Display for MsgKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A protocol message as it travels between peers.
///
/// `dst` and `leader` keep the wire sentinels: `-1` means broadcast and
/// "no known leader" respectively. Broadcast messages carry `dst = -1`
/// even though the transport fans them out as per-recipient unicasts, so
/// a receive event for a broadcast is distinguishable from a unicast one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Message kind.
    pub kind: MsgKind,
    /// The sender's tick at emission.
    pub tick: Tick,
    /// Originating peer.
    pub src: PeerId,
    /// Destination peer, or [`BROADCAST`].
    pub dst: i64,
    /// The sender's current leader belief (informational).
    pub leader: i64,
    /// Free integer; ping correlation id.
    pub aux: i64,
}

/// A routed message together with its concrete destination.
///
/// Produced by a peer's outbox, consumed by the router. For broadcast
/// messages the inner [`Message::dst`] stays `-1` while `dst` names the
/// actual recipient of this copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Envelope {
    /// The peer whose inbox this copy is delivered to.
    pub dst: PeerId,
    /// The message payload.
    pub msg: Message,
}

/// One peer's snapshot at the end of a tick, harvested by the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateReport {
    /// Peer identifier.
    pub uid: PeerId,
    /// Whether the peer could communicate during this tick.
    pub online: bool,
    /// Current leader belief (`-1` if unknown).
    pub leader: i64,
    /// Whether an election is active at this peer.
    pub election: bool,
    /// Tick of the last accepted heartbeat or coordinator (`-1` if never).
    pub last_hb: Tick,
}

/// Direction of a recorded message event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// The event records an outbound emission.
    Send,
    /// The event records an inbound delivery.
    Recv,
}

/// One line of the message stream.
///
/// Send events carry the concrete per-recipient destination; receive
/// events carry the wire destination, which is `-1` for broadcasts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageEvent {
    /// Tick at which the event was recorded.
    pub tick: Tick,
    /// Message kind.
    #[serde(rename = "type")]
    pub kind: MsgKind,
    /// Originating peer.
    pub src: PeerId,
    /// Destination peer or [`BROADCAST`].
    pub dst: i64,
    /// Whether the message was dropped (by the wire or by gating).
    pub dropped: bool,
    /// Send or receive side.
    pub dir: Direction,
}

/// One line of the debug stream: a free-form diagnostic emitted by a peer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebugEntry {
    /// Tick at which the scheduler harvested the line.
    pub tick: Tick,
    /// The peer that emitted it.
    pub uid: PeerId,
    /// The diagnostic text.
    pub msg: String,
}

/// Bounded per-tick buffer of [`MessageEvent`]s.
///
/// Holds at most [`MAX_MSG_EVENTS_PER_TICK`] events; further records are
/// silently discarded. Drained by the scheduler once per tick.
#[derive(Debug, Default)]
pub struct EventBuffer {
    events: Vec<MessageEvent>,
}

impl EventBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self {
            events: Vec::with_capacity(MAX_MSG_EVENTS_PER_TICK),
        }
    }

    /// Record an event, discarding it if the buffer is full.
    pub fn record(&mut self, event: MessageEvent) {
        if self.events.len() < MAX_MSG_EVENTS_PER_TICK {
            self.events.push(event);
        }
    }

    /// Number of events currently buffered.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether the buffer holds no events.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Take all buffered events, leaving the buffer empty.
    pub fn drain(&mut self) -> Vec<MessageEvent> {
        std::mem::take(&mut self.events)
    }
}
