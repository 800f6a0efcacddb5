//! The Bully election state machine.
//!
//! Each peer moves through four logical states:
//!
//! ```text
//!                    heartbeat timeout /
//!                    ELECTION from lower /
//!                    COORDINATOR from lower
//!   ┌──────────┐ ─────────────────────────> ┌──────────┐
//!   │ FOLLOWER │                            │ ELECTING │ ──┐ victory
//!   └──────────┘ <───────────────────────── └──────────┘   │ timeout
//!        ^          HEARTBEAT/COORDINATOR      │   ^       │
//!        │          from ≥-UID sender          │   │       v
//!        │                            OK from  │   │  ┌──────────┐
//!        │                            higher   │   │  │  LEADER  │
//!        │                                     v   │  └──────────┘
//!        │         HEARTBEAT/COORDINATOR  ┌─────────┐
//!        └──────────────────────────────  │ WAITING │
//!                  from ≥-UID sender      └─────────┘
//!                                      (coordinator-wait timeout
//!                                       loops back to ELECTING)
//! ```
//!
//! The states are not stored as an enum: they are the cross product of
//! `leader_uid`, `election_active`, and `waiting_for_coordinator`, exactly
//! as the protocol's guards consume them.
//!
//! A tick drives three phases in order:
//!
//! 1. **SEND**: heartbeat if leader, ELECTION fan-out if an election was
//!    requested, maybe a background ping.
//! 2. **RECV**: drain inbox messages through the handler table.
//! 3. **END**: the three timeout checks: leader liveness (`≥`),
//!    coordinator wait (`>`), and election victory (`>`). The inequalities
//!    differ so a peer that sends ELECTION at tick N and sees OK at N+1
//!    still has ticks N+2 through N+timeout to hear the COORDINATOR.
//!
//! Every peer starts believing the highest UID is the leader, so a fresh
//! cluster converges without a first-tick election storm.

use bullysim_core::{
    config::NodeConfig, DeterministicRng, Direction, Envelope, EventBuffer, Message, MessageEvent,
    MsgKind, PeerId, StateReport, Tick, BROADCAST,
};

/// A single protocol participant.
///
/// Owns its election state, RNG stream, outbox, and per-tick event and
/// diagnostic buffers. The scheduler calls the three phase methods in
/// order each tick and harvests the buffers afterwards.
#[derive(Debug)]
pub struct Peer {
    uid: PeerId,
    num_peers: u32,
    cfg: NodeConfig,

    leader_uid: i64,
    last_hb_tick: Tick,
    can_communicate: bool,

    election_active: bool,
    election_started: bool,
    election_start_tick: Tick,
    waiting_for_coordinator: bool,
    ok_received_tick: Tick,

    rng: DeterministicRng,
    next_ping_id: i64,

    outbox: Vec<Envelope>,
    events: EventBuffer,
    diagnostics: Vec<String>,
}

impl Peer {
    /// Create a peer with `uid` in a cluster of `num_peers`.
    ///
    /// The initial leader belief is the highest UID in the cluster.
    pub fn new(uid: PeerId, num_peers: u32, cfg: NodeConfig, base_seed: u64) -> Self {
        Self {
            uid,
            num_peers,
            cfg,
            leader_uid: num_peers as i64,
            last_hb_tick: -1,
            can_communicate: true,
            election_active: false,
            election_started: false,
            election_start_tick: -1,
            waiting_for_coordinator: false,
            ok_received_tick: -1,
            rng: DeterministicRng::for_peer(base_seed, uid),
            next_ping_id: 0,
            outbox: Vec::new(),
            events: EventBuffer::new(),
            diagnostics: Vec::new(),
        }
    }

    /// This peer's identifier.
    pub fn uid(&self) -> PeerId {
        self.uid
    }

    /// The protocol parameters this peer runs with.
    pub fn config(&self) -> &NodeConfig {
        &self.cfg
    }

    /// Current leader belief (`-1` if unknown).
    pub fn leader_uid(&self) -> i64 {
        self.leader_uid
    }

    /// Whether this peer currently believes itself leader.
    pub fn is_leader(&self) -> bool {
        self.leader_uid == self.uid.as_i64()
    }

    /// Whether an election is active at this peer.
    pub fn election_active(&self) -> bool {
        self.election_active
    }

    /// Whether this peer received an OK and awaits the winner's broadcast.
    pub fn waiting_for_coordinator(&self) -> bool {
        self.waiting_for_coordinator
    }

    /// Tick of the last accepted heartbeat or coordinator (`-1` if never).
    pub fn last_hb_tick(&self) -> Tick {
        self.last_hb_tick
    }

    /// Whether the transport is currently gated open for this peer.
    pub fn can_communicate(&self) -> bool {
        self.can_communicate
    }

    /// Set the communication gate for the upcoming tick.
    ///
    /// Written by the scheduler from the failure model before Phase SEND;
    /// frozen for the remainder of the tick.
    pub fn set_can_communicate(&mut self, can: bool) {
        self.can_communicate = can;
    }

    /// Request an election: ELECTION messages go out on the next SEND phase.
    ///
    /// This is the same entry point the timeout checks use internally; it
    /// exists publicly so harnesses can start an election at a chosen tick.
    pub fn trigger_election(&mut self) {
        self.election_active = true;
        self.election_started = false;
    }

    /// Phase SEND: heartbeat, election fan-out, background traffic.
    pub fn phase_send(&mut self, tick: Tick) {
        self.maybe_send_heartbeat(tick);
        if self.election_active && !self.election_started {
            self.start_election(tick);
        }
        self.maybe_send_ping(tick);
    }

    /// Phase RECV: run each drained message through the handler table.
    ///
    /// Every message yields a receive event; when the peer cannot
    /// communicate the event is flagged dropped and the message is
    /// discarded unhandled.
    pub fn phase_recv(&mut self, tick: Tick, messages: Vec<Message>) {
        for msg in messages {
            self.events.record(MessageEvent {
                tick,
                kind: msg.kind,
                src: msg.src,
                dst: msg.dst,
                dropped: !self.can_communicate,
                dir: Direction::Recv,
            });
            if self.can_communicate {
                self.handle_message(tick, msg);
            }
        }
    }

    /// Phase END: the three timeout checks, in order.
    pub fn phase_end(&mut self, tick: Tick) {
        // Leader liveness: the heartbeat has gone quiet.
        if self.leader_uid != -1
            && !self.is_leader()
            && !self.election_active
            && !self.waiting_for_coordinator
            && self.last_hb_tick >= 0
            && tick - self.last_hb_tick >= self.cfg.hb_timeout_ticks
        {
            self.election_active = true;
            self.election_started = false;
            self.diag("timeout: no heartbeat from leader, starting election");
        }

        // Coordinator wait: the higher peer that OK'd us never announced.
        if self.waiting_for_coordinator
            && tick - self.ok_received_tick > self.cfg.election_timeout_ticks
        {
            self.waiting_for_coordinator = false;
            self.ok_received_tick = -1;
            self.election_active = true;
            self.election_started = false;
            self.diag("timeout: no COORDINATOR received, restarting election");
        }

        // Victory: no higher peer objected within the timeout.
        if self.election_active
            && self.election_started
            && tick - self.election_start_tick > self.cfg.election_timeout_ticks
        {
            self.leader_uid = self.uid.as_i64();
            self.election_active = false;
            self.election_started = false;
            self.diag("won election: becoming leader");
            self.broadcast(tick, MsgKind::Coordinator, 0);
            self.diag("-> COORDINATOR to all: I am leader");
        }
    }

    /// Snapshot this peer's state for the harvest step.
    pub fn make_state_report(&self) -> StateReport {
        StateReport {
            uid: self.uid,
            online: self.can_communicate,
            leader: self.leader_uid,
            election: self.election_active,
            last_hb: self.last_hb_tick,
        }
    }

    /// Take the messages queued for routing, leaving the outbox empty.
    pub fn take_outbox(&mut self) -> Vec<Envelope> {
        std::mem::take(&mut self.outbox)
    }

    /// Take this tick's recorded message events.
    pub fn take_events(&mut self) -> Vec<MessageEvent> {
        self.events.drain()
    }

    /// Take this tick's diagnostic lines.
    pub fn take_diagnostics(&mut self) -> Vec<String> {
        std::mem::take(&mut self.diagnostics)
    }

    fn maybe_send_heartbeat(&mut self, tick: Tick) {
        if !self.is_leader() {
            return;
        }
        if self.cfg.hb_period_ticks <= 0 || tick % self.cfg.hb_period_ticks != 0 {
            return;
        }
        self.diag("-> HEARTBEAT to all");
        self.broadcast(tick, MsgKind::Heartbeat, 0);
    }

    fn start_election(&mut self, tick: Tick) {
        self.election_started = true;
        self.election_start_tick = tick;

        let mut sent_any = false;
        for peer in (self.uid.get() + 1)..=self.num_peers {
            let target = PeerId::new(peer);
            let msg = self.build(tick, MsgKind::Election, BROADCAST, 0);
            let dropped = self.dispatch(tick, msg, target);
            if dropped {
                self.diag(format!("-> ELECTION to {target} (dropped)"));
            } else {
                sent_any = true;
                self.diag(format!("-> ELECTION to {target}"));
            }
        }

        if !sent_any && self.uid.get() == self.num_peers {
            // Highest UID: nobody to challenge, the victory timer decides.
            self.diag("no higher nodes: winning immediately");
        }
    }

    fn maybe_send_ping(&mut self, tick: Tick) {
        if self.cfg.p_send <= 0.0 {
            return;
        }
        if self.rng.random_f64() >= self.cfg.p_send {
            return;
        }

        let target = self.random_other_peer();
        let aux = self.next_ping_id;
        self.next_ping_id += 1;

        let msg = self.build(tick, MsgKind::Ping, target.as_i64(), aux);
        let dropped = self.dispatch(tick, msg, target);
        if dropped {
            self.diag(format!("-> PING to {target} (dropped)"));
        } else {
            self.diag(format!("-> PING to {target}"));
        }
    }

    fn handle_message(&mut self, tick: Tick, msg: Message) {
        match msg.kind {
            MsgKind::Heartbeat => {
                if msg.src >= self.uid {
                    self.leader_uid = msg.src.as_i64();
                    self.last_hb_tick = tick;
                    self.election_active = false;
                    self.waiting_for_coordinator = false;
                    self.diag(format!("<- HEARTBEAT from {}", msg.src));
                }
                // A heartbeat from a lower UID is stale noise: in steady
                // state we either already lead or have rejected its
                // COORDINATOR, so it is discarded without side effect.
            }
            MsgKind::Election => {
                let reply = self.build(tick, MsgKind::Ok, msg.src.as_i64(), 0);
                let dropped = self.dispatch(tick, reply, msg.src);
                if dropped {
                    self.diag(format!("-> OK to {} (dropped)", msg.src));
                } else {
                    self.diag(format!("-> OK to {}", msg.src));
                }

                if msg.src < self.uid && !self.election_active {
                    self.election_active = true;
                    self.election_started = false;
                    self.diag(format!(
                        "<- ELECTION from {}: starting own election",
                        msg.src
                    ));
                }
            }
            MsgKind::Ok => {
                if msg.src > self.uid {
                    self.election_active = false;
                    self.election_started = false;
                    self.waiting_for_coordinator = true;
                    self.ok_received_tick = tick;
                    self.diag(format!(
                        "<- OK from {}: yielding, waiting for COORDINATOR",
                        msg.src
                    ));
                }
            }
            MsgKind::Coordinator => {
                if msg.src >= self.uid {
                    self.leader_uid = msg.src.as_i64();
                    self.last_hb_tick = tick;
                    self.election_active = false;
                    self.election_started = false;
                    self.waiting_for_coordinator = false;
                    self.ok_received_tick = -1;
                    self.diag(format!("<- COORDINATOR from {}: accepted as leader", msg.src));
                } else {
                    self.diag(format!(
                        "<- COORDINATOR from {}: rejected (lower UID), starting election",
                        msg.src
                    ));
                    if !self.election_active && !self.waiting_for_coordinator {
                        self.election_active = true;
                        self.election_started = false;
                    }
                }
            }
            MsgKind::Ping => {
                let reply = self.build(tick, MsgKind::Ack, msg.src.as_i64(), msg.aux);
                let dropped = self.dispatch(tick, reply, msg.src);
                if dropped {
                    self.diag(format!("-> ACK to {} (dropped)", msg.src));
                } else {
                    self.diag(format!("-> ACK to {}", msg.src));
                }
            }
            MsgKind::Ack => {
                // Traffic realism only.
            }
        }
    }

    fn build(&self, tick: Tick, kind: MsgKind, dst: i64, aux: i64) -> Message {
        Message {
            kind,
            tick,
            src: self.uid,
            dst,
            leader: self.leader_uid,
            aux,
        }
    }

    /// Emit one message copy towards `dst`.
    ///
    /// Applies the per-copy drop decision (wire loss or communication
    /// gating), records the send event, and queues the copy for routing
    /// when it survives. Returns whether the copy was dropped.
    fn dispatch(&mut self, tick: Tick, msg: Message, dst: PeerId) -> bool {
        let dropped = self.should_drop() || !self.can_communicate;
        self.events.record(MessageEvent {
            tick,
            kind: msg.kind,
            src: self.uid,
            dst: dst.as_i64(),
            dropped,
            dir: Direction::Send,
        });
        if !dropped {
            self.outbox.push(Envelope { dst, msg });
        }
        dropped
    }

    /// Fan a message out to every other peer as independent unicasts.
    ///
    /// Only the leader broadcasts (heartbeats and the victory
    /// announcement), so the carried leader belief is always this peer.
    fn broadcast(&mut self, tick: Tick, kind: MsgKind, aux: i64) {
        for peer in 1..=self.num_peers {
            if peer == self.uid.get() {
                continue;
            }
            let msg = self.build(tick, kind, BROADCAST, aux);
            self.dispatch(tick, msg, PeerId::new(peer));
        }
    }

    fn should_drop(&mut self) -> bool {
        if self.cfg.p_drop <= 0.0 {
            return false;
        }
        self.rng.random_f64() <= self.cfg.p_drop
    }

    fn random_other_peer(&mut self) -> PeerId {
        let mut peer = self.uid.get();
        while peer == self.uid.get() {
            peer = self.rng.random_range(1..=self.num_peers);
        }
        PeerId::new(peer)
    }

    fn diag(&mut self, line: impl Into<String>) {
        self.diagnostics.push(line.into());
    }
}
