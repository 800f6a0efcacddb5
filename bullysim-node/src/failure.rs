//! Failure models gating peer communication.
//!
//! A failure model decides, tick by tick, whether its peer can reach the
//! wire. The peer keeps executing protocol logic regardless; only
//! transport is gated. Models are a tagged enum rather than trait objects
//! so the scheduler's hot loop matches exhaustively without dispatch.
//!
//! The [`FailureModel::Network`] variant needs to know whether its peer
//! currently believes itself leader *before* each [`FailureModel::advance`]
//! call, because leaders fail at a scaled probability.

use bullysim_core::{
    config::{FailureConfig, FailureKind},
    DeterministicRng, PeerId, SimError, SimResult, Tick,
};
use rand::distr::weighted::WeightedIndex;

/// Network failure: the peer runs, but messages don't get through.
///
/// Models partitions and connectivity loss. Each tick either counts down
/// a residual offline window or draws a Bernoulli failure trial; on
/// failure, an offline duration is sampled from a weighted categorical.
#[derive(Debug, Clone)]
pub struct NetworkFailure {
    rng: DeterministicRng,
    p_fail: f64,
    leader_fail_multiplier: f64,
    durations: Vec<Tick>,
    duration_dist: WeightedIndex<u32>,
    offline_remaining: Tick,
    is_leader: bool,
}

impl NetworkFailure {
    /// Build the model for `uid` from failure configuration.
    pub fn new(cfg: &FailureConfig, uid: PeerId, base_seed: u64) -> SimResult<Self> {
        if cfg.offline_durations.len() != cfg.offline_weights.len() {
            return Err(SimError::InvalidConfig(format!(
                "offline_durations ({}) and offline_weights ({}) differ in length",
                cfg.offline_durations.len(),
                cfg.offline_weights.len()
            )));
        }
        let duration_dist = WeightedIndex::new(cfg.offline_weights.iter().copied())
            .map_err(|err| SimError::InvalidConfig(format!("offline_weights: {err}")))?;
        Ok(Self {
            rng: DeterministicRng::for_peer(base_seed, uid),
            p_fail: cfg.p_fail,
            leader_fail_multiplier: cfg.leader_fail_multiplier,
            durations: cfg.offline_durations.clone(),
            duration_dist,
            offline_remaining: 0,
            is_leader: false,
        })
    }

    fn advance(&mut self) {
        if self.offline_remaining > 0 {
            self.offline_remaining -= 1;
            return;
        }
        let p = if self.is_leader {
            self.p_fail * self.leader_fail_multiplier
        } else {
            self.p_fail
        };
        if self.rng.random_f64() < p {
            let idx = self.rng.sample(&self.duration_dist);
            self.offline_remaining = self.durations[idx];
        }
    }
}

/// Crash failure: the peer fully stops until a fixed recovery countdown
/// expires. Transport gating is identical to the network model; the
/// additional [`FailureModel::is_crashed`] signal lets a scheduler skip
/// the peer's internal logic entirely if it chooses to.
#[derive(Debug, Clone)]
pub struct CrashFailure {
    rng: DeterministicRng,
    p_crash: f64,
    recovery_ticks: Tick,
    crashed_remaining: Tick,
}

impl CrashFailure {
    /// Build the model for `uid` from failure configuration.
    pub fn new(cfg: &FailureConfig, uid: PeerId, base_seed: u64) -> Self {
        Self {
            rng: DeterministicRng::for_peer(base_seed, uid),
            p_crash: cfg.p_crash,
            recovery_ticks: cfg.recovery_ticks,
            crashed_remaining: 0,
        }
    }

    fn advance(&mut self) {
        if self.crashed_remaining > 0 {
            self.crashed_remaining -= 1;
            return;
        }
        if self.rng.random_f64() < self.p_crash {
            self.crashed_remaining = self.recovery_ticks;
        }
    }
}

/// Scripted failure: explicit offline windows for deterministic tests.
///
/// Each window is a `(start_tick, duration)` pair; the peer is offline for
/// ticks in `[start, start + duration)`. Windows may not overlap.
#[derive(Debug, Clone, Default)]
pub struct ScriptedFailure {
    windows: Vec<(Tick, Tick)>,
    offline_until: Option<Tick>,
    current: Tick,
}

impl ScriptedFailure {
    /// Build a scripted model from `(start_tick, duration)` windows.
    pub fn new(windows: Vec<(Tick, Tick)>) -> Self {
        Self {
            windows,
            offline_until: None,
            current: 0,
        }
    }

    fn advance(&mut self, tick: Tick) {
        self.current = tick;
        self.offline_until = self
            .windows
            .iter()
            .find(|(start, duration)| tick >= *start && tick < start + duration)
            .map(|(start, duration)| start + duration);
    }
}

/// The pluggable failure model owned by each peer.
#[derive(Debug, Clone)]
pub enum FailureModel {
    /// Never fails.
    None,
    /// Probabilistic transport gating with weighted offline durations.
    Network(NetworkFailure),
    /// Probabilistic full stop with a fixed recovery countdown.
    Crash(CrashFailure),
    /// Deterministic offline windows, for tests and replays.
    Scripted(ScriptedFailure),
}

impl FailureModel {
    /// Build the configured model for `uid`.
    pub fn from_config(cfg: &FailureConfig, uid: PeerId, base_seed: u64) -> SimResult<Self> {
        Ok(match cfg.kind {
            FailureKind::None => FailureModel::None,
            FailureKind::Network => {
                FailureModel::Network(NetworkFailure::new(cfg, uid, base_seed)?)
            }
            FailureKind::Crash => FailureModel::Crash(CrashFailure::new(cfg, uid, base_seed)),
        })
    }

    /// Advance failure state by one tick.
    ///
    /// For the network model, [`FailureModel::set_is_leader`] must have
    /// been called with the peer's current belief first.
    pub fn advance(&mut self, tick: Tick) {
        match self {
            FailureModel::None => {}
            FailureModel::Network(model) => model.advance(),
            FailureModel::Crash(model) => model.advance(),
            FailureModel::Scripted(model) => model.advance(tick),
        }
    }

    /// Whether the peer can currently send or receive messages.
    pub fn can_communicate(&self) -> bool {
        match self {
            FailureModel::None => true,
            FailureModel::Network(model) => model.offline_remaining == 0,
            FailureModel::Crash(model) => model.crashed_remaining == 0,
            FailureModel::Scripted(model) => model.offline_until.is_none(),
        }
    }

    /// Ticks left until the peer can communicate again (0 when online).
    pub fn ticks_until_recovery(&self) -> Tick {
        match self {
            FailureModel::None => 0,
            FailureModel::Network(model) => model.offline_remaining,
            FailureModel::Crash(model) => model.crashed_remaining,
            FailureModel::Scripted(model) => model
                .offline_until
                .map_or(0, |until| until - model.current),
        }
    }

    /// Feed the peer's leader belief into the model.
    ///
    /// Only the network model uses it; for the others this is a no-op.
    pub fn set_is_leader(&mut self, is_leader: bool) {
        if let FailureModel::Network(model) = self {
            model.is_leader = is_leader;
        }
    }

    /// Whether the peer is fully crashed (crash model only).
    pub fn is_crashed(&self) -> bool {
        match self {
            FailureModel::Crash(model) => model.crashed_remaining > 0,
            _ => false,
        }
    }

    /// Short name of the model, for logs.
    pub fn type_name(&self) -> &'static str {
        match self {
            FailureModel::None => "none",
            FailureModel::Network(_) => "network",
            FailureModel::Crash(_) => "crash",
            FailureModel::Scripted(_) => "scripted",
        }
    }
}
