//! Shared harness for the integration suites.

#![allow(dead_code)]

use bullysim_core::{
    config::NodeConfig, Direction, MessageEvent, MsgKind, PeerId, StateReport,
};
use bullysim_node::{FailureModel, Peer};
use bullysim_runner::{Scheduler, TickHarvest};

/// Protocol defaults with background traffic and wire loss disabled, so
/// tick arithmetic in the scenarios is exact.
pub fn quiet_config() -> NodeConfig {
    NodeConfig {
        p_send: 0.0,
        p_drop: 0.0,
        ..NodeConfig::default()
    }
}

/// Build a scheduler over `num_peers` peers with explicit failure models.
pub fn scheduler_with(
    num_peers: u32,
    cfg: NodeConfig,
    seed: u64,
    failures: Vec<FailureModel>,
) -> Scheduler {
    assert_eq!(failures.len(), num_peers as usize);
    let peers = (1..=num_peers)
        .map(|uid| Peer::new(PeerId::new(uid), num_peers, cfg.clone(), seed))
        .collect();
    Scheduler::new(peers, failures)
}

/// A failure-free cluster.
pub fn healthy_scheduler(num_peers: u32, cfg: NodeConfig, seed: u64) -> Scheduler {
    let failures = (0..num_peers).map(|_| FailureModel::None).collect();
    scheduler_with(num_peers, cfg, seed, failures)
}

/// Run `ticks` ticks and collect every harvest.
pub fn run_ticks(scheduler: &mut Scheduler, ticks: usize) -> Vec<TickHarvest> {
    (0..ticks).map(|_| scheduler.run_tick()).collect()
}

/// All send events of `kind` in one harvest, flattened in UID order.
pub fn sends_of(harvest: &TickHarvest, kind: MsgKind) -> Vec<MessageEvent> {
    harvest
        .events
        .iter()
        .flatten()
        .filter(|event| event.dir == Direction::Send && event.kind == kind)
        .copied()
        .collect()
}

/// All send events of `kind` across a whole run.
pub fn all_sends_of(harvests: &[TickHarvest], kind: MsgKind) -> Vec<MessageEvent> {
    harvests
        .iter()
        .flat_map(|harvest| sends_of(harvest, kind))
        .collect()
}

/// One peer's state snapshot in a harvest.
pub fn state_of(harvest: &TickHarvest, uid: u32) -> StateReport {
    harvest.states[(uid - 1) as usize]
}

/// Canonical string form of a run, for byte-level comparison.
pub fn fingerprint(harvests: &[TickHarvest]) -> String {
    harvests
        .iter()
        .map(|harvest| {
            serde_json::to_string(&(
                harvest.tick,
                &harvest.states,
                &harvest.events,
                &harvest.debug,
            ))
            .expect("serialize harvest")
        })
        .collect::<Vec<_>>()
        .join("\n")
}
