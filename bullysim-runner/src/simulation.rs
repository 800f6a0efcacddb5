//! Configuration-to-run wiring.
//!
//! [`Simulation`] assembles peers, failure models, the scheduler, and the
//! output sinks from a [`SimConfig`], then runs the tick loop to
//! completion. Sinks are opened before anything else so a bad output path
//! aborts before tick zero.

use bullysim_core::{PeerId, SimConfig, SimError, SimResult};
use bullysim_node::{FailureModel, Peer};
use tracing::{debug, info};

use crate::scheduler::Scheduler;
use crate::sink::EventLog;

/// A fully wired simulation run.
#[derive(Debug)]
pub struct Simulation {
    scheduler: Scheduler,
    log: EventLog,
    num_peers: u32,
    num_ticks: bullysim_core::Tick,
    seed: u64,
    verbose: bool,
}

impl Simulation {
    /// Wire up a run of `num_peers` peers under `config`.
    ///
    /// Opens the three sinks (fatal on failure) and builds one peer and
    /// one failure model per UID.
    pub fn new(num_peers: u32, config: SimConfig) -> SimResult<Self> {
        if num_peers == 0 {
            return Err(SimError::InvalidConfig(
                "a simulation needs at least one peer".into(),
            ));
        }

        let log = EventLog::open(&config.logging)?;

        let peers: Vec<Peer> = (1..=num_peers)
            .map(|uid| {
                Peer::new(
                    PeerId::new(uid),
                    num_peers,
                    config.node.clone(),
                    config.seed,
                )
            })
            .collect();
        let failures: Vec<FailureModel> = (1..=num_peers)
            .map(|uid| FailureModel::from_config(&config.failure, PeerId::new(uid), config.seed))
            .collect::<SimResult<_>>()?;

        info!(
            num_peers,
            num_ticks = config.num_ticks,
            seed = config.seed,
            failure = failures
                .first()
                .map(FailureModel::type_name)
                .unwrap_or("none"),
            "simulation configured"
        );

        Ok(Self {
            scheduler: Scheduler::new(peers, failures),
            log,
            num_peers,
            num_ticks: config.num_ticks,
            seed: config.seed,
            verbose: config.logging.verbose,
        })
    }

    /// Run every tick and stream the harvests into the sinks.
    pub fn run(mut self) -> SimResult<()> {
        self.log
            .write_metadata(self.num_peers, self.num_ticks, self.seed)?;

        for _ in 0..self.num_ticks {
            let harvest = self.scheduler.run_tick();
            if self.verbose {
                for entry in &harvest.debug {
                    debug!(tick = entry.tick, uid = %entry.uid, "{}", entry.msg);
                }
            }
            self.log.write_harvest(&harvest)?;
        }

        info!(ticks = self.num_ticks, "simulation complete");
        Ok(())
    }
}
