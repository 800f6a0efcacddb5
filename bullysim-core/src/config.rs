//! Configuration records and JSON loading.
//!
//! The configuration file is a JSON object with four optional sections:
//!
//! ```json
//! {
//!   "simulation": { "num_ticks": 50, "seed": 12345 },
//!   "node":       { "hb_period_ticks": 1, "hb_timeout_ticks": 3,
//!                   "election_timeout_ticks": 3, "p_send": 0.3,
//!                   "p_drop": 0.0, "max_recv_per_tick": 64 },
//!   "failure":    { "type": "network", "p_fail": 0.02,
//!                   "leader_fail_multiplier": 2.0,
//!                   "offline_durations": [1, 2, 3, 5],
//!                   "offline_weights": [70, 20, 7, 3] },
//!   "logging":    { "state_log_file": "state_log.jsonl",
//!                   "message_log_file": "message_log.jsonl",
//!                   "debug_log_file": "debug_log.jsonl",
//!                   "verbose": true }
//! }
//! ```
//!
//! Every key is optional and falls back to the defaults above. A missing or
//! malformed file is a warning, not an error: the simulator runs with
//! defaults so experiment scripts never fail on configuration typos.
//!
//! For backward compatibility with older experiment files, the four
//! network-failure parameters are also accepted under the `node` section
//! when no `failure` section is present.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::warn;

use crate::types::Tick;

/// Protocol and traffic parameters shared by every peer.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeConfig {
    /// The leader broadcasts a heartbeat every this many ticks.
    pub hb_period_ticks: Tick,
    /// A follower declares the leader lost after this many ticks without
    /// an accepted heartbeat.
    pub hb_timeout_ticks: Tick,
    /// Election victory / coordinator-wait timeout. Values below 3 cannot
    /// accommodate the ELECTION → OK → COORDINATOR round trip.
    pub election_timeout_ticks: Tick,
    /// Per-tick probability of emitting a background ping.
    pub p_send: f64,
    /// Per-message transport drop probability.
    pub p_drop: f64,
    /// Upper bound on messages drained from the inbox per tick.
    pub max_recv_per_tick: usize,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            hb_period_ticks: 1,
            hb_timeout_ticks: 3,
            election_timeout_ticks: 3,
            p_send: 0.30,
            p_drop: 0.0,
            max_recv_per_tick: 64,
        }
    }
}

/// Which failure model the peers run under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Peers never fail.
    None,
    /// Transport gating with weighted offline durations.
    Network,
    /// Full stop with a fixed recovery countdown.
    Crash,
}

/// Failure model parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct FailureConfig {
    /// Selected failure model.
    pub kind: FailureKind,
    /// Per-tick failure probability (network model).
    pub p_fail: f64,
    /// Scales `p_fail` for the peer that believes itself leader.
    pub leader_fail_multiplier: f64,
    /// Candidate offline durations, in ticks (network model).
    pub offline_durations: Vec<Tick>,
    /// Weights of the categorical over `offline_durations`; same length.
    pub offline_weights: Vec<u32>,
    /// Per-tick crash probability (crash model).
    pub p_crash: f64,
    /// Ticks a crashed peer stays down (crash model).
    pub recovery_ticks: Tick,
}

impl Default for FailureConfig {
    fn default() -> Self {
        Self {
            kind: FailureKind::Network,
            p_fail: 0.02,
            leader_fail_multiplier: 2.0,
            offline_durations: vec![1, 2, 3, 5],
            offline_weights: vec![70, 20, 7, 3],
            p_crash: 0.02,
            recovery_ticks: 3,
        }
    }
}

/// Output stream destinations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Path of the per-tick state stream.
    pub state_log_file: PathBuf,
    /// Path of the message event stream.
    pub message_log_file: PathBuf,
    /// Path of the diagnostic stream.
    pub debug_log_file: PathBuf,
    /// Whether peers' diagnostic lines are also traced as they occur.
    pub verbose: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            state_log_file: PathBuf::from("state_log.jsonl"),
            message_log_file: PathBuf::from("message_log.jsonl"),
            debug_log_file: PathBuf::from("debug_log.jsonl"),
            verbose: true,
        }
    }
}

/// Top-level simulation configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct SimConfig {
    /// Total ticks to run.
    pub num_ticks: Tick,
    /// Base seed for every RNG stream in the run.
    pub seed: u64,
    /// Per-peer protocol parameters.
    pub node: NodeConfig,
    /// Failure model parameters.
    pub failure: FailureConfig,
    /// Output stream destinations.
    pub logging: LoggingConfig,
}

impl SimConfig {
    /// The defaults used when no configuration file is available.
    pub fn defaults() -> Self {
        Self {
            num_ticks: 50,
            seed: 12345,
            node: NodeConfig::default(),
            failure: FailureConfig::default(),
            logging: LoggingConfig::default(),
        }
    }

    /// Load a configuration file, falling back to defaults.
    ///
    /// A missing file or a parse failure logs a warning and returns
    /// [`SimConfig::defaults`]; it never fails.
    pub fn load(path: &Path) -> Self {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) => {
                warn!(path = %path.display(), %err, "could not read config file, using defaults");
                return Self::defaults();
            }
        };
        match Self::from_json(&text) {
            Ok(config) => config,
            Err(err) => {
                warn!(path = %path.display(), %err, "could not parse config file, using defaults");
                Self::defaults()
            }
        }
    }

    /// Parse a configuration from JSON text.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        let raw: RawConfig = serde_json::from_str(text)?;
        Ok(Self::from_raw(raw))
    }

    fn from_raw(raw: RawConfig) -> Self {
        let mut config = Self::defaults();

        if let Some(num_ticks) = raw.simulation.num_ticks {
            config.num_ticks = num_ticks;
        }
        if let Some(seed) = raw.simulation.seed {
            config.seed = seed;
        }

        let node = &raw.node;
        if let Some(v) = node.hb_period_ticks {
            config.node.hb_period_ticks = v;
        }
        if let Some(v) = node.hb_timeout_ticks {
            config.node.hb_timeout_ticks = v;
        }
        if let Some(v) = node.election_timeout_ticks {
            config.node.election_timeout_ticks = v;
        }
        if let Some(v) = node.p_send {
            config.node.p_send = v;
        }
        if let Some(v) = node.p_drop {
            config.node.p_drop = v;
        }
        if let Some(v) = node.max_recv_per_tick {
            config.node.max_recv_per_tick = v;
        }

        if let Some(failure) = raw.failure {
            if let Some(kind) = failure.kind {
                match kind.as_str() {
                    "none" => config.failure.kind = FailureKind::None,
                    "network" => config.failure.kind = FailureKind::Network,
                    "crash" => config.failure.kind = FailureKind::Crash,
                    other => {
                        warn!(kind = other, "unknown failure type, keeping default")
                    }
                }
            }
            if let Some(v) = failure.p_fail {
                config.failure.p_fail = v;
            }
            if let Some(v) = failure.leader_fail_multiplier {
                config.failure.leader_fail_multiplier = v;
            }
            if let Some(v) = failure.offline_durations {
                config.failure.offline_durations = v;
            }
            if let Some(v) = failure.offline_weights {
                config.failure.offline_weights = v;
            }
            if let Some(v) = failure.p_crash {
                config.failure.p_crash = v;
            }
            if let Some(v) = failure.recovery_ticks {
                config.failure.recovery_ticks = v;
            }
        } else {
            // Legacy layout: failure parameters lived in the node section.
            if let Some(v) = node.p_fail {
                config.failure.p_fail = v;
            }
            if let Some(v) = node.leader_fail_multiplier {
                config.failure.leader_fail_multiplier = v;
            }
            if let Some(v) = node.offline_durations.clone() {
                config.failure.offline_durations = v;
            }
            if let Some(v) = node.offline_weights.clone() {
                config.failure.offline_weights = v;
            }
        }

        let logging = &raw.logging;
        if let Some(v) = &logging.state_log_file {
            config.logging.state_log_file = PathBuf::from(v);
        }
        if let Some(v) = &logging.message_log_file {
            config.logging.message_log_file = PathBuf::from(v);
        }
        if let Some(v) = &logging.debug_log_file {
            config.logging.debug_log_file = PathBuf::from(v);
        }
        if let Some(v) = logging.verbose {
            config.logging.verbose = v;
        }

        config
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawConfig {
    simulation: RawSimulation,
    node: RawNode,
    failure: Option<RawFailure>,
    logging: RawLogging,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawSimulation {
    num_ticks: Option<Tick>,
    seed: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawNode {
    hb_period_ticks: Option<Tick>,
    hb_timeout_ticks: Option<Tick>,
    election_timeout_ticks: Option<Tick>,
    p_send: Option<f64>,
    p_drop: Option<f64>,
    max_recv_per_tick: Option<usize>,
    // Legacy failure parameters, honoured when no `failure` section exists.
    p_fail: Option<f64>,
    leader_fail_multiplier: Option<f64>,
    offline_durations: Option<Vec<Tick>>,
    offline_weights: Option<Vec<u32>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawFailure {
    #[serde(rename = "type")]
    kind: Option<String>,
    p_fail: Option<f64>,
    leader_fail_multiplier: Option<f64>,
    offline_durations: Option<Vec<Tick>>,
    offline_weights: Option<Vec<u32>>,
    p_crash: Option<f64>,
    recovery_ticks: Option<Tick>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawLogging {
    state_log_file: Option<String>,
    message_log_file: Option<String>,
    debug_log_file: Option<String>,
    verbose: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_yields_defaults() {
        let config = SimConfig::from_json("{}").expect("parse");
        assert_eq!(config, SimConfig::defaults());
    }

    #[test]
    fn sections_override_defaults() {
        let config = SimConfig::from_json(
            r#"{
                "simulation": { "num_ticks": 200, "seed": 99 },
                "node": { "hb_timeout_ticks": 5, "p_drop": 0.1 },
                "failure": { "type": "crash", "p_crash": 0.5, "recovery_ticks": 7 },
                "logging": { "state_log_file": "out/state.jsonl", "verbose": false }
            }"#,
        )
        .expect("parse");

        assert_eq!(config.num_ticks, 200);
        assert_eq!(config.seed, 99);
        assert_eq!(config.node.hb_timeout_ticks, 5);
        assert_eq!(config.node.p_drop, 0.1);
        assert_eq!(config.node.hb_period_ticks, 1);
        assert_eq!(config.failure.kind, FailureKind::Crash);
        assert_eq!(config.failure.p_crash, 0.5);
        assert_eq!(config.failure.recovery_ticks, 7);
        assert_eq!(
            config.logging.state_log_file,
            PathBuf::from("out/state.jsonl")
        );
        assert!(!config.logging.verbose);
    }

    #[test]
    fn failure_kind_strings_parse() {
        for (text, kind) in [
            ("none", FailureKind::None),
            ("network", FailureKind::Network),
            ("crash", FailureKind::Crash),
        ] {
            let json = format!(r#"{{ "failure": {{ "type": "{text}" }} }}"#);
            let config = SimConfig::from_json(&json).expect("parse");
            assert_eq!(config.failure.kind, kind);
        }
    }

    #[test]
    fn legacy_node_section_failure_params() {
        let config = SimConfig::from_json(
            r#"{
                "node": {
                    "p_fail": 0.25,
                    "leader_fail_multiplier": 4.0,
                    "offline_durations": [2, 8],
                    "offline_weights": [90, 10]
                }
            }"#,
        )
        .expect("parse");

        assert_eq!(config.failure.p_fail, 0.25);
        assert_eq!(config.failure.leader_fail_multiplier, 4.0);
        assert_eq!(config.failure.offline_durations, vec![2, 8]);
        assert_eq!(config.failure.offline_weights, vec![90, 10]);
    }

    #[test]
    fn failure_section_wins_over_legacy_params() {
        let config = SimConfig::from_json(
            r#"{
                "node": { "p_fail": 0.9 },
                "failure": { "p_fail": 0.1 }
            }"#,
        )
        .expect("parse");
        assert_eq!(config.failure.p_fail, 0.1);
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(SimConfig::from_json("{ not json").is_err());
    }

    #[test]
    fn load_missing_file_falls_back_to_defaults() {
        let config = SimConfig::load(Path::new("/nonexistent/bullysim-config.json"));
        assert_eq!(config, SimConfig::defaults());
    }
}
