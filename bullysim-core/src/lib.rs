//! # Bullysim Core
//!
//! Leaf types and pure functions shared by every crate in the workspace:
//! peer identifiers, wire messages, harvested reports and events,
//! deterministic per-peer random number streams, configuration loading,
//! and the common error type.
//!
//! Nothing in this crate performs I/O besides [`SimConfig::load`], and
//! nothing here depends on the protocol or the scheduler; it is the
//! bottom of the dependency graph.

#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]

/// Configuration records and JSON loading.
pub mod config;

/// Common error type for simulator operations.
pub mod error;

/// Deterministic random number generation.
pub mod rng;

/// Wire messages, reports, and event records.
pub mod types;

pub use config::{
    FailureConfig, FailureKind, LoggingConfig, NodeConfig, SimConfig,
};
pub use error::{SimError, SimResult};
pub use rng::{mix_seed, DeterministicRng};
pub use types::{
    DebugEntry, Direction, Envelope, EventBuffer, Message, MessageEvent, MsgKind, PeerId,
    StateReport, Tick, BROADCAST, MAX_MSG_EVENTS_PER_TICK,
};
