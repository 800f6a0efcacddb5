//! # Bullysim Runner
//!
//! The controller half of the simulator: the message [`Router`] that owns
//! every peer's inbox, the tick [`Scheduler`] that drives all peers
//! through the barrier-ordered phases, the NDJSON [`sink`]s, and the
//! [`Simulation`] façade that wires a configuration into a full run.
//!
//! Determinism is the central property: given the same configuration and
//! seed, a run produces byte-identical output streams. Everything here is
//! single-threaded and iterates peers in UID order, so there is no source
//! of nondeterminism to begin with.

#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]

/// Per-peer inboxes and phase-boundary message routing.
pub mod router;

/// The tick loop: phases, barriers, and the harvest step.
pub mod scheduler;

/// Append-only NDJSON output streams.
pub mod sink;

/// Configuration-to-run wiring.
pub mod simulation;

pub use router::Router;
pub use scheduler::{Scheduler, TickHarvest};
pub use sink::{EventLog, JsonlSink};
pub use simulation::Simulation;
