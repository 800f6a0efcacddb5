//! # Bullysim Node
//!
//! The per-peer half of the simulator: the Bully election state machine
//! ([`Peer`]) and the pluggable failure model ([`FailureModel`]) that
//! gates its transport.
//!
//! A [`Peer`] is a plain state transducer: it owns its protocol state,
//! its RNG stream, an outbox of messages to route, and its per-tick event
//! and diagnostic buffers. It never touches another peer directly; the
//! scheduler in `bullysim-runner` drives its phases and moves messages
//! between outboxes and inboxes.

#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]

/// Failure models gating peer communication.
pub mod failure;

/// The Bully election state machine.
pub mod peer;

pub use failure::{CrashFailure, FailureModel, NetworkFailure, ScriptedFailure};
pub use peer::Peer;
