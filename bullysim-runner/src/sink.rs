//! Append-only NDJSON output streams.
//!
//! Three streams leave the simulator, one JSON object per line:
//!
//! - **state**: a metadata line, then one line per tick with every
//!   peer's snapshot.
//! - **messages**: one line per recorded send/receive event.
//! - **debug**: one line per diagnostic emitted by a peer.
//!
//! Failing to open a sink is fatal before the first tick; everything else
//! about logging is best-effort and flushed once per tick so partial runs
//! remain inspectable.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use bullysim_core::{config::LoggingConfig, SimError, SimResult, StateReport, Tick};
use serde::Serialize;

use crate::scheduler::TickHarvest;

/// A buffered writer producing one JSON object per line.
#[derive(Debug)]
pub struct JsonlSink {
    writer: BufWriter<File>,
}

impl JsonlSink {
    /// Create (truncating) the sink at `path`.
    pub fn create(path: &Path) -> SimResult<Self> {
        let file = File::create(path).map_err(|err| SimError::SinkOpen {
            path: path.display().to_string(),
            reason: err.to_string(),
        })?;
        Ok(Self {
            writer: BufWriter::new(file),
        })
    }

    /// Serialize `value` as one line.
    pub fn write_line<T: Serialize>(&mut self, value: &T) -> SimResult<()> {
        serde_json::to_writer(&mut self.writer, value)
            .map_err(|err| SimError::Io(err.to_string()))?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }

    /// Flush buffered lines to disk.
    pub fn flush(&mut self) -> SimResult<()> {
        self.writer.flush()?;
        Ok(())
    }
}

/// First line of the state stream.
#[derive(Debug, Serialize)]
struct MetadataLine {
    metadata: bool,
    num_nodes: u32,
    num_ticks: Tick,
    seed: u64,
}

/// One per-tick line of the state stream.
#[derive(Debug, Serialize)]
struct StateLine<'a> {
    tick: Tick,
    nodes: &'a [StateReport],
}

/// The three output streams of a run.
#[derive(Debug)]
pub struct EventLog {
    state: JsonlSink,
    messages: JsonlSink,
    debug: JsonlSink,
}

impl EventLog {
    /// Open all three sinks; any failure aborts the run before tick zero.
    pub fn open(cfg: &LoggingConfig) -> SimResult<Self> {
        Ok(Self {
            state: JsonlSink::create(&cfg.state_log_file)?,
            messages: JsonlSink::create(&cfg.message_log_file)?,
            debug: JsonlSink::create(&cfg.debug_log_file)?,
        })
    }

    /// Write the metadata header on the state stream.
    pub fn write_metadata(&mut self, num_nodes: u32, num_ticks: Tick, seed: u64) -> SimResult<()> {
        self.state.write_line(&MetadataLine {
            metadata: true,
            num_nodes,
            num_ticks,
            seed,
        })?;
        self.state.flush()
    }

    /// Append one tick's harvest across all three streams.
    pub fn write_harvest(&mut self, harvest: &TickHarvest) -> SimResult<()> {
        self.state.write_line(&StateLine {
            tick: harvest.tick,
            nodes: &harvest.states,
        })?;
        for peer_events in &harvest.events {
            for event in peer_events {
                self.messages.write_line(event)?;
            }
        }
        for entry in &harvest.debug {
            self.debug.write_line(entry)?;
        }
        self.state.flush()?;
        self.messages.flush()?;
        self.debug.flush()
    }
}
