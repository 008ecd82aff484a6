use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};

/// Terminal report a worker emits exactly once, on its stdout channel.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub enum WorkerReport {
    Success(WorkerSolution),
    Failed,
    Canceled,
}

/// Best solution a worker found in its assigned range, plus its evaluation
/// counters.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct WorkerSolution {
    pub score: u64,
    /// Notes played while star power was active in the best solution.
    pub deployment_notes: u64,
    pub valid_count: u64,
    pub invalid_count: u64,
    /// Difficulty-relative note indices of the best solution's deployments.
    pub deployments: Vec<u32>,
    /// Unix timestamp (ms) at which the worker finished its range.
    pub completed_at_ms: u64,
}

/// Control message the supervisor may send after the job on the worker's
/// stdin channel.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControlMessage {
    Cancel,
}

/// Writes one protocol message to a byte stream and flushes it.
pub fn write_message<T: Serialize, W: Write>(writer: &mut W, msg: &T) -> bincode::Result<()> {
    bincode::serialize_into(&mut *writer, msg)?;
    writer.flush()?;
    Ok(())
}

/// Reads one protocol message from a byte stream, blocking until it is
/// complete.
pub fn read_message<T: DeserializeOwned, R: Read>(reader: &mut R) -> bincode::Result<T> {
    bincode::deserialize_from(reader)
}
