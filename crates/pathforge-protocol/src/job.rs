use crate::track::TrackView;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// One unit of work handed to a worker process: evaluate every solution
/// whose first deployment falls in `[first_deploy, last_deploy]`.
///
/// The job is self-contained. The snapshot arrays are shipped precomputed so
/// every worker scores against bit-identical floats, and the view carries
/// everything else the engine reads.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct WorkerJob {
    /// Chart provenance, for logs only; workers never open it.
    pub chart_ref: String,
    /// Ceiling on deployments per solution, sized from the track's total
    /// obtainable star power.
    pub max_deployments: u32,
    /// Measure position of each note in the target difficulty.
    pub measure_positions: Vec<f64>,
    /// Beat length of each note in the target difficulty.
    pub beat_lengths: Vec<f64>,
    pub track: u32,
    pub diff: u8,
    /// First first-deployment index this worker owns (inclusive).
    pub first_deploy: u32,
    /// Last first-deployment index this worker owns (inclusive).
    pub last_deploy: u32,
    pub view: TrackView,
}

impl WorkerJob {
    /// Deterministic digest of the search landscape this job describes.
    /// Used to correlate supervisor and worker log lines, never for
    /// dispatch decisions.
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        let bytes = bincode::serialize(self).unwrap_or_default();
        hasher.update(&bytes);
        let result = hasher.finalize();
        hex::encode(&result[..8])
    }
}
