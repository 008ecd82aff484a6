pub mod engine;

use crate::error::{PathingError, PfResult};
use crate::snapshot::TrackSnapshot;
use pathforge_protocol::track::TrackView;
use strum_macros::Display;

/// Why a candidate solution was rejected. Every variant is recoverable by
/// the search driver; none is a system error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Rejection {
    /// Structural problem with the inputs.
    InvalidParams,
    /// Cached scoring shows the requested deployment note was already
    /// passed inside an earlier deployment.
    CachedUnreachable,
    /// Deploy requested while star power is already in effect.
    AlreadyDeployed,
    /// Deploy requested with less than half a meter.
    InsufficientMeter,
    /// The time-signature context for a note could not be resolved.
    MissingTimeSignature,
}

/// Scoring accumulator. One snapshot of this is cached per completed
/// deployment so later solutions sharing the deployment prefix can resume
/// mid-track.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoringState {
    /// Score multiplier: 1, 2, 3 or 4. Never decreases within one
    /// evaluation.
    pub multiplier: u64,
    pub hit_counter: u64,
    pub score: u64,
    /// Notes played while star power was active.
    pub deployment_notes: u64,
    /// Star power meter, clamped to [0.0, 1.0].
    pub meter: f64,
    /// Companion tally of the meter without the 100% cap, for diagnostics.
    pub meter_uncapped: f64,
}

impl ScoringState {
    fn fresh() -> Self {
        Self {
            multiplier: 1,
            hit_counter: 0,
            score: 0,
            deployment_notes: 0,
            meter: 0.0,
            meter_uncapped: 0.0,
        }
    }
}

/// Scoring state captured at the end of one deployment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CacheEntry {
    pub state: ScoringState,
    /// Note index at which the deployment began.
    pub deploy_start: usize,
    /// First note index after the deployment ended; evaluation resumes here.
    pub resume_note: usize,
}

/// Cache of per-deployment scoring states, indexed by deployment ordinal.
///
/// Entry `k` is valid only while every solution sharing deployments `0..=k`
/// would reproduce it; the evaluator invalidates every entry past the
/// longest prefix match before scoring.
#[derive(Debug, Clone)]
pub struct DeployCache {
    entries: Vec<Option<CacheEntry>>,
}

impl DeployCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: vec![None; capacity],
        }
    }

    pub fn capacity(&self) -> usize {
        self.entries.len()
    }

    pub fn entry(&self, ordinal: usize) -> Option<&CacheEntry> {
        self.entries.get(ordinal).and_then(|e| e.as_ref())
    }

    pub fn store(&mut self, ordinal: usize, entry: CacheEntry) {
        if let Some(slot) = self.entries.get_mut(ordinal) {
            *slot = Some(entry);
        }
    }

    pub fn invalidate_from(&mut self, ordinal: usize) {
        for slot in self.entries.iter_mut().skip(ordinal) {
            *slot = None;
        }
    }

    pub fn invalidate_all(&mut self) {
        self.invalidate_from(0);
    }

    /// Ordinal of the last cache entry matching the solution's deployment
    /// prefix, stopping at the first divergence or hole.
    pub fn matching_prefix(&self, deployments: &[usize]) -> Option<usize> {
        let mut matched = None;
        for (ordinal, &deploy) in deployments.iter().enumerate() {
            match self.entry(ordinal) {
                Some(entry) if entry.deploy_start == deploy => matched = Some(ordinal),
                _ => break,
            }
        }
        matched
    }
}

/// Result of successfully evaluating one solution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Evaluation {
    pub score: u64,
    /// Notes played while star power was active.
    pub deployment_notes: u64,
    /// Meter level after the last note, mostly of interest to tests.
    pub final_meter: f64,
}

/// Evaluates candidate deployment sequences against one immutable track
/// view/snapshot pair.
pub struct Scorer<'a> {
    pub view: &'a TrackView,
    pub snapshot: &'a TrackSnapshot,
}

impl<'a> Scorer<'a> {
    pub fn new(view: &'a TrackView, snapshot: &'a TrackSnapshot) -> PfResult<Self> {
        if snapshot.note_count() != view.note_count() {
            return Err(PathingError::InvalidParams(
                "snapshot and view disagree on note count",
            ));
        }
        if view.beats.is_empty() {
            return Err(PathingError::MissingTimeSignature);
        }
        Ok(Self { view, snapshot })
    }

    /// Scores one solution, resuming from the cache where its deployment
    /// prefix allows. See [`engine::evaluate`].
    pub fn evaluate(
        &self,
        deployments: &[usize],
        cache: &mut DeployCache,
    ) -> Result<Evaluation, Rejection> {
        engine::evaluate(self, deployments, cache)
    }
}
