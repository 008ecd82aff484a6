pub mod bounds;
pub mod runner;

use crate::consts::PROGRESS_POLL_INTERVAL;
use crate::error::{PathingError, PfResult};
use crate::scorer::{DeployCache, Rejection, Scorer};
use crate::snapshot::TrackSnapshot;
use pathforge_protocol::track::TrackView;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use strum_macros::Display;
use tracing::debug;

/// One candidate (or winning) deployment sequence and its evaluation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Solution {
    /// Strictly increasing difficulty-relative note indices.
    pub deployments: Vec<usize>,
    pub score: u64,
    /// Notes played while star power was active.
    pub deployment_notes: u64,
    /// Ordinal of the evaluation that produced this solution, for logs.
    pub solution_number: u64,
}

impl Solution {
    /// Tie-break rule shared by driver and supervisor: strictly higher score
    /// wins; an equal score with fewer notes inside deployments wins.
    pub fn is_improved_by(&self, score: u64, deployment_notes: u64) -> bool {
        score > self.score || (score == self.score && deployment_notes < self.deployment_notes)
    }
}

/// How a search run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum SearchOutcome {
    /// Every solution in the assigned range was visited.
    Exhausted,
    /// A cancellation request was observed mid-search.
    Canceled,
}

/// Broadcast cancellation signal, shared between the caller, the driver and
/// the supervisor. Cloning yields another handle to the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_canceled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

pub trait ProgressCallback {
    /// Called once per [`PROGRESS_POLL_INTERVAL`] evaluated solutions.
    /// Return `false` to cancel the search.
    fn on_progress(&self, tested: u64, first_set: usize, total_sets: usize) -> bool;
}

/// Callback that never cancels and reports nothing.
pub struct SilentProgress;

impl ProgressCallback for SilentProgress {
    fn on_progress(&self, _tested: u64, _first_set: usize, _total_sets: usize) -> bool {
        true
    }
}

/// Running totals for one solve call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SolveCounters {
    pub valid: u64,
    pub invalid: u64,
}

impl SolveCounters {
    pub fn tested(&self) -> u64 {
        self.valid + self.invalid
    }
}

/// Incremental depth-first enumerator over deployment sequences.
///
/// The testing solution is a stack of deployment indices: each iteration
/// either extends it, advances its last index, or pops, and every produced
/// candidate goes through the scoring engine. Rejection codes steer the
/// pruning shortcuts.
pub struct SearchDriver<'a> {
    scorer: Scorer<'a>,
    cache: DeployCache,
    max_deployments: usize,
    cancel: CancelToken,
    /// Pruning shortcuts on by default; tests disable them to compare
    /// against plain exhaustive enumeration.
    pub prune: bool,
}

impl<'a> SearchDriver<'a> {
    pub fn new(
        view: &'a TrackView,
        snapshot: &'a TrackSnapshot,
        max_deployments: usize,
        cancel: CancelToken,
    ) -> PfResult<Self> {
        Ok(Self {
            scorer: Scorer::new(view, snapshot)?,
            cache: DeployCache::new(max_deployments),
            max_deployments,
            cancel,
            prune: true,
        })
    }

    pub fn scorer(&self) -> &Scorer<'a> {
        &self.scorer
    }

    /// Evaluates one fixed solution against a cold cache, outside the
    /// enumeration. Used for the baseline and for cross-checks.
    pub fn evaluate_cold(
        &mut self,
        deployments: &[usize],
    ) -> Result<crate::scorer::Evaluation, Rejection> {
        self.cache.invalidate_all();
        self.scorer.evaluate(deployments, &mut self.cache)
    }

    /// Tests every solution whose first deployment lies in
    /// `[first_deploy, last_deploy]`, folding improvements into `best`.
    pub fn solve(
        &mut self,
        best: &mut Solution,
        first_deploy: usize,
        last_deploy: usize,
        counters: &mut SolveCounters,
        progress: &impl ProgressCallback,
    ) -> PfResult<SearchOutcome> {
        let view = self.scorer.view;
        let note_count = view.note_count();

        if first_deploy >= note_count || self.max_deployments == 0 {
            return Err(PathingError::InvalidParams(
                "first deployment out of range or nothing to deploy",
            ));
        }

        let mut testing: Vec<usize> = Vec::with_capacity(self.max_deployments);
        let mut invalid_increment = false;

        loop {
            let tested = counters.tested();
            if tested % PROGRESS_POLL_INTERVAL == 0 {
                let first_set = testing.first().copied().unwrap_or(first_deploy);
                if self.cancel.is_canceled() || !progress.on_progress(tested, first_set, note_count)
                {
                    return Ok(SearchOutcome::Canceled);
                }
            }

            // Produce the next candidate, unless the rejection handling of
            // the previous iteration already did.
            if !invalid_increment {
                if testing.len() < self.max_deployments {
                    if testing.is_empty() {
                        // The very first candidate: one deployment at the
                        // start of the assigned range.
                        testing.push(first_deploy);
                    } else {
                        let previous = *testing.last().expect("stack is non-empty");
                        let next = self.next_extension(previous);
                        match next.filter(|&n| n < note_count) {
                            Some(n) => testing.push(n),
                            None => {
                                // The last deployment exhausted its notes:
                                // drop it and advance its parent.
                                testing.pop();
                                if testing.is_empty() {
                                    break;
                                }
                                if testing.len() == 1 && testing[0] + 1 > last_deploy {
                                    break;
                                }
                                self.advance_last(&mut testing, note_count)?;
                            }
                        }
                    }
                } else {
                    // Stack full: slide the last deployment forward.
                    let next = *testing.last().expect("stack is non-empty") + 1;
                    if testing.len() == 1 && next > last_deploy {
                        // The assigned range of first-deployment sets is
                        // exhausted.
                        break;
                    }
                    if next < note_count {
                        *testing.last_mut().expect("stack is non-empty") = next;
                    } else {
                        testing.pop();
                        if testing.is_empty() {
                            break;
                        }
                        if testing.len() == 1 && testing[0] + 1 > last_deploy {
                            break;
                        }
                        self.advance_last(&mut testing, note_count)?;
                    }
                }
            }
            invalid_increment = false;

            match self.scorer.evaluate(&testing, &mut self.cache) {
                Ok(eval) => {
                    if best.is_improved_by(eval.score, eval.deployment_notes) {
                        debug!(
                            score = eval.score,
                            deployment_notes = eval.deployment_notes,
                            deployments = ?testing,
                            "new best solution"
                        );
                        best.score = eval.score;
                        best.deployment_notes = eval.deployment_notes;
                        best.deployments.clear();
                        best.deployments.extend_from_slice(&testing);
                        best.solution_number = tested + 1;
                    }
                    counters.valid += 1;
                }
                Err(rejection) => {
                    if self.prune {
                        if let Some(next) = self.rejection_skip(&mut testing, rejection, note_count)
                        {
                            *testing.last_mut().expect("stack is non-empty") = next;
                            invalid_increment = true;
                        }
                    }
                    counters.invalid += 1;
                }
            }
        }

        Ok(SearchOutcome::Exhausted)
    }

    /// Start index for one more deployment after `previous`. With pruning,
    /// the first note with two phrases of meter re-accumulated; without,
    /// simply the next note.
    fn next_extension(&self, previous: usize) -> Option<usize> {
        if self.prune {
            bounds::find_next_deployable(self.scorer.view, self.scorer.snapshot, previous)
        } else {
            Some(previous + 1)
        }
    }

    /// Advances the last stacked deployment one note after a pop. By this
    /// point the popped deployment sat beyond it, so there is room; hitting
    /// the end anyway is an index bookkeeping bug.
    fn advance_last(&self, testing: &mut Vec<usize>, note_count: usize) -> PfResult<()> {
        let next = *testing.last().expect("stack is non-empty") + 1;
        if next >= note_count {
            return Err(PathingError::Logic(
                "cannot advance previous deployment after removing the last".into(),
            ));
        }
        *testing.last_mut().expect("stack is non-empty") = next;
        Ok(())
    }

    /// Where an invalid solution lets the enumeration jump. `None` leaves
    /// the normal increment to run next iteration.
    fn rejection_skip(
        &self,
        testing: &mut [usize],
        rejection: Rejection,
        note_count: usize,
    ) -> Option<usize> {
        let mut next_deploy = None;
        let last = *testing.last().expect("stack is non-empty");

        // An invalid below-capacity prefix cannot be repaired by extending
        // it; advance its last deployment instead.
        if testing.len() < self.max_deployments && testing.len() > 1 && last + 1 < note_count {
            next_deploy = Some(last + 1);
        }

        if rejection == Rejection::CachedUnreachable && testing.len() > 1 {
            // Every placement before the cached deployment end fails the
            // same way.
            if let Some(entry) = self.cache.entry(testing.len() - 2) {
                if entry.resume_note < note_count && entry.resume_note > last {
                    next_deploy = Some(entry.resume_note);
                }
            }
        }

        if rejection == Rejection::InsufficientMeter {
            // No meter: nothing changes until the next star power note.
            match bounds::find_next_sp_note(self.scorer.view, last + 1)
                .filter(|&n| n < note_count)
            {
                Some(n) => next_deploy = Some(n),
                None => {
                    // No star power left anywhere ahead; park the
                    // deployment at the end so the normal increment
                    // backtracks the parent.
                    *testing.last_mut().expect("stack is non-empty") = note_count;
                    next_deploy = None;
                }
            }
        }

        next_deploy
    }
}
