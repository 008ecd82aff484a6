use crate::chart::{self, ChartSource};
use crate::error::{PathingError, PfResult};
use crate::search::{
    bounds, CancelToken, ProgressCallback, SearchDriver, SearchOutcome, Solution, SolveCounters,
};
use crate::snapshot::TrackSnapshot;
use crate::supervisor::Supervisor;
use itertools::Itertools;
use pathforge_protocol::track::TrackView;
use serde::Serialize;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{info, warn};
use typed_builder::TypedBuilder;

/// Knobs for one search invocation.
#[derive(Debug, Clone, TypedBuilder)]
pub struct SearchOptions {
    /// Number of worker processes to fan out to; 0 searches in-process.
    #[builder(default = 0)]
    pub workers: usize,

    /// Worker executable to spawn. Required when `workers > 0`.
    #[builder(default, setter(strip_option, into))]
    pub worker_exe: Option<PathBuf>,

    /// Pruning shortcuts. Disabled only by tests comparing against plain
    /// exhaustive enumeration.
    #[builder(default = true)]
    pub prune: bool,

    #[builder(default)]
    pub cancel: CancelToken,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Best-effort summary of a completed search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PathSummary {
    pub score: u64,
    /// Score of the zero-deployment baseline, the search floor.
    pub baseline_score: u64,
    pub deployment_notes: u64,
    /// Winning deployment note indices, difficulty-relative.
    pub deployments: Vec<usize>,
    /// Realtime position of each winning deployment note.
    pub deployment_positions_ms: Vec<u64>,
    pub valid_count: u64,
    pub invalid_count: u64,
    pub elapsed: Duration,
    /// Evaluation ordinal that produced the winner, for log correlation.
    pub solution_number: u64,
    pub max_deployments: usize,
}

/// Runs one complete search over a prebuilt track view: baseline, ceiling,
/// enumeration (in-process or fanned out), cache cross-check, summary.
pub fn run_view_search(
    view: &TrackView,
    options: &SearchOptions,
    progress: &impl ProgressCallback,
) -> PfResult<PathSummary> {
    let started = Instant::now();
    let note_count = view.note_count();
    if note_count == 0 {
        return Err(PathingError::InvalidParams(
            "track difficulty has no notes",
        ));
    }
    if !view.beats.first().is_some_and(|b| b.has_ts) {
        return Err(PathingError::MissingTimeSignature);
    }

    let snapshot = TrackSnapshot::build(view)?;
    let max_deployments = bounds::estimate_max_deployments(view, &snapshot);
    if max_deployments == 0 {
        return Err(PathingError::NoDeployments);
    }

    let mut driver = SearchDriver::new(view, &snapshot, max_deployments, options.cancel.clone())?;
    driver.prune = options.prune;

    // The zero-deployment baseline seeds "best": any solution that cannot
    // beat it is not worth keeping.
    let baseline = driver
        .evaluate_cold(&[])
        .map_err(|r| PathingError::Logic(format!("baseline evaluation rejected: {r}")))?;
    let mut best = Solution {
        deployments: Vec::new(),
        score: baseline.score,
        deployment_notes: baseline.deployment_notes,
        solution_number: 0,
    };

    let first_deploy = bounds::find_next_deployable(view, &snapshot, 0)
        .filter(|&first| first < note_count)
        .ok_or(PathingError::NoDeployments)?;

    info!(
        baseline = baseline.score,
        max_deployments, first_deploy, note_count, "starting path search"
    );

    let mut counters = SolveCounters::default();
    let outcome = if options.workers == 0 {
        driver.solve(
            &mut best,
            first_deploy,
            note_count - 1,
            &mut counters,
            progress,
        )?
    } else {
        let worker_exe = options
            .worker_exe
            .clone()
            .ok_or(PathingError::InvalidParams(
                "worker executable required for multi-process search",
            ))?;
        let supervisor = Supervisor::new(
            view,
            &snapshot,
            max_deployments,
            worker_exe,
            options.cancel.clone(),
        );
        supervisor.solve(&mut best, first_deploy, options.workers, &mut counters)?
    };

    let elapsed = started.elapsed();
    if outcome == SearchOutcome::Canceled {
        warn!(
            tested = counters.tested(),
            valid = counters.valid,
            invalid = counters.invalid,
            elapsed_secs = elapsed.as_secs_f64(),
            "search canceled"
        );
        return Err(PathingError::Canceled);
    }

    // Continuous cross-check of the deploy cache: re-scoring the winner from
    // a cold cache must reproduce it exactly.
    let check = driver
        .evaluate_cold(&best.deployments)
        .map_err(|r| PathingError::Logic(format!("winning solution re-evaluation rejected: {r}")))?;
    if check.score != best.score || check.deployment_notes != best.deployment_notes {
        return Err(PathingError::Logic(format!(
            "cache cross-check mismatch: cached {}/{} vs cold {}/{}",
            best.score, best.deployment_notes, check.score, check.deployment_notes
        )));
    }
    if best.deployment_notes == 0 && best.score > baseline.score {
        return Err(PathingError::Logic(
            "best beats the baseline without any deployed notes".into(),
        ));
    }

    let rate = counters.tested() as f64 / elapsed.as_secs_f64().max(f64::MIN_POSITIVE);
    info!(
        tested = counters.tested(),
        valid = counters.valid,
        invalid = counters.invalid,
        elapsed_secs = elapsed.as_secs_f64(),
        rate_per_sec = rate,
        score = best.score,
        "search finished"
    );
    if best.deployment_notes == 0 {
        info!("no notes were playable during a star power deployment");
    } else {
        info!(
            deployments = %best.deployments.iter().join(", "),
            "optimum star power deployment found"
        );
    }

    let deployment_positions_ms = best
        .deployments
        .iter()
        .map(|&d| view.notes[d].pos_ms)
        .collect();

    Ok(PathSummary {
        score: best.score,
        baseline_score: baseline.score,
        deployment_notes: best.deployment_notes,
        deployments: best.deployments,
        deployment_positions_ms,
        valid_count: counters.valid,
        invalid_count: counters.invalid,
        elapsed,
        solution_number: best.solution_number,
        max_deployments,
    })
}

/// Full search against a live chart: brackets the transient flag window,
/// builds the view, searches, then highlights the winning notes behind one
/// undo checkpoint.
pub fn run_search<C: ChartSource + ?Sized>(
    chart: &mut C,
    track: u32,
    diff: u8,
    options: &SearchOptions,
    progress: &impl ProgressCallback,
) -> PfResult<PathSummary> {
    chart::mark_temp_flags(chart, track, diff);

    let result = (|| {
        let view = chart::build_track_view(chart, track, diff)?;
        let summary = run_view_search(&view, options, progress)?;
        if summary.deployment_notes > 0 {
            chart::apply_highlights(chart, &view, &summary.deployments)?;
        }
        Ok(summary)
    })();

    // The flag window closes no matter how the search ended.
    chart::clear_temp_flags(chart, track);
    result
}
