use pathforge_core::error::{PathingError, PfResult};
use pathforge_core::search::{
    CancelToken, ProgressCallback, SearchDriver, SearchOutcome, Solution, SolveCounters,
};
use pathforge_core::snapshot::TrackSnapshot;
use pathforge_protocol::job::WorkerJob;
use pathforge_protocol::protocol::{
    read_message, write_message, ControlMessage, WorkerReport, WorkerSolution,
};
use std::io::{self, Write};
use std::thread;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{info, warn};

struct WorkerProgress;

impl ProgressCallback for WorkerProgress {
    fn on_progress(&self, tested: u64, first_set: usize, total_sets: usize) -> bool {
        // Keep stderr quiet on the hot path; one line every 100k solutions.
        if tested % 100_000 == 0 && tested > 0 {
            info!(tested, first_set, total_sets, "still searching");
        }
        true
    }
}

/// Runs one job: read it from stdin, listen for a cancel message behind it,
/// solve the assigned range, emit the terminal report on stdout.
pub fn run() -> PfResult<()> {
    let job: WorkerJob = read_message(&mut io::stdin().lock())?;
    info!(
        digest = %job.digest(),
        chart = %job.chart_ref,
        track = job.track,
        diff = job.diff,
        first = job.first_deploy,
        last = job.last_deploy,
        "received job"
    );

    if job.measure_positions.len() != job.view.note_count() {
        return Err(PathingError::InvalidParams(
            "job snapshot does not match its view",
        ));
    }

    let cancel = CancelToken::new();
    spawn_cancel_listener(cancel.clone());

    let snapshot = TrackSnapshot::from_arrays(job.measure_positions, job.beat_lengths)?;
    let mut driver = SearchDriver::new(
        &job.view,
        &snapshot,
        job.max_deployments as usize,
        cancel,
    )?;

    // Unlike the top-level search, a worker's best starts empty; the
    // supervisor seeds its own best with the baseline and merges.
    let mut best = Solution::default();
    let mut counters = SolveCounters::default();
    let outcome = driver.solve(
        &mut best,
        job.first_deploy as usize,
        job.last_deploy as usize,
        &mut counters,
        &WorkerProgress,
    )?;

    let report = match outcome {
        SearchOutcome::Canceled => WorkerReport::Canceled,
        SearchOutcome::Exhausted => WorkerReport::Success(WorkerSolution {
            score: best.score,
            deployment_notes: best.deployment_notes,
            valid_count: counters.valid,
            invalid_count: counters.invalid,
            deployments: best.deployments.iter().map(|&d| d as u32).collect(),
            completed_at_ms: unix_ms(),
        }),
    };

    info!(
        valid = counters.valid,
        invalid = counters.invalid,
        score = best.score,
        outcome = %outcome,
        "job finished"
    );
    write_message(&mut io::stdout().lock(), &report)?;
    Ok(())
}

/// Emits the failure report on a best-effort basis before an abnormal exit.
pub fn report_failure() {
    let mut stdout = io::stdout().lock();
    if write_message(&mut stdout, &WorkerReport::Failed).is_err() {
        // Nothing left to do; the supervisor will see the exit status.
    }
    let _ = stdout.flush();
}

/// Watches stdin for a cancel message after the job. The pipe closing
/// without one simply ends the listener.
fn spawn_cancel_listener(cancel: CancelToken) {
    thread::spawn(move || {
        let mut stdin = io::stdin().lock();
        match read_message::<ControlMessage, _>(&mut stdin) {
            Ok(ControlMessage::Cancel) => {
                warn!("cancel requested by supervisor");
                cancel.cancel();
            }
            Err(_) => {}
        }
    });
}

fn unix_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
