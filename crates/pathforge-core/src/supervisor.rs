use crate::consts::SUPERVISOR_POLL_MS;
use crate::error::{PathingError, PfResult};
use crate::search::{CancelToken, SearchOutcome, Solution, SolveCounters};
use crate::snapshot::TrackSnapshot;
use pathforge_protocol::job::WorkerJob;
use pathforge_protocol::protocol::{read_message, write_message, ControlMessage, WorkerReport, WorkerSolution};
use pathforge_protocol::track::TrackView;
use std::io::Read;
use std::path::PathBuf;
use std::process::{Child, ChildStdin, Command, Stdio};
use std::time::Duration;
use strum_macros::Display;
use tracing::{error, info, warn};

/// Lifecycle of one worker slot. Transitions happen only on poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum WorkerStatus {
    Idle,
    Running,
    Failed,
}

struct WorkerSlot {
    status: WorkerStatus,
    child: Option<Child>,
    stdin: Option<ChildStdin>,
    first_deploy: usize,
    last_deploy: usize,
}

impl WorkerSlot {
    fn idle() -> Self {
        Self {
            status: WorkerStatus::Idle,
            child: None,
            stdin: None,
            first_deploy: 0,
            last_deploy: 0,
        }
    }
}

/// Folds a worker's reported solution into the running best under the shared
/// tie-break rule. Commutative across reports, so arrival order of workers
/// never changes the final winner.
pub fn merge_solution(best: &mut Solution, reported: &WorkerSolution) {
    if best.is_improved_by(reported.score, reported.deployment_notes) {
        best.score = reported.score;
        best.deployment_notes = reported.deployment_notes;
        best.deployments = reported.deployments.iter().map(|&d| d as usize).collect();
    }
}

/// Coordinates N worker processes over the first-deployment index space.
///
/// Each worker owns one contiguous `[first, last]` range of first-deployment
/// sets; the job travels down the child's stdin, the terminal report comes
/// back on its stdout, and a cancel message on stdin is the broadcast
/// cancellation signal. A slot's stdio is touched by no one else, so no
/// locking is needed anywhere.
pub struct Supervisor<'a> {
    view: &'a TrackView,
    snapshot: &'a TrackSnapshot,
    max_deployments: usize,
    worker_exe: PathBuf,
    cancel: CancelToken,
}

impl<'a> Supervisor<'a> {
    pub fn new(
        view: &'a TrackView,
        snapshot: &'a TrackSnapshot,
        max_deployments: usize,
        worker_exe: PathBuf,
        cancel: CancelToken,
    ) -> Self {
        Self {
            view,
            snapshot,
            max_deployments,
            worker_exe,
            cancel,
        }
    }

    /// Dispatch/poll loop. Returns once every assigned range has drained,
    /// or after a failure or cancellation has drained the in-flight workers.
    pub fn solve(
        &self,
        best: &mut Solution,
        first_deploy: usize,
        worker_count: usize,
        counters: &mut SolveCounters,
    ) -> PfResult<SearchOutcome> {
        if worker_count == 0 {
            return Err(PathingError::InvalidParams("worker count must be nonzero"));
        }
        let note_count = self.view.note_count();
        if first_deploy >= note_count {
            return Err(PathingError::InvalidParams(
                "first deployment out of range",
            ));
        }

        let mut slots: Vec<WorkerSlot> = (0..worker_count).map(|_| WorkerSlot::idle()).collect();
        let mut next_set = first_deploy;
        // Solution counts of the first and the most recently completed
        // worker, driving the adaptive range ramp.
        let mut first_count: u64 = 0;
        let mut last_count: u64 = 0;

        let mut failure: Option<String> = None;
        let mut canceled = false;
        let mut cancel_sent = false;

        loop {
            let mut status_change = false;
            let mut running = 0usize;

            for slot_id in 0..slots.len() {
                match slots[slot_id].status {
                    WorkerStatus::Idle => {
                        if failure.is_none() && !canceled && next_set < note_count {
                            // Ranges stay one set wide until two workers have
                            // finished; afterwards they grow by the ratio of
                            // the first worker's solution count to the most
                            // recent one's, keeping wall time per worker
                            // roughly level as the sets shrink.
                            let span = if first_count > 0 && last_count > 0 {
                                1 + (first_count / last_count.max(1)) as usize
                            } else {
                                1
                            };
                            let last_set = (next_set + span - 1).min(note_count - 1);

                            match self.dispatch(slot_id, next_set, last_set) {
                                Ok(slot) => {
                                    info!(
                                        worker = slot_id,
                                        first = next_set,
                                        last = last_set,
                                        "dispatched worker"
                                    );
                                    slots[slot_id] = slot;
                                    next_set = last_set + 1;
                                    running += 1;
                                    status_change = true;
                                }
                                Err(e) => {
                                    error!(worker = slot_id, "failed to launch worker: {e}");
                                    failure = Some(format!("failed to launch worker: {e}"));
                                }
                            }
                        }
                    }
                    WorkerStatus::Running => {
                        running += 1;
                        let exited = match slots[slot_id]
                            .child
                            .as_mut()
                            .expect("running slot has a child")
                            .try_wait()
                        {
                            Ok(status) => status,
                            Err(e) => {
                                error!(worker = slot_id, "failed to poll worker: {e}");
                                failure = Some(format!("failed to poll worker: {e}"));
                                slots[slot_id].status = WorkerStatus::Failed;
                                status_change = true;
                                continue;
                            }
                        };

                        if let Some(exit) = exited {
                            running -= 1;
                            status_change = true;
                            match self.collect(slot_id, &mut slots[slot_id]) {
                                Ok(WorkerReport::Success(solution)) => {
                                    counters.valid += solution.valid_count;
                                    counters.invalid += solution.invalid_count;
                                    let processed =
                                        solution.valid_count + solution.invalid_count;
                                    if first_count == 0 {
                                        first_count = processed;
                                    } else {
                                        last_count = processed;
                                    }
                                    info!(
                                        worker = slot_id,
                                        first = slots[slot_id].first_deploy,
                                        last = slots[slot_id].last_deploy,
                                        score = solution.score,
                                        processed,
                                        "worker completed"
                                    );
                                    merge_solution(best, &solution);
                                    slots[slot_id].status = WorkerStatus::Idle;
                                }
                                Ok(WorkerReport::Canceled) => {
                                    warn!(worker = slot_id, "worker canceled");
                                    canceled = true;
                                    slots[slot_id].status = WorkerStatus::Idle;
                                }
                                Ok(WorkerReport::Failed) => {
                                    error!(worker = slot_id, exit = ?exit, "worker failed");
                                    failure = Some(format!("worker {slot_id} reported failure"));
                                    slots[slot_id].status = WorkerStatus::Failed;
                                }
                                Err(e) => {
                                    error!(
                                        worker = slot_id,
                                        exit = ?exit,
                                        "worker report unreadable: {e}"
                                    );
                                    failure =
                                        Some(format!("worker {slot_id} report unreadable: {e}"));
                                    slots[slot_id].status = WorkerStatus::Failed;
                                }
                            }
                        }
                    }
                    WorkerStatus::Failed => {}
                }
            }

            if self.cancel.is_canceled() {
                canceled = true;
            }
            if (canceled || failure.is_some()) && !cancel_sent {
                self.broadcast_cancel(&mut slots);
                cancel_sent = true;
            }

            if running == 0 {
                if failure.is_none() && !canceled && next_set >= note_count {
                    break;
                }
                if failure.is_some() || canceled {
                    // Nothing left in flight to drain.
                    break;
                }
            }

            if !status_change {
                std::thread::sleep(Duration::from_millis(SUPERVISOR_POLL_MS));
            }
        }

        if let Some(reason) = failure {
            return Err(PathingError::Worker(reason));
        }
        if canceled {
            return Ok(SearchOutcome::Canceled);
        }
        Ok(SearchOutcome::Exhausted)
    }

    fn dispatch(&self, slot_id: usize, first: usize, last: usize) -> PfResult<WorkerSlot> {
        let job = WorkerJob {
            chart_ref: self.view.chart_ref.clone(),
            max_deployments: self.max_deployments as u32,
            measure_positions: self.snapshot.measure_positions.clone(),
            beat_lengths: self.snapshot.beat_lengths.clone(),
            track: self.view.track,
            diff: self.view.diff,
            first_deploy: first as u32,
            last_deploy: last as u32,
            view: self.view.clone(),
        };

        let mut child = Command::new(&self.worker_exe)
            .arg("work")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()?;

        let mut stdin = child.stdin.take().expect("child stdin is piped");
        write_message(&mut stdin, &job)?;
        info!(worker = slot_id, digest = %job.digest(), "job sent");

        Ok(WorkerSlot {
            status: WorkerStatus::Running,
            child: Some(child),
            stdin: Some(stdin),
            first_deploy: first,
            last_deploy: last,
        })
    }

    /// Reads the terminal report of an exited worker from its stdout.
    fn collect(&self, slot_id: usize, slot: &mut WorkerSlot) -> PfResult<WorkerReport> {
        let child = slot.child.as_mut().expect("running slot has a child");
        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| PathingError::Worker(format!("worker {slot_id} stdout missing")))?;

        let mut bytes = Vec::new();
        stdout.read_to_end(&mut bytes)?;
        let report = read_message(&mut bytes.as_slice())?;
        slot.child = None;
        slot.stdin = None;
        Ok(report)
    }

    /// Sends the cancel message to every running worker. Errors are logged
    /// and swallowed; a worker that already exited simply has a closed pipe.
    fn broadcast_cancel(&self, slots: &mut [WorkerSlot]) {
        for (slot_id, slot) in slots.iter_mut().enumerate() {
            if slot.status != WorkerStatus::Running {
                continue;
            }
            if let Some(stdin) = slot.stdin.as_mut() {
                if let Err(e) = write_message(stdin, &ControlMessage::Cancel) {
                    warn!(worker = slot_id, "cancel broadcast failed: {e}");
                }
            }
        }
    }
}
