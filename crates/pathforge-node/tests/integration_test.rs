use pathforge_core::search::runner::{run_view_search, SearchOptions};
use pathforge_core::search::SilentProgress;
use pathforge_core::snapshot::TrackSnapshot;
use pathforge_protocol::job::WorkerJob;
use pathforge_protocol::protocol::{read_message, write_message, WorkerReport};
use pathforge_protocol::track::{BeatRecord, NoteRecord, TrackView, FLAG_PHRASE_END, FLAG_STAR_POWER};
use std::io::Read;
use std::process::{Command, Stdio};

const BEAT_MS: u64 = 500;

/// 30 notes on a 120 BPM 4/4 grid with star power phrases on notes 0..=3
/// and 5..=8. Known optimum: deploy at note 14 for 5350 points.
fn two_phrase_view() -> TrackView {
    let notes = (0..30)
        .map(|i| {
            let sp = i <= 3 || (5..=8).contains(&i);
            let mut flags = 0u8;
            if sp {
                flags |= FLAG_STAR_POWER;
            }
            if i == 3 || i == 8 {
                flags |= FLAG_PHRASE_END;
            }
            NoteRecord {
                pos_ms: i as u64 * BEAT_MS,
                len_ms: 0,
                gems: 1,
                flags,
                source_index: i as u32,
            }
        })
        .collect();

    let beats = (0..110)
        .map(|i| BeatRecord {
            pos_ms: i as u64 * BEAT_MS,
            fpos: (i as u64 * BEAT_MS) as f64,
            len_ms: BEAT_MS as f64,
            beat_in_measure: i as u32 % 4,
            beats_per_measure: 4,
            measure_num: i as u32 / 4 + 1,
            has_ts: true,
        })
        .collect();

    TrackView {
        chart_ref: "integration".into(),
        track: 1,
        diff: 3,
        notes,
        beats,
    }
}

#[test]
fn worker_solves_a_job_over_stdio() {
    let view = two_phrase_view();
    let snapshot = TrackSnapshot::build(&view).unwrap();
    let job = WorkerJob {
        chart_ref: view.chart_ref.clone(),
        max_deployments: 1,
        measure_positions: snapshot.measure_positions.clone(),
        beat_lengths: snapshot.beat_lengths.clone(),
        track: view.track,
        diff: view.diff,
        first_deploy: 9,
        last_deploy: 29,
        view,
    };

    let mut child = Command::new(env!("CARGO_BIN_EXE_pathforge-node"))
        .arg("work")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("worker spawns");

    {
        let mut stdin = child.stdin.take().unwrap();
        write_message(&mut stdin, &job).unwrap();
        // stdin drops here; the worker's cancel listener just sees EOF.
    }

    let status = child.wait().unwrap();
    assert!(status.success());

    let mut bytes = Vec::new();
    child.stdout.take().unwrap().read_to_end(&mut bytes).unwrap();
    let report: WorkerReport = read_message(&mut bytes.as_slice()).unwrap();

    match report {
        WorkerReport::Success(solution) => {
            assert_eq!(solution.score, 5350);
            assert_eq!(solution.deployments, vec![14]);
            assert_eq!(solution.deployment_notes, 16);
            assert_eq!(solution.valid_count, 21);
            assert_eq!(solution.invalid_count, 0);
            assert!(solution.completed_at_ms > 0);
        }
        other => panic!("expected success, got {other:?}"),
    }
}

#[test]
fn inconsistent_job_makes_the_worker_fail_cleanly() {
    let view = two_phrase_view();
    let job = WorkerJob {
        chart_ref: view.chart_ref.clone(),
        max_deployments: 1,
        // Snapshot arrays that do not match the view's note count.
        measure_positions: vec![0.0; 3],
        beat_lengths: vec![0.0; 3],
        track: view.track,
        diff: view.diff,
        first_deploy: 9,
        last_deploy: 29,
        view,
    };

    let mut child = Command::new(env!("CARGO_BIN_EXE_pathforge-node"))
        .arg("work")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("worker spawns");

    {
        let mut stdin = child.stdin.take().unwrap();
        write_message(&mut stdin, &job).unwrap();
    }

    let status = child.wait().unwrap();
    assert!(!status.success());

    let mut bytes = Vec::new();
    child.stdout.take().unwrap().read_to_end(&mut bytes).unwrap();
    let report: WorkerReport = read_message(&mut bytes.as_slice()).unwrap();
    assert_eq!(report, WorkerReport::Failed);
}

#[test]
fn supervised_search_matches_the_in_process_result() {
    let view = two_phrase_view();

    let solo = run_view_search(&view, &SearchOptions::default(), &SilentProgress).unwrap();

    let fanned = run_view_search(
        &view,
        &SearchOptions::builder()
            .workers(2)
            .worker_exe(env!("CARGO_BIN_EXE_pathforge-node"))
            .build(),
        &SilentProgress,
    )
    .unwrap();

    assert_eq!(fanned.score, solo.score);
    assert_eq!(fanned.deployments, solo.deployments);
    assert_eq!(fanned.deployment_notes, solo.deployment_notes);
    assert_eq!(
        fanned.valid_count + fanned.invalid_count,
        solo.valid_count + solo.invalid_count,
        "every solution set is evaluated exactly once across workers"
    );
}
