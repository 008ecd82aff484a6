mod common;

use common::*;
use pathforge_core::error::PathingError;
use pathforge_core::search::runner::{run_view_search, SearchOptions};
use pathforge_core::search::{
    bounds, CancelToken, ProgressCallback, SearchDriver, SearchOutcome, SilentProgress, Solution,
    SolveCounters,
};
use pathforge_core::snapshot::TrackSnapshot;
use pathforge_protocol::track::TrackView;

fn solve_track(
    view: &TrackView,
    max_deployments: usize,
    first: usize,
    last: usize,
    prune: bool,
) -> (Solution, SolveCounters, SearchOutcome) {
    let snapshot = TrackSnapshot::build(view).unwrap();
    let mut driver =
        SearchDriver::new(view, &snapshot, max_deployments, CancelToken::new()).unwrap();
    driver.prune = prune;

    let baseline = driver.evaluate_cold(&[]).unwrap();
    let mut best = Solution {
        deployments: Vec::new(),
        score: baseline.score,
        deployment_notes: baseline.deployment_notes,
        solution_number: 0,
    };
    let mut counters = SolveCounters::default();
    let outcome = driver
        .solve(&mut best, first, last, &mut counters, &SilentProgress)
        .unwrap();
    (best, counters, outcome)
}

#[test]
fn exhaustive_enumeration_visits_every_sequence_exactly_once() {
    // 8 notes, up to 2 deployments, full range: 8 singletons plus C(8,2)
    // pairs, each evaluated exactly once.
    let view = simple_track(8);
    let (_, counters, outcome) = solve_track(&view, 2, 0, 7, false);

    assert_eq!(outcome, SearchOutcome::Exhausted);
    assert_eq!(counters.tested(), 8 + 28);
}

#[test]
fn exhaustive_enumeration_respects_first_deployment_bounds() {
    // First deployment restricted to 2..=5: four singletons, and pairs
    // (f, s) with s anywhere above f: 5 + 4 + 3 + 2.
    let view = simple_track(8);
    let (_, counters, _) = solve_track(&view, 2, 2, 5, false);
    assert_eq!(counters.tested(), 4 + 14);

    // Single-deployment ceiling: exactly one set per index in range.
    let (_, counters, _) = solve_track(&view, 1, 2, 5, false);
    assert_eq!(counters.tested(), 4);
}

#[test]
fn pruning_never_expands_the_search() {
    let view = two_phrase_track(30);
    let (_, exhaustive, _) = solve_track(&view, 1, 9, 29, false);
    let (_, pruned, _) = solve_track(&view, 1, 9, 29, true);
    assert!(pruned.tested() <= exhaustive.tested());
}

#[test]
fn driver_finds_the_known_best_deployment() {
    // On the 30-note two-phrase track the meter is half full from note 9;
    // deploying at note 14 pushes the doubled window into the x3/x4 region
    // without losing notes off the end of the track.
    let view = two_phrase_track(30);
    let (best, counters, _) = solve_track(&view, 1, 9, 29, true);

    assert_eq!(best.deployments, vec![14]);
    assert_eq!(best.score, 5350);
    assert_eq!(best.deployment_notes, 16);
    assert!(counters.valid > 0);
}

#[test]
fn pruned_and_exhaustive_agree_on_the_best_here() {
    let view = two_phrase_track(30);
    let (pruned_best, _, _) = solve_track(&view, 1, 9, 29, true);
    let (full_best, _, _) = solve_track(&view, 1, 9, 29, false);
    assert_eq!(pruned_best.score, full_best.score);
    assert_eq!(pruned_best.deployments, full_best.deployments);
}

#[test]
fn insufficient_resource_track_keeps_the_baseline() {
    // One lone phrase on notes 10..=15: a quarter meter, never deployable.
    let notes = (0..100)
        .map(|i| {
            let pos = i as u64 * BEAT_MS;
            if (10..=15).contains(&i) {
                sp_note(pos, 0)
            } else {
                note(pos, 0)
            }
        })
        .collect();
    let view = view_of(notes);

    for prune in [true, false] {
        let (best, counters, _) = solve_track(&view, 1, 16, 99, prune);
        assert_eq!(counters.valid, 0, "prune={prune}");
        assert_eq!(best.score, plain_baseline(100), "prune={prune}");
        assert!(best.deployments.is_empty(), "prune={prune}");
    }

    // The runner rejects the whole search up front: one phrase is below the
    // two-phrase deployment floor.
    let options = SearchOptions::default();
    let result = run_view_search(&view, &options, &SilentProgress);
    assert!(matches!(result, Err(PathingError::NoDeployments)));
}

#[test]
fn next_deployable_lands_after_the_second_phrase_end() {
    // Phrase from note 5 to 9, second phrase ending at note 20: the first
    // deployable index is 21, where both completions have banked.
    let notes = (0..40)
        .map(|i| {
            let pos = i as u64 * BEAT_MS;
            if (5..=9).contains(&i) || (15..=20).contains(&i) {
                sp_note(pos, 0)
            } else {
                note(pos, 0)
            }
        })
        .collect();
    let view = view_of(notes);
    let snapshot = TrackSnapshot::build(&view).unwrap();

    assert_eq!(bounds::find_next_deployable(&view, &snapshot, 0), Some(21));
    assert_eq!(bounds::find_next_sp_note(&view, 10), Some(15));
    assert_eq!(bounds::find_next_sp_note(&view, 21), None);
}

#[test]
fn whammy_sustain_counts_toward_deployability() {
    // A phrase ends at note 1; notes 3 and 4 carry four-beat star power
    // sustains, and eight whammied beats count as one more phrase. The
    // accumulation scan reaches two phrases' worth at note 4.
    let notes = vec![
        sp_note(0, 0),
        sp_note(500, 0),
        note(1000, 0),
        sp_note(2000, 2000),
        sp_note(4500, 2000),
        note(7000, 0),
        note(7500, 0),
    ];
    let view = view_of(notes);
    let snapshot = TrackSnapshot::build(&view).unwrap();

    // Phrase ends at note 1; notes 3 and 4 whammy 4 beats each, reaching a
    // second phrase's worth at note 4.
    assert_eq!(bounds::find_next_deployable(&view, &snapshot, 0), Some(5));
    assert_eq!(bounds::estimate_max_deployments(&view, &snapshot), 1);
}

#[test]
fn preset_cancel_token_stops_immediately() {
    let view = two_phrase_track(30);
    let snapshot = TrackSnapshot::build(&view).unwrap();
    let cancel = CancelToken::new();
    cancel.cancel();

    let mut driver = SearchDriver::new(&view, &snapshot, 1, cancel).unwrap();
    let mut best = Solution::default();
    let mut counters = SolveCounters::default();
    let outcome = driver
        .solve(&mut best, 9, 29, &mut counters, &SilentProgress)
        .unwrap();

    assert_eq!(outcome, SearchOutcome::Canceled);
    assert_eq!(counters.tested(), 0);
}

struct RefusingProgress;

impl ProgressCallback for RefusingProgress {
    fn on_progress(&self, _tested: u64, _first_set: usize, _total_sets: usize) -> bool {
        false
    }
}

#[test]
fn progress_callback_can_cancel() {
    let view = two_phrase_track(30);
    let snapshot = TrackSnapshot::build(&view).unwrap();
    let mut driver = SearchDriver::new(&view, &snapshot, 1, CancelToken::new()).unwrap();

    let mut best = Solution::default();
    let mut counters = SolveCounters::default();
    let outcome = driver
        .solve(&mut best, 9, 29, &mut counters, &RefusingProgress)
        .unwrap();
    assert_eq!(outcome, SearchOutcome::Canceled);
}

#[test]
fn runner_summary_reports_the_search() {
    let view = two_phrase_track(30);
    let options = SearchOptions::default();
    let summary = run_view_search(&view, &options, &SilentProgress).unwrap();

    assert_eq!(summary.score, 5350);
    assert_eq!(summary.baseline_score, 3150);
    assert_eq!(summary.deployments, vec![14]);
    assert_eq!(summary.deployment_positions_ms, vec![7000]);
    assert_eq!(summary.deployment_notes, 16);
    assert_eq!(summary.max_deployments, 1);
    assert!(summary.valid_count > 0);
}

#[test]
fn canceled_runner_reports_cancellation() {
    let view = two_phrase_track(30);
    let cancel = CancelToken::new();
    cancel.cancel();
    let options = SearchOptions::builder().cancel(cancel).build();

    let result = run_view_search(&view, &options, &SilentProgress);
    assert!(matches!(result, Err(PathingError::Canceled)));
}
