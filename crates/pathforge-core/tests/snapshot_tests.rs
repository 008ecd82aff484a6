mod common;

use common::*;
use pathforge_core::error::PathingError;
use pathforge_core::snapshot::{measure_position, TrackSnapshot};

#[test]
fn snapshot_rebuild_is_bit_identical() {
    // Workers receive the snapshot arrays precomputed; rebuilding them from
    // the same view must reproduce them exactly.
    let view = two_phrase_track(30);
    let a = TrackSnapshot::build(&view).unwrap();
    let b = TrackSnapshot::build(&view).unwrap();
    assert_eq!(a, b);

    let shipped =
        TrackSnapshot::from_arrays(a.measure_positions.clone(), a.beat_lengths.clone()).unwrap();
    assert_eq!(a, shipped);
}

#[test]
fn measure_positions_follow_the_four_four_grid() {
    let view = simple_track(12);
    let snapshot = TrackSnapshot::build(&view).unwrap();

    // One note per beat in 4/4: measure position advances a quarter per
    // note.
    for (i, &mpos) in snapshot.measure_positions.iter().enumerate() {
        assert!((mpos - i as f64 / 4.0).abs() < 1e-9, "note {i}");
    }
    assert!(snapshot
        .measure_positions
        .windows(2)
        .all(|w| w[0] <= w[1]));
}

#[test]
fn note_end_snaps_onto_nearby_sustain_grid_lines() {
    // A note ending 1 ms past an exact two-beat boundary is pulled onto it.
    let snapped = TrackSnapshot::build(&view_of(vec![note(0, 1001)])).unwrap();
    assert_eq!(snapped.beat_lengths[0], 2.0);

    // Five ms away is outside the 2 ms snapping window.
    let raw = TrackSnapshot::build(&view_of(vec![note(0, 1005)])).unwrap();
    assert!((raw.beat_lengths[0] - 2.01).abs() < 1e-9);
}

#[test]
fn mismatched_worker_arrays_are_rejected() {
    let result = TrackSnapshot::from_arrays(vec![0.0, 1.0], vec![0.0]);
    assert!(matches!(result, Err(PathingError::InvalidParams(_))));
}

#[test]
fn measure_position_handles_mid_beat_positions() {
    let view = simple_track(4);
    // 250 ms is half a beat: half a quarter measure in.
    let mpos = measure_position(&view, 250.0).unwrap();
    assert!((mpos - 0.125).abs() < 1e-9);
}
