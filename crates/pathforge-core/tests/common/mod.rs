#![allow(dead_code)] // not every test binary uses every fixture helper

//! Synthetic track fixtures shared by the integration tests.
//!
//! The default grid is 120 BPM in 4/4: beats every 500 ms, four beats (two
//! seconds) per measure, a note landing exactly on every beat.

use pathforge_protocol::track::{
    BeatRecord, NoteRecord, TrackView, FLAG_DISJOINTED, FLAG_PHRASE_END, FLAG_SOLO,
    FLAG_STAR_POWER,
};

pub const BEAT_MS: u64 = 500;
pub const BEATS_PER_MEASURE: u32 = 4;

pub fn note(pos_ms: u64, len_ms: u64) -> NoteRecord {
    NoteRecord {
        pos_ms,
        len_ms,
        gems: 1,
        flags: 0,
        source_index: 0,
    }
}

pub fn sp_note(pos_ms: u64, len_ms: u64) -> NoteRecord {
    NoteRecord {
        flags: FLAG_STAR_POWER,
        ..note(pos_ms, len_ms)
    }
}

pub fn solo_note(pos_ms: u64, len_ms: u64) -> NoteRecord {
    NoteRecord {
        flags: FLAG_SOLO,
        ..note(pos_ms, len_ms)
    }
}

pub fn disjointed_sp_note(pos_ms: u64, len_ms: u64) -> NoteRecord {
    NoteRecord {
        flags: FLAG_STAR_POWER | FLAG_DISJOINTED,
        ..note(pos_ms, len_ms)
    }
}

/// Marks the last note of every contiguous star power run as a phrase end,
/// the way the chart boundary derives it.
pub fn derive_phrase_ends(notes: &mut [NoteRecord]) {
    for i in 0..notes.len() {
        let is_sp = notes[i].flags & FLAG_STAR_POWER != 0;
        let next_sp = notes
            .get(i + 1)
            .map(|n| n.flags & FLAG_STAR_POWER != 0)
            .unwrap_or(false);
        if is_sp && !next_sp {
            notes[i].flags |= FLAG_PHRASE_END;
        }
    }
}

/// Builds a view on the default grid, with enough beats to cover every note
/// plus slack for deployment windows running past the last note.
pub fn view_of(mut notes: Vec<NoteRecord>) -> TrackView {
    derive_phrase_ends(&mut notes);
    for (i, n) in notes.iter_mut().enumerate() {
        n.source_index = i as u32;
    }

    let last_end = notes
        .iter()
        .map(|n| n.pos_ms + n.len_ms)
        .max()
        .unwrap_or(0);
    let beat_count = (last_end / BEAT_MS) as usize + 80;

    let beats = (0..beat_count)
        .map(|i| BeatRecord {
            pos_ms: i as u64 * BEAT_MS,
            fpos: (i as u64 * BEAT_MS) as f64,
            len_ms: BEAT_MS as f64,
            beat_in_measure: i as u32 % BEATS_PER_MEASURE,
            beats_per_measure: BEATS_PER_MEASURE,
            measure_num: i as u32 / BEATS_PER_MEASURE + 1,
            has_ts: true,
        })
        .collect();

    TrackView {
        chart_ref: "fixture".into(),
        track: 1,
        diff: 3,
        notes,
        beats,
    }
}

/// `count` plain notes, one per beat.
pub fn simple_track(count: usize) -> TrackView {
    view_of(
        (0..count)
            .map(|i| note(i as u64 * BEAT_MS, 0))
            .collect(),
    )
}

/// `count` notes, one per beat, with star power runs on notes 0..=3 and
/// 5..=8 so half a meter is available from note 9 onward. The best single
/// deployment on a 30-note instance of this track is note 14 for 5350
/// points (baseline 3150).
pub fn two_phrase_track(count: usize) -> TrackView {
    assert!(count >= 10);
    let notes = (0..count)
        .map(|i| {
            let pos = i as u64 * BEAT_MS;
            if i <= 3 || (5..=8).contains(&i) {
                sp_note(pos, 0)
            } else {
                note(pos, 0)
            }
        })
        .collect();
    view_of(notes)
}

/// Hand-computed baseline for `count` plain single-gem notes with no
/// sustains: 50 points each under the 10/20/30 multiplier ramp.
pub fn plain_baseline(count: u64) -> u64 {
    let mut total = 0;
    for hit in 1..=count {
        let mult = match hit {
            h if h >= 30 => 4,
            h if h >= 20 => 3,
            h if h >= 10 => 2,
            _ => 1,
        };
        total += 50 * mult;
    }
    total
}
