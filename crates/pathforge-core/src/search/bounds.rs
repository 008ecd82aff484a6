use crate::consts::{EPSILON, WHAMMY_BEATS_PER_PHRASE};
use crate::snapshot::TrackSnapshot;
use pathforge_protocol::track::TrackView;

/// Finds the first note index at which star power could next be deployed:
/// the note after two phrases' worth of meter has accumulated, counting
/// phrase completions and whammy-able sustain from `start_index` onward.
///
/// Whammy accumulation here is optimistic (it assumes every star power
/// sustain is whammied while the meter is inactive); the scoring engine has
/// the final say.
pub fn find_next_deployable(
    view: &TrackView,
    snapshot: &TrackSnapshot,
    start_index: usize,
) -> Option<usize> {
    let mut sustain = 0.0f64;
    let mut phrases = 0u32;

    for (index, note) in view.notes.iter().enumerate() {
        if index < start_index {
            continue;
        }
        if note.has_sustain() && note.star_power() {
            sustain += snapshot.beat_lengths[index];
            while sustain >= WHAMMY_BEATS_PER_PHRASE - EPSILON {
                // Eight beats of whammied sustain is one phrase's worth.
                sustain -= WHAMMY_BEATS_PER_PHRASE;
                phrases += 1;
            }
        }
        if note.phrase_end() {
            phrases += 1;
        }
        if phrases >= 2 {
            return Some(index + 1);
        }
    }

    None
}

/// Finds the first star power note at or after `start_index`, the next
/// opportunity to gain meter after a failed deployment.
pub fn find_next_sp_note(view: &TrackView, start_index: usize) -> Option<usize> {
    view.notes
        .iter()
        .enumerate()
        .skip(start_index)
        .find(|(_, note)| note.star_power())
        .map(|(index, _)| index)
}

/// Ceiling on the number of deployments a solution can contain, from the
/// total meter obtainable in the track: completed phrases plus whammy
/// sustain at eight beats per phrase, two phrases per deployment.
pub fn estimate_max_deployments(view: &TrackView, snapshot: &TrackSnapshot) -> usize {
    let mut phrases: u64 = 0;
    let mut sustain = 0.0f64;

    for (index, note) in view.notes.iter().enumerate() {
        if note.star_power() {
            if note.has_sustain() {
                sustain += snapshot.beat_lengths[index];
            }
            if note.phrase_end() {
                phrases += 1;
            }
        }
    }

    phrases += (sustain / WHAMMY_BEATS_PER_PHRASE + EPSILON) as u64;
    (phrases / 2) as usize
}
