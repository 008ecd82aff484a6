use crate::consts::SUSTAIN_STEP_BEATS;
use crate::error::{PathingError, PfResult};
use pathforge_protocol::track::{BeatRecord, TrackView};

/// Per-note arrays precomputed from the beat/tempo grid, one entry per note
/// in the target track difficulty. Immutable for the duration of a search;
/// shipped verbatim to workers so every process scores against bit-identical
/// floats.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackSnapshot {
    /// Position of each note in measures from the start of the chart.
    pub measure_positions: Vec<f64>,
    /// Length of each note's sustain in beats.
    pub beat_lengths: Vec<f64>,
}

impl TrackSnapshot {
    /// Derives the snapshot from a track view.
    ///
    /// A note ending within 2 ms of a 1/25-beat grid line has its beat
    /// length rounded onto that line, so sustains authored against the grid
    /// survive millisecond quantization of note lengths.
    pub fn build(view: &TrackView) -> PfResult<Self> {
        if view.beats.is_empty() {
            return Err(PathingError::MissingTimeSignature);
        }

        let mut measure_positions = Vec::with_capacity(view.notes.len());
        let mut beat_lengths = Vec::with_capacity(view.notes.len());

        for note in &view.notes {
            let mpos = measure_position(view, note.pos_ms as f64)
                .ok_or(PathingError::MissingTimeSignature)?;
            measure_positions.push(mpos);

            let note_end = note.pos_ms + note.len_ms;
            let start = beat_position(view, note.pos_ms as f64)
                .ok_or(PathingError::MissingTimeSignature)?;
            let end_beat = view
                .beat_index_at(note_end as f64)
                .ok_or(PathingError::MissingTimeSignature)?;
            let mut end = beat_position(view, note_end as f64)
                .ok_or(PathingError::MissingTimeSignature)?;

            // Snap the end onto a 1/25-beat grid line when it lands within
            // 2 ms of one.
            let interval = view.beats[end_beat].len_ms / 25.0;
            for step in 0..26u64 {
                let target = view.beats[end_beat].fpos + step as f64 * interval;
                let target_ms = (target + 0.5) as i64;
                let delta = note_end as i64 - target_ms;
                if (-2..=2).contains(&delta) && delta != 0 {
                    end = end_beat as f64 + step as f64 * SUSTAIN_STEP_BEATS;
                }
            }

            beat_lengths.push(end - start);
        }

        let ordered = measure_positions.windows(2).all(|w| w[0] <= w[1]);
        if !ordered {
            return Err(PathingError::Logic(
                "note measure positions are not non-decreasing".into(),
            ));
        }

        Ok(Self {
            measure_positions,
            beat_lengths,
        })
    }

    /// Wraps arrays received in a worker job.
    pub fn from_arrays(measure_positions: Vec<f64>, beat_lengths: Vec<f64>) -> PfResult<Self> {
        if measure_positions.len() != beat_lengths.len() {
            return Err(PathingError::InvalidParams(
                "snapshot arrays differ in length",
            ));
        }
        Ok(Self {
            measure_positions,
            beat_lengths,
        })
    }

    pub fn note_count(&self) -> usize {
        self.measure_positions.len()
    }
}

/// Converts a realtime position to a position in measures: the number of
/// whole measures before it, plus the fraction of its own measure elapsed.
pub fn measure_position(view: &TrackView, pos: f64) -> Option<f64> {
    let beat = view.beat_index_at(pos)?;
    let bp: &BeatRecord = &view.beats[beat];
    if bp.len_ms <= 0.0 || bp.beats_per_measure == 0 {
        return None;
    }
    let beat_fraction = (pos - bp.pos_ms as f64) / bp.len_ms;
    let within_measure = (bp.beat_in_measure as f64 + beat_fraction) / bp.beats_per_measure as f64;
    Some(within_measure + (bp.measure_num as f64 - 1.0))
}

/// Converts a realtime position to a floating point beat number.
pub fn beat_position(view: &TrackView, pos: f64) -> Option<f64> {
    let beat = view.beat_index_at(pos)?;
    let bp = &view.beats[beat];
    if bp.len_ms <= 0.0 {
        return None;
    }
    Some(beat as f64 + (pos - bp.pos_ms as f64) / bp.len_ms)
}
