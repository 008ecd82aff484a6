use crate::error::{PathingError, PfResult};
use pathforge_protocol::track::{
    BeatRecord, NoteRecord, TrackView, FLAG_DISJOINTED, FLAG_PHRASE_END, FLAG_SOLO,
    FLAG_STAR_POWER,
};
use tracing::debug;

/// Persistent note flags understood across the chart boundary.
pub mod flags {
    /// The note is part of a star power phrase.
    pub const STAR_POWER: u32 = 1 << 0;
    /// The note is a gem of a chord whose gems differ in length.
    pub const DISJOINTED: u32 = 1 << 1;
    /// The note is highlighted in the host editor.
    pub const HIGHLIGHT: u32 = 1 << 2;

    /// Temporary flag: last note of a star power phrase.
    pub const TEMP_PHRASE_END: u32 = 1 << 0;
    /// Temporary flag: note sits inside a solo section.
    pub const TEMP_SOLO: u32 = 1 << 1;
}

/// Boundary to the external chart model. The search core reads notes and
/// beats through it once per search (to build a [`TrackView`]) and writes
/// through it only inside the documented mutation windows: the temp-flag
/// bracket around a search, and result highlighting behind an undo
/// checkpoint.
pub trait ChartSource {
    fn track_size(&self, track: u32) -> usize;
    fn note_pos(&self, track: u32, note: usize) -> u64;
    fn note_length(&self, track: u32, note: usize) -> u64;
    /// Difficulty lane the note belongs to.
    fn note_diff(&self, track: u32, note: usize) -> u8;
    /// Number of gems (lanes) the note sounds.
    fn note_gems(&self, track: u32, note: usize) -> u8;
    fn note_flags(&self, track: u32, note: usize) -> u32;
    fn note_temp_flags(&self, track: u32, note: usize) -> u32;
    fn set_note_flags(&mut self, track: u32, note: usize, flags: u32);
    fn set_note_temp_flags(&mut self, track: u32, note: usize, flags: u32);

    /// The beat/tempo grid, shared by all tracks.
    fn beat_count(&self) -> usize;
    fn beat(&self, index: usize) -> BeatRecord;

    /// Solo sections of a track as inclusive `(start_ms, end_ms)` ranges.
    fn solos(&self, track: u32) -> Vec<(u64, u64)>;

    /// Provenance label for logs and job messages.
    fn chart_ref(&self) -> String;

    /// Request an undo checkpoint. Called once before the first highlight
    /// mutation so the whole result can be reverted as a unit.
    fn ensure_undo_checkpoint(&mut self);
}

/// Whether a note is the last one of a star power phrase in its difficulty:
/// it carries star power and the next note of the same difficulty does not
/// (or does not exist).
pub fn is_last_in_sp_phrase<C: ChartSource + ?Sized>(
    chart: &C,
    track: u32,
    diff: u8,
    note: usize,
) -> bool {
    if chart.note_flags(track, note) & flags::STAR_POWER == 0 {
        return false;
    }
    let size = chart.track_size(track);
    for next in note + 1..size {
        if chart.note_diff(track, next) != diff {
            continue;
        }
        return chart.note_flags(track, next) & flags::STAR_POWER == 0;
    }
    true
}

/// Tags every note of the target difficulty with the transient
/// phrase-end/solo flags the scoring support derives from. Must be paired
/// with [`clear_temp_flags`]; the window is not reentrant.
pub fn mark_temp_flags<C: ChartSource + ?Sized>(chart: &mut C, track: u32, diff: u8) {
    let size = chart.track_size(track);
    let solos = chart.solos(track);

    for note in 0..size {
        if chart.note_diff(track, note) != diff {
            continue;
        }

        let pos = chart.note_pos(track, note);
        let mut tflags =
            chart.note_temp_flags(track, note) & !(flags::TEMP_PHRASE_END | flags::TEMP_SOLO);

        if is_last_in_sp_phrase(chart, track, diff, note) {
            tflags |= flags::TEMP_PHRASE_END;
        }
        if solos.iter().any(|&(start, end)| pos >= start && pos <= end) {
            tflags |= flags::TEMP_SOLO;
        }
        chart.set_note_temp_flags(track, note, tflags);
    }
}

/// Clears the transient scoring flags from every note of the track,
/// regardless of difficulty.
pub fn clear_temp_flags<C: ChartSource + ?Sized>(chart: &mut C, track: u32) {
    let size = chart.track_size(track);
    for note in 0..size {
        let tflags =
            chart.note_temp_flags(track, note) & !(flags::TEMP_PHRASE_END | flags::TEMP_SOLO);
        chart.set_note_temp_flags(track, note, tflags);
    }
}

/// Builds the immutable search context for one track difficulty. Expects
/// [`mark_temp_flags`] to have run; phrase-end and solo membership are
/// folded into the per-note flag bits.
pub fn build_track_view<C: ChartSource + ?Sized>(
    chart: &C,
    track: u32,
    diff: u8,
) -> PfResult<TrackView> {
    let beat_count = chart.beat_count();
    if beat_count == 0 {
        return Err(PathingError::MissingTimeSignature);
    }
    let beats: Vec<BeatRecord> = (0..beat_count).map(|i| chart.beat(i)).collect();
    if !beats[0].has_ts {
        return Err(PathingError::MissingTimeSignature);
    }

    let size = chart.track_size(track);
    let mut notes = Vec::new();
    for note in 0..size {
        if chart.note_diff(track, note) != diff {
            continue;
        }

        let nflags = chart.note_flags(track, note);
        let tflags = chart.note_temp_flags(track, note);
        let mut view_flags = 0u8;
        if nflags & flags::STAR_POWER != 0 {
            view_flags |= FLAG_STAR_POWER;
        }
        if nflags & flags::DISJOINTED != 0 {
            view_flags |= FLAG_DISJOINTED;
        }
        if tflags & flags::TEMP_PHRASE_END != 0 {
            view_flags |= FLAG_PHRASE_END;
        }
        if tflags & flags::TEMP_SOLO != 0 {
            view_flags |= FLAG_SOLO;
        }

        notes.push(NoteRecord {
            pos_ms: chart.note_pos(track, note),
            len_ms: chart.note_length(track, note),
            gems: chart.note_gems(track, note),
            flags: view_flags,
            source_index: note as u32,
        });
    }

    debug!(
        track,
        diff,
        notes = notes.len(),
        beats = beats.len(),
        "built track view"
    );

    Ok(TrackView {
        chart_ref: chart.chart_ref(),
        track,
        diff,
        notes,
        beats,
    })
}

/// Highlights the winning deployment notes in the host chart, requesting a
/// single undo checkpoint before the first flag actually changes.
pub fn apply_highlights<C: ChartSource + ?Sized>(
    chart: &mut C,
    view: &TrackView,
    deployments: &[usize],
) -> PfResult<()> {
    let mut undo_made = false;
    for &index in deployments {
        let note = view
            .notes
            .get(index)
            .ok_or(PathingError::InvalidParams("deployment index out of range"))?;
        let native = note.source_index as usize;
        let nflags = chart.note_flags(view.track, native);
        if nflags & flags::HIGHLIGHT == 0 {
            if !undo_made {
                chart.ensure_undo_checkpoint();
                undo_made = true;
            }
            chart.set_note_flags(view.track, native, nflags | flags::HIGHLIGHT);
        }
    }
    Ok(())
}
