use serde::{Deserialize, Serialize};

/// Note flag bits carried by [`NoteRecord::flags`].
///
/// `STAR_POWER` and `DISJOINTED` come straight from the chart; `PHRASE_END`
/// and `SOLO` are derived once when the view is built so the scoring hot
/// path never has to re-scan phrases or solo ranges.
pub const FLAG_STAR_POWER: u8 = 1 << 0;
pub const FLAG_DISJOINTED: u8 = 1 << 1;
pub const FLAG_PHRASE_END: u8 = 1 << 2;
pub const FLAG_SOLO: u8 = 1 << 3;

/// One note (or one gem of a disjointed chord) in the target track
/// difficulty.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct NoteRecord {
    /// Realtime start position in milliseconds.
    pub pos_ms: u64,
    /// Sustain length in milliseconds. Lengths of 0 or 1 ms count as
    /// no sustain.
    pub len_ms: u64,
    /// Number of gems (lanes) sounded by this note.
    pub gems: u8,
    pub flags: u8,
    /// Raw index of this note in the source track, across all difficulties.
    /// Only used to map results back onto the chart for highlighting.
    pub source_index: u32,
}

impl NoteRecord {
    #[inline]
    pub fn star_power(&self) -> bool {
        self.flags & FLAG_STAR_POWER != 0
    }

    #[inline]
    pub fn disjointed(&self) -> bool {
        self.flags & FLAG_DISJOINTED != 0
    }

    #[inline]
    pub fn phrase_end(&self) -> bool {
        self.flags & FLAG_PHRASE_END != 0
    }

    #[inline]
    pub fn solo(&self) -> bool {
        self.flags & FLAG_SOLO != 0
    }

    /// A sustain must be at least 2 ms long to be scored or whammied.
    #[inline]
    pub fn has_sustain(&self) -> bool {
        self.len_ms > 1
    }
}

/// One beat marker of the chart's tempo/time-signature grid.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct BeatRecord {
    /// Rounded realtime position in milliseconds.
    pub pos_ms: u64,
    /// Unrounded realtime position in milliseconds.
    pub fpos: f64,
    /// Distance to the next beat in milliseconds.
    pub len_ms: f64,
    /// Zero-based beat ordinal within its measure.
    pub beat_in_measure: u32,
    pub beats_per_measure: u32,
    /// One-based measure ordinal.
    pub measure_num: u32,
    /// Whether a time signature is in effect on this beat.
    pub has_ts: bool,
}

/// The immutable search context: every fact about the target track
/// difficulty the scoring engine needs, detached from the chart model so
/// worker processes can evaluate solutions without ever opening a chart.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct TrackView {
    /// Provenance label, typically the chart file path.
    pub chart_ref: String,
    pub track: u32,
    pub diff: u8,
    /// Notes of the target difficulty only, ordered by position. Gems of a
    /// disjointed chord are adjacent entries sharing `pos_ms`.
    pub notes: Vec<NoteRecord>,
    pub beats: Vec<BeatRecord>,
}

impl TrackView {
    pub fn note_count(&self) -> usize {
        self.notes.len()
    }

    /// Index of the beat containing the given realtime position, i.e. the
    /// last beat starting at or before it. Positions before the first beat
    /// map to beat 0.
    pub fn beat_index_at(&self, pos: f64) -> Option<usize> {
        if self.beats.is_empty() {
            return None;
        }
        let n = self.beats.partition_point(|b| (b.pos_ms as f64) <= pos);
        Some(n.saturating_sub(1))
    }

    /// Whether `note` is the gem that represents its disjointed chord for
    /// whammy purposes: the longest gem at its position, ties going to the
    /// later gem.
    pub fn is_last_longest_gem(&self, note: usize) -> bool {
        let pos = self.notes[note].pos_ms;
        let mut first = note;
        while first > 0 && self.notes[first - 1].pos_ms == pos {
            first -= 1;
        }

        let mut longest = note;
        let mut longest_len = self.notes[note].len_ms;
        for (idx, n) in self.notes.iter().enumerate().skip(first) {
            if n.pos_ms != pos {
                break;
            }
            if n.len_ms >= longest_len {
                longest = idx;
                longest_len = n.len_ms;
            }
        }
        longest == note
    }

    /// Number of gems co-starting with `note` whose sustain reaches
    /// `pos_ms`. Used to fan a sub-beat sustain point out across the gems of
    /// a disjointed chord that are still sounding.
    pub fn gems_extending_to(&self, note: usize, pos_ms: u64) -> u32 {
        let start = self.notes[note].pos_ms;
        if start > pos_ms {
            return 0;
        }
        let target_len = pos_ms - start;

        let mut first = note;
        while first > 0 && self.notes[first - 1].pos_ms == start {
            first -= 1;
        }

        let mut count = 0;
        for n in self.notes.iter().skip(first) {
            if n.pos_ms != start {
                break;
            }
            if n.len_ms >= target_len {
                count += 1;
            }
        }
        count
    }
}
