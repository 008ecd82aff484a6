/// Base score per gem of a hit note.
pub const BASE_SCORE_PER_GEM: u64 = 50;

/// Sustain score per beat of held note.
pub const SUSTAIN_POINTS_PER_BEAT: f64 = 25.0;

/// Meter granted by completing one star power phrase (25%).
pub const METER_PER_PHRASE: f64 = 0.25;

/// Minimum meter required to deploy (half a bar).
pub const MIN_DEPLOY_METER: f64 = 0.50;

/// A full meter sustains a deployment for this many measures.
pub const MEASURES_PER_FULL_METER: f64 = 8.0;

/// Completing a phrase mid-deployment extends the deployment by this many
/// measures (one quarter of a full meter's worth).
pub const PHRASE_EXTENSION_MEASURES: f64 = 2.0;

/// Meter gained per beat of whammied star power sustain (1/32).
pub const WHAMMY_METER_PER_BEAT: f64 = 1.0 / 32.0;

/// Sustains are scored one point per 1/25 beat.
pub const SUSTAIN_STEP_BEATS: f64 = 1.0 / 25.0;

/// Beats of whammied sustain worth one phrase completion (0.25 meter at
/// 1/32 per beat).
pub const WHAMMY_BEATS_PER_PHRASE: f64 = 8.0;

/// Flat bonus for a note inside a completed solo section. Not multiplied.
pub const SOLO_NOTE_BONUS: u64 = 100;

/// Hit counts at which the score multiplier is promoted.
pub const HITS_FOR_X2: u64 = 10;
pub const HITS_FOR_X3: u64 = 20;
pub const HITS_FOR_X4: u64 = 30;

/// Tolerance applied to meter and beat-length comparisons to absorb
/// accumulated floating point error.
pub const EPSILON: f64 = 0.0001;

/// The search driver polls for cancellation and reports progress once per
/// this many evaluated solutions.
pub const PROGRESS_POLL_INTERVAL: u64 = 2000;

/// Supervisor poll loop sleep when no worker changed status.
pub const SUPERVISOR_POLL_MS: u64 = 10;
