use super::{CacheEntry, DeployCache, Evaluation, Rejection, Scorer, ScoringState};
use crate::consts::*;
use crate::snapshot::measure_position;

/// Scores one candidate solution against the track, walking every note in
/// the target difficulty in order.
///
/// Deployment windows are tracked in measures. Comparisons against the
/// window end truncate both sides to thousandths of a measure, matching the
/// game's tolerance for notes sitting exactly on the boundary.
pub(crate) fn evaluate(
    s: &Scorer,
    deployments: &[usize],
    cache: &mut DeployCache,
) -> Result<Evaluation, Rejection> {
    let view = s.view;
    let snapshot = s.snapshot;
    let note_count = view.note_count();

    if deployments.len() > cache.capacity() {
        return Err(Rejection::InvalidParams);
    }

    // Resume from the longest cached prefix; everything past it is stale.
    let matched = cache.matching_prefix(deployments);
    cache.invalidate_from(matched.map_or(0, |m| m + 1));

    let (mut state, start_note, mut deployment_num) = match matched {
        Some(m) => {
            let entry = cache.entry(m).expect("matched entry is present");
            (entry.state, entry.resume_note, m + 1)
        }
        None => (ScoringState::fresh(), 0, 0),
    };

    if matched.is_some() {
        if let Some(&next_deploy) = deployments.get(deployment_num) {
            if start_note > next_deploy {
                return Err(Rejection::CachedUnreachable);
            }
        }
    }

    let mut sp_deployed = false;
    let mut sp_deployment_end = 0.0f64;
    let mut deploy_start_note = 0usize;

    for i in start_note..note_count {
        let note = view.notes[i];
        let mpos = snapshot.measure_positions[i];

        let disjointed = note.disjointed();
        let representative = disjointed && view.is_last_longest_gem(i);

        state.hit_counter += 1;
        if state.hit_counter == HITS_FOR_X4 {
            state.multiplier = 4;
        } else if state.hit_counter == HITS_FOR_X3 {
            state.multiplier = 3;
        } else if state.hit_counter == HITS_FOR_X2 {
            state.multiplier = 2;
        }

        let deploy_here = deployments.contains(&i);

        if sp_deployed {
            let note_thousandths = (mpos * 1000.0) as u64;
            let end_thousandths = (sp_deployment_end * 1000.0) as u64;
            if note_thousandths >= end_thousandths {
                // This note is the first one past the deployment.
                sp_deployed = false;
                cache.store(
                    deployment_num,
                    CacheEntry {
                        state,
                        deploy_start: deploy_start_note,
                        resume_note: i,
                    },
                );
                deployment_num += 1;
            } else if deploy_here {
                return Err(Rejection::AlreadyDeployed);
            }
        }

        if !sp_deployed && deploy_here {
            if state.meter >= MIN_DEPLOY_METER - EPSILON {
                sp_deployment_end = mpos + MEASURES_PER_FULL_METER * state.meter;
                state.meter = 0.0;
                state.meter_uncapped = 0.0;
                sp_deployed = true;
                deploy_start_note = i;
            } else {
                return Err(Rejection::InsufficientMeter);
            }
        }

        if note.phrase_end() {
            if sp_deployed {
                sp_deployment_end += PHRASE_EXTENSION_MEASURES;
            } else {
                state.meter += METER_PER_PHRASE;
                state.meter_uncapped += METER_PER_PHRASE;
                if state.meter > 1.0 {
                    state.meter = 1.0;
                }
            }
        }

        let mut note_score: u64;
        if note.star_power() && note.has_sustain() && sp_deployed {
            // Whammying a star power sustain while deployed: the meter both
            // drains and gains at once, so the sustain is scored in 1/25
            // beat steps with the meter recomputed at each one.
            let mut remaining = snapshot.beat_lengths[i];
            let whammy_gain = WHAMMY_METER_PER_BEAT / 25.0;
            let mut realpos = note.pos_ms as f64;

            let base = note.gems as u64 * BASE_SCORE_PER_GEM;
            note_score = base * 2;
            state.deployment_notes += 1;
            state.meter = (sp_deployment_end - mpos) / MEASURES_PER_FULL_METER;
            state.meter_uncapped = state.meter;

            while remaining > 0.0 {
                // Only the representative gem of a disjointed chord is
                // walked for whammy; the other gems already scored their
                // sustains through it.
                if disjointed && !representative {
                    break;
                }
                if remaining < SUSTAIN_STEP_BEATS / 2.0 {
                    // Less than half a point of sustain left is dropped.
                    break;
                }

                let beat = view
                    .beat_index_at(realpos)
                    .ok_or(Rejection::MissingTimeSignature)?;
                if !view.beats[beat].has_ts {
                    return Err(Rejection::MissingTimeSignature);
                }

                let drain = 1.0
                    / MEASURES_PER_FULL_METER
                    / view.beats[beat].beats_per_measure as f64
                    / 25.0;
                state.meter = (state.meter + whammy_gain - drain).clamp(0.0, 1.0);

                if remaining < SUSTAIN_STEP_BEATS {
                    // Fragment between half and one step scores at the
                    // note's final millisecond.
                    realpos = (note.pos_ms + note.len_ms) as f64 - 1.0;
                } else {
                    realpos += view.beats[beat].len_ms / 25.0;
                }
                // One point per step, fanned across every gem of a
                // disjointed chord still sounding at this position.
                let gem_multiplier = if disjointed {
                    view.gems_extending_to(i, (realpos + 0.5) as u64) as u64
                } else {
                    1
                };
                if state.meter > 0.0 {
                    note_score += 2 * gem_multiplier;
                } else {
                    note_score += gem_multiplier;
                }

                remaining -= SUSTAIN_STEP_BEATS;
            }

            if state.meter > 0.0 {
                // Deployment survives the sustain: re-anchor the window at
                // the sustain's end with whatever meter is left.
                let sustain_end =
                    measure_position(view, (note.pos_ms + note.len_ms) as f64)
                        .ok_or(Rejection::MissingTimeSignature)?;
                sp_deployment_end = sustain_end + MEASURES_PER_FULL_METER * state.meter;
                state.meter = 0.0;
                state.meter_uncapped = 0.0;
            } else {
                // Deployment drained away mid-note.
                state.meter = 0.0;
                state.meter_uncapped = 0.0;
                sp_deployed = false;
                cache.store(
                    deployment_num,
                    CacheEntry {
                        state,
                        deploy_start: deploy_start_note,
                        resume_note: i + 1,
                    },
                );
                deployment_num += 1;
            }
            note_score *= state.multiplier;
        } else {
            // Whammy meter gain is evaluated separately from scoring when
            // star power is not riding the sustain.
            if note.star_power() && note.has_sustain() && (!disjointed || representative) {
                let bonus = snapshot.beat_lengths[i] * WHAMMY_METER_PER_BEAT;
                state.meter += bonus;
                state.meter_uncapped += bonus;
                if state.meter > 1.0 {
                    state.meter = 1.0;
                }
            }

            let base = note.gems as u64 * BASE_SCORE_PER_GEM;
            note_score = base;

            let mut covered = 0.0f64;
            let mut uncovered = 0.0f64;
            if note.has_sustain() {
                uncovered = SUSTAIN_POINTS_PER_BEAT * snapshot.beat_lengths[i];

                if snapshot.beat_lengths[i] >= 1.0 + EPSILON {
                    // A sustain of a beat or more may outlive the
                    // deployment; only the covered fraction is doubled.
                    let sustain_end =
                        measure_position(view, (note.pos_ms + note.len_ms) as f64)
                            .ok_or(Rejection::MissingTimeSignature)?;
                    if sp_deployed && sustain_end > sp_deployment_end {
                        let note_measure_len = sustain_end - mpos;
                        let sp_portion = (sp_deployment_end - mpos) / note_measure_len;
                        covered = uncovered * sp_portion;
                        uncovered -= covered;
                    }
                } else {
                    covered = uncovered;
                    uncovered = 0.0;
                }
                if sp_deployed {
                    covered *= 2.0;
                }
            }

            if sp_deployed {
                note_score *= 2;
                state.deployment_notes += 1;
            }
            note_score += (covered + uncovered + 0.5) as u64;
            note_score *= state.multiplier;
        }

        if note.solo() {
            note_score += SOLO_NOTE_BONUS;
        }
        state.score += note_score;
    }

    Ok(Evaluation {
        score: state.score,
        deployment_notes: state.deployment_notes,
        final_meter: state.meter,
    })
}
