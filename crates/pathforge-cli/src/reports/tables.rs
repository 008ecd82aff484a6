use comfy_table::presets::UTF8_FULL;
use comfy_table::{ContentArrangement, Table};
use pathforge_core::search::runner::PathSummary;
use pathforge_protocol::track::TrackView;

/// Renders a deployment note position as `m:ss.mmm`.
pub fn format_timestamp(ms: u64) -> String {
    let minutes = ms / 60_000;
    let remainder = ms % 60_000;
    let seconds = remainder / 1000;
    let millis = remainder % 1000;
    format!("{minutes}:{seconds:02}.{millis:03}")
}

pub fn summary_table(view: &TrackView, summary: &PathSummary) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Result", "Value"]);

    table.add_row(vec!["Chart".to_string(), view.chart_ref.clone()]);
    table.add_row(vec![
        "Track / difficulty".to_string(),
        format!("{} / {}", view.track, view.diff),
    ]);
    table.add_row(vec!["Best score".to_string(), summary.score.to_string()]);
    table.add_row(vec![
        "Baseline (no star power)".to_string(),
        summary.baseline_score.to_string(),
    ]);
    table.add_row(vec![
        "Notes under star power".to_string(),
        summary.deployment_notes.to_string(),
    ]);
    table.add_row(vec![
        "Solutions tested".to_string(),
        format!(
            "{} ({} valid, {} invalid)",
            summary.valid_count + summary.invalid_count,
            summary.valid_count,
            summary.invalid_count
        ),
    ]);
    table.add_row(vec![
        "Elapsed".to_string(),
        format!("{:.2}s", summary.elapsed.as_secs_f64()),
    ]);
    table
}

pub fn deployment_table(summary: &PathSummary) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(vec!["Deployment", "Note index", "Timestamp"]);

    if summary.deployments.is_empty() {
        table.add_row(vec![
            "-".to_string(),
            "-".to_string(),
            "no notes playable under star power".to_string(),
        ]);
        return table;
    }

    for (ordinal, (&index, &pos)) in summary
        .deployments
        .iter()
        .zip(&summary.deployment_positions_ms)
        .enumerate()
    {
        table.add_row(vec![
            format!("#{}", ordinal + 1),
            index.to_string(),
            format_timestamp(pos),
        ]);
    }
    table
}
