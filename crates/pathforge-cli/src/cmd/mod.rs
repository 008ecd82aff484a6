pub mod score;
pub mod search;

use pathforge_core::error::{PathingError, PfResult};
use pathforge_protocol::track::TrackView;
use std::fs;
use std::path::Path;

/// Loads a track view exported by the host editor as JSON.
pub fn load_view(path: &Path) -> PfResult<TrackView> {
    let raw = fs::read_to_string(path)?;
    serde_json::from_str(&raw)
        .map_err(|e| PathingError::Logic(format!("cannot parse track view {}: {e}", path.display())))
}
