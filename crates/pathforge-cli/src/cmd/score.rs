use crate::reports::tables::format_timestamp;
use clap::Args;
use pathforge_core::error::{PathingError, PfResult};
use pathforge_core::scorer::{DeployCache, Scorer};
use pathforge_core::snapshot::TrackSnapshot;
use std::path::PathBuf;

#[derive(Args, Debug, Clone)]
pub struct ScoreArgs {
    /// Track view JSON exported by the host editor.
    pub view: PathBuf,

    /// Deployment note indices, e.g. `--deployments 4,12,33`. Empty scores
    /// the no-star-power baseline.
    #[arg(long, value_delimiter = ',', num_args = 0..)]
    pub deployments: Vec<usize>,
}

pub fn run(args: ScoreArgs) -> PfResult<()> {
    let view = super::load_view(&args.view)?;
    let snapshot = TrackSnapshot::build(&view)?;
    let scorer = Scorer::new(&view, &snapshot)?;

    let increasing = args.deployments.windows(2).all(|w| w[0] < w[1]);
    if !increasing {
        return Err(PathingError::InvalidParams(
            "deployment indices must be strictly increasing",
        ));
    }

    let mut cache = DeployCache::new(args.deployments.len());
    match scorer.evaluate(&args.deployments, &mut cache) {
        Ok(eval) => {
            println!("Score:            {}", eval.score);
            println!("Deployment notes: {}", eval.deployment_notes);
            for &d in &args.deployments {
                let note = view.notes.get(d).ok_or(PathingError::InvalidParams(
                    "deployment index out of range",
                ))?;
                println!("Deploy at index {d} ({})", format_timestamp(note.pos_ms));
            }
            Ok(())
        }
        Err(rejection) => Err(PathingError::InvalidParams(match rejection {
            pathforge_core::scorer::Rejection::InvalidParams => "solution is structurally invalid",
            pathforge_core::scorer::Rejection::CachedUnreachable => {
                "a deployment note is unreachable"
            }
            pathforge_core::scorer::Rejection::AlreadyDeployed => {
                "deployment requested while star power is active"
            }
            pathforge_core::scorer::Rejection::InsufficientMeter => {
                "deployment requested with less than half a meter"
            }
            pathforge_core::scorer::Rejection::MissingTimeSignature => {
                "time signature context missing for a note"
            }
        })),
    }
}
