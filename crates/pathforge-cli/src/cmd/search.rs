use crate::reports;
use clap::Args;
use pathforge_core::error::{PathingError, PfResult};
use pathforge_core::search::runner::{run_view_search, PathSummary, SearchOptions};
use pathforge_core::search::ProgressCallback;
use std::path::PathBuf;
use tracing::info;

#[derive(Args, Debug, Clone)]
pub struct SearchArgs {
    /// Track view JSON exported by the host editor.
    pub view: PathBuf,

    /// Worker processes to fan out to. Omit to search in-process;
    /// 0 means one worker per CPU.
    #[arg(short = 'j', long)]
    pub workers: Option<usize>,

    /// Worker executable. Defaults to `pathforge-node` next to this binary.
    #[arg(long)]
    pub worker_exe: Option<PathBuf>,

    /// Emit the summary as JSON on stdout instead of tables.
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

struct CliProgress;

impl ProgressCallback for CliProgress {
    fn on_progress(&self, tested: u64, first_set: usize, total_sets: usize) -> bool {
        if tested > 0 && tested % 100_000 == 0 {
            info!(tested, "testing solution set {first_set}/{total_sets}");
        }
        true
    }
}

pub fn run(args: SearchArgs) -> PfResult<()> {
    let view = super::load_view(&args.view)?;

    let workers = match args.workers {
        Some(0) => num_cpus::get(),
        Some(n) => n,
        None => 0,
    };

    let options = if workers > 0 {
        let exe = match args.worker_exe {
            Some(exe) => exe,
            None => default_worker_exe()?,
        };
        SearchOptions::builder()
            .workers(workers)
            .worker_exe(exe)
            .build()
    } else {
        SearchOptions::builder().build()
    };

    let summary = run_view_search(&view, &options, &CliProgress)?;
    print_summary(&view, &summary, args.json)
}

fn print_summary(
    view: &pathforge_protocol::track::TrackView,
    summary: &PathSummary,
    json: bool,
) -> PfResult<()> {
    if json {
        let rendered = serde_json::to_string_pretty(summary)
            .map_err(|e| PathingError::Logic(format!("summary serialization failed: {e}")))?;
        println!("{rendered}");
    } else {
        println!("{}", reports::tables::summary_table(view, summary));
        println!("{}", reports::tables::deployment_table(summary));
    }
    Ok(())
}

fn default_worker_exe() -> PfResult<PathBuf> {
    let exe = std::env::current_exe()?;
    Ok(exe.with_file_name("pathforge-node"))
}
