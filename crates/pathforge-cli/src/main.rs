use clap::{Parser, Subcommand};
use std::process;
use tracing::error;

mod cmd;
mod reports;

#[derive(Parser, Debug)]
#[command(author, version, about = "Star power path optimizer", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose logging.
    #[arg(global = true, long, default_value_t = false)]
    debug: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Finds the highest-scoring deployment path for an exported track view.
    Search(cmd::search::SearchArgs),
    /// Scores one fixed deployment sequence against a track view.
    Score(cmd::score::ScoreArgs),
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Search(args) => cmd::search::run(args),
        Commands::Score(args) => cmd::score::run(args),
    };

    if let Err(e) = result {
        error!("{e}");
        process::exit(1);
    }
}
