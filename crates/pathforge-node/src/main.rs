use clap::{Parser, Subcommand};
use tracing::error;

mod worker;

#[derive(Parser)]
#[command(author, version, about = "pathforge worker process")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reads one job from stdin, solves it, reports on stdout.
    Work,
}

fn main() {
    // stdout is the protocol channel; all logging goes to stderr.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Work => {
            if let Err(e) = worker::run() {
                error!("worker terminated abnormally: {e}");
                worker::report_failure();
                std::process::exit(1);
            }
        }
    }
}
