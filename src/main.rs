//! Loadero CI gate
//!
//! Launches Loadero test runs, waits for them to finish and exits with
//! status 0 only when every run passed.

use clap::Parser;
use loadero_ci::cli;
use loadero_ci::commands::{Commands, ConnectionArgs};
use loadero_ci::common::logging;

#[derive(Parser)]
#[command(name = "loadero-ci", about = "Run Loadero tests as a CI gate")]
#[command(version, long_about = None)]
struct Cli {
    #[command(flatten)]
    connection: ConnectionArgs,

    /// Log every status check
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    logging::init_cli(cli.verbose);

    match cli::dispatch(cli.connection, cli.command).await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(e.exit_code());
        }
    }
}
