//! # bcast CLI Entry Point
//!
//! Assembles subcommands and dispatches to handler modules.

use clap::Parser;

/// Broadcast engine CLI.
///
/// Runs simulated campaigns end to end, prints the phase transition
/// table, and shows the compliance effects of inbound keywords.
#[derive(Parser, Debug)]
#[command(name = "bcast", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Run a simulated campaign from a contact file.
    Run(bcast_cli::run::RunArgs),
    /// Print the job phase transition table.
    Phases(bcast_cli::phases::PhasesArgs),
    /// Show what an inbound keyword does to consent and suppression.
    Keyword(bcast_cli::keyword::KeywordArgs),
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run(args) => bcast_cli::run::execute(args),
        Commands::Phases(args) => bcast_cli::phases::execute(args),
        Commands::Keyword(args) => bcast_cli::keyword::execute(args),
    }
}
