//! # Phases Subcommand
//!
//! Prints the job phase transition table, one row per phase with its
//! legal targets. Useful when reading a stuck job's audit log.

use clap::Args;

use bcast_state::BroadcastPhase;

/// Arguments for the phases subcommand.
#[derive(Args, Debug)]
pub struct PhasesArgs {
    /// Emit the table as JSON instead of text.
    #[arg(long)]
    pub json: bool,
}

/// Print the phase transition table.
pub fn execute(args: PhasesArgs) -> anyhow::Result<()> {
    if args.json {
        let table: Vec<_> = BroadcastPhase::all()
            .iter()
            .map(|phase| {
                serde_json::json!({
                    "phase": phase.as_str(),
                    "terminal": phase.is_terminal(),
                    "targets": phase
                        .allowed_targets()
                        .iter()
                        .map(|t| t.as_str())
                        .collect::<Vec<_>>(),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&table)?);
        return Ok(());
    }

    for phase in BroadcastPhase::all() {
        let targets = phase.allowed_targets();
        if targets.is_empty() {
            println!("{:20} (terminal)", phase.as_str());
        } else {
            let names: Vec<&str> = targets.iter().map(|t| t.as_str()).collect();
            println!("{:20} -> {}", phase.as_str(), names.join(", "));
        }
    }
    Ok(())
}

// ─── Tests ───────────────────────────────────────────────────────────
