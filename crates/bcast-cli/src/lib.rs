//! # bcast-cli — Operator Tooling
//!
//! Subcommand handlers for the `bcast` binary. Each module owns one
//! subcommand: its clap `Args` struct and an `execute` function the
//! entry point dispatches to.

pub mod keyword;
pub mod phases;
pub mod run;
