//! Command-line parsing for the cascade driver.
//!
//! The goal of this module is to keep **argument parsing** and **command
//! dispatch** separate from the fitting logic.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::domain::Template;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "cascade",
    version,
    about = "Staged likelihood fitting with a source-removal comparison cascade"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the fit cascade for one analysis template.
    Run(RunArgs),
    /// Run several templates (all of them by default), each with its own
    /// model and output directory, in parallel.
    RunAll(RunAllArgs),
}

#[derive(Debug, Parser, Clone)]
pub struct RunArgs {
    /// Analysis template (dust tracer) backing the run.
    #[arg(value_enum)]
    pub template: Template,

    #[command(flatten)]
    pub common: CommonArgs,
}

#[derive(Debug, Parser, Clone)]
pub struct RunAllArgs {
    /// Templates to run; all six when omitted.
    #[arg(value_enum)]
    pub templates: Vec<Template>,

    #[command(flatten)]
    pub common: CommonArgs,
}

/// Options common to both commands.
#[derive(Debug, Parser, Clone)]
pub struct CommonArgs {
    /// Analysis root directory (defaults to $CASCADE_ROOT, .env honored).
    #[arg(long)]
    pub root: Option<PathBuf>,

    /// Seed for synthetic model generation when no model file exists.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Raise log verbosity to debug (per-stage log-likelihoods).
    #[arg(short, long)]
    pub verbose: bool,
}
