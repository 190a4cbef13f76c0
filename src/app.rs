//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - initializes logging
//! - resolves the run configuration per template
//! - runs the cascade pipeline and prints the comparison summary

use clap::Parser;
use rayon::prelude::*;

use crate::cli::{Cli, Command, CommonArgs, RunAllArgs, RunArgs};
use crate::domain::Template;
use crate::error::{CascadeError, Result};

pub mod pipeline;

/// Entry point for the `cascade` binary.
pub fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Run(args) => {
            crate::logging::init(args.common.verbose);
            handle_run(args)
        }
        Command::RunAll(args) => {
            crate::logging::init(args.common.verbose);
            handle_run_all(args)
        }
    }
}

fn handle_run(args: RunArgs) -> Result<()> {
    let summary = run_template(args.template, &args.common)?;
    println!("{}", crate::report::format_run_summary(&summary));
    Ok(())
}

fn handle_run_all(args: RunAllArgs) -> Result<()> {
    let templates: Vec<Template> = if args.templates.is_empty() {
        Template::ALL.to_vec()
    } else {
        args.templates.clone()
    };

    // Templates are independent runs: each owns its model, its source sets,
    // and its output directory, so they parallelize freely. A single run
    // stays strictly sequential inside.
    let results: Vec<(Template, Result<crate::domain::RunSummary>)> = templates
        .par_iter()
        .map(|&template| (template, run_template(template, &args.common)))
        .collect();

    let mut first_error: Option<CascadeError> = None;
    for (template, result) in results {
        match result {
            Ok(summary) => println!("{}", crate::report::format_run_summary(&summary)),
            Err(err) => {
                tracing::error!(template = template.display_name(), %err, "run failed");
                if first_error.is_none() {
                    first_error = Some(err);
                }
            }
        }
    }

    match first_error {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

fn run_template(template: Template, common: &CommonArgs) -> Result<crate::domain::RunSummary> {
    let config = crate::config::resolve(template, common.root.clone(), common.seed)?;
    tracing::info!(
        template = template.display_name(),
        root = %config.root.display(),
        "starting template run"
    );
    pipeline::run_analysis(&config)
}
