//! One full analysis run, shared by `run` and `run-all`.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! resolve config -> build model -> cascade -> journal/exports.

use std::time::Instant;

use crate::config::{self, RunConfig};
use crate::domain::{RunSummary, SourceSet};
use crate::error::Result;
use crate::fit::run_cascade;
use crate::report::{self, FileSink, ResultSink};

/// Execute the full cascade for one resolved configuration.
pub fn run_analysis(config: &RunConfig) -> Result<RunSummary> {
    let started = Instant::now();

    let mut model = config::build_model(config)?;
    let point_sources = SourceSet::new(config.point_sources.iter().cloned());
    let diffuse_sources = SourceSet::new(config.diffuse_sources.iter().cloned());

    let mut sink = FileSink::create(config)?;
    sink.journal(&format!(
        "Starting analysis of {}",
        config.template.diffuse_name()
    ))?;
    sink.journal(&format!(
        "inputs: srcmap={} expcube={} bexpmap={} irfs={}",
        config.source_maps.display(),
        config.livetime_cube.display(),
        config.exposure_map.display(),
        config.irfs
    ))?;

    let records = run_cascade(
        &mut model,
        &point_sources,
        diffuse_sources,
        &config.removal_order,
        &mut sink,
    )?;

    let elapsed_secs = started.elapsed().as_secs_f64();
    sink.journal(&format!(
        "Finished analysis of {}",
        config.template.diffuse_name()
    ))?;
    sink.journal(&format!("Timing: {elapsed_secs:.2}s"))?;

    let summary = RunSummary {
        template: config.template,
        records,
        elapsed_secs,
    };
    report::write_rounds_json(&config::rounds_json_path(config), &summary)?;

    Ok(summary)
}
