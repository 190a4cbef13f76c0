//! Result persistence: log-likelihood records, run journal, model artifacts.
//!
//! The cascade itself performs no I/O; it hands every result to a
//! `ResultSink`. `FileSink` is the durable implementation: an append-only
//! log-likelihood record file, a timestamped run journal, and one serialized
//! model snapshot per round, all under the template's output directory.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Utc;

use crate::backend::LikelihoodModel;
use crate::config::RunConfig;
use crate::domain::RunSummary;
use crate::error::Result;

pub mod format;

pub use format::format_run_summary;

/// Destination for per-round results. Append-only: records are never
/// rewritten, so rounds persisted before a failure remain valid.
pub trait ResultSink {
    /// Record one round's final log-likelihood under its label.
    fn record_log_likelihood(&mut self, label: &str, log_likelihood: f64) -> Result<()>;

    /// Persist the fitted model under a round-specific label and return the
    /// artifact path.
    fn persist_model(&mut self, label: &str, model: &dyn LikelihoodModel) -> Result<PathBuf>;

    /// Append a progress line to the run journal.
    fn journal(&mut self, line: &str) -> Result<()>;
}

/// File-backed sink writing into a template's output directory.
pub struct FileSink {
    outdir: PathBuf,
    log_like: File,
    journal: File,
}

impl FileSink {
    /// Open (creating as needed) the sink files for one run.
    pub fn create(config: &RunConfig) -> Result<Self> {
        fs::create_dir_all(&config.outdir)?;
        let log_like = append_file(&config.outdir.join("LogLike.dat"))?;
        let journal = append_file(&config.outdir.join("journal.log"))?;
        Ok(FileSink {
            outdir: config.outdir.clone(),
            log_like,
            journal,
        })
    }
}

fn append_file(path: &Path) -> Result<File> {
    Ok(OpenOptions::new().create(true).append(true).open(path)?)
}

impl ResultSink for FileSink {
    fn record_log_likelihood(&mut self, label: &str, log_likelihood: f64) -> Result<()> {
        writeln!(self.log_like, "Log(like) for {label} = {log_likelihood:.4}")?;
        Ok(())
    }

    fn persist_model(&mut self, label: &str, model: &dyn LikelihoodModel) -> Result<PathBuf> {
        let path = self.outdir.join(format!("mdl_{label}.json"));
        model.serialize(&path)?;
        Ok(path)
    }

    fn journal(&mut self, line: &str) -> Result<()> {
        let stamp = Utc::now().format("%Y-%m-%d %H:%M:%S");
        writeln!(self.journal, "[{stamp}] {line}")?;
        Ok(())
    }
}

/// Export the whole run's round records as JSON next to the artifacts.
pub fn write_rounds_json(path: &Path, summary: &RunSummary) -> Result<()> {
    let file = File::create(path)?;
    serde_json::to_writer_pretty(file, summary)?;
    Ok(())
}
