//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory while driving the fit cascade
//! - exported to JSON alongside the model artifacts
//! - reloaded later for comparisons across templates

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::CascadeError;

/// Optimization strategy selected per fit stage.
///
/// The scheduler alternates between the two: `Fast` for cheap intermediate
/// passes, `Precise` wherever an accurate optimum and a covariance matrix
/// are required.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Robust derivative-free pass; no covariance matrix.
    Fast,
    /// Newton-type pass with the covariance matrix computed as a side effect.
    Precise,
}

impl Strategy {
    /// Parse a strategy name (case-insensitive).
    ///
    /// This is the only place strategy strings are interpreted; everything
    /// past this boundary works with the closed enum.
    pub fn parse(name: &str) -> Result<Self, CascadeError> {
        match name.to_ascii_lowercase().as_str() {
            "fast" => Ok(Strategy::Fast),
            "precise" => Ok(Strategy::Precise),
            _ => Err(CascadeError::UnsupportedStrategy(name.to_string())),
        }
    }

    /// Backend algorithm this strategy resolves to.
    pub fn optimizer(self) -> Optimizer {
        match self {
            Strategy::Fast => Optimizer::Drmnfb,
            Strategy::Precise => Optimizer::NewMinuit,
        }
    }

    /// Whether the backend should compute a covariance matrix.
    pub fn computes_covariance(self) -> bool {
        matches!(self, Strategy::Precise)
    }

    /// Human-readable label for logs and journals.
    pub fn display_name(self) -> &'static str {
        match self {
            Strategy::Fast => "fast",
            Strategy::Precise => "precise",
        }
    }
}

/// Backend optimizer algorithm identifiers.
///
/// `Minuit` and `NewMinuit` are functionally equivalent at this layer; the
/// precise strategy resolves to `NewMinuit` and `Minuit` remains available
/// for backends that only ship the older variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Optimizer {
    Drmnfb,
    Minuit,
    NewMinuit,
}

impl Optimizer {
    /// Algorithm name as the backend spells it.
    pub fn backend_name(self) -> &'static str {
        match self {
            Optimizer::Drmnfb => "DRMNFB",
            Optimizer::Minuit => "Minuit",
            Optimizer::NewMinuit => "NewMinuit",
        }
    }
}

/// Analysis template: which dust-tracer column density map backs the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Template {
    Tau353,
    Nicer,
    Nicest,
    DobDss,
    Dob2Mass,
    /// Standard interstellar emission model; shares the root directory
    /// instead of owning a template subdirectory.
    Fermi,
}

impl Template {
    pub const ALL: [Template; 6] = [
        Template::Tau353,
        Template::Nicer,
        Template::Nicest,
        Template::DobDss,
        Template::Dob2Mass,
        Template::Fermi,
    ];

    /// Results/sourcemap subdirectory name, `None` for the Fermi template
    /// which lives at the analysis root.
    pub fn dir_name(self) -> Option<&'static str> {
        match self {
            Template::Tau353 => Some("Tau353"),
            Template::Nicer => Some("NICER"),
            Template::Nicest => Some("NICEST"),
            Template::DobDss => Some("DobDSS"),
            Template::Dob2Mass => Some("Dob2MASS"),
            Template::Fermi => None,
        }
    }

    /// Name of the template's own diffuse component inside the model.
    pub fn diffuse_name(self) -> &'static str {
        match self {
            Template::Tau353 => "Tau353",
            Template::Nicer => "NICER",
            Template::Nicest => "NICEST",
            Template::DobDss => "Dobashi DSS",
            Template::Dob2Mass => "Dobashi 2MASS",
            Template::Fermi => "fermi",
        }
    }

    /// Human-readable label for logs and summaries.
    pub fn display_name(self) -> &'static str {
        match self {
            Template::Tau353 => "Tau353",
            Template::Nicer => "NICER",
            Template::Nicest => "NICEST",
            Template::DobDss => "DobDSS",
            Template::Dob2Mass => "Dob2MASS",
            Template::Fermi => "fermi",
        }
    }
}

/// An ordered sequence of source names with no duplicates.
///
/// Order only matters for logging and journal output; activation semantics
/// are order-independent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSet {
    names: Vec<String>,
}

impl SourceSet {
    /// Build a set from names, keeping first occurrences in order.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut out: Vec<String> = Vec::new();
        for name in names {
            let name = name.into();
            if !out.contains(&name) {
                out.push(name);
            }
        }
        SourceSet { names: out }
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    /// Remove one name; fails with `NotFound` when absent so a stale removal
    /// list surfaces as a config mismatch instead of a silent no-op.
    pub fn remove(&mut self, name: &str) -> Result<(), CascadeError> {
        match self.names.iter().position(|n| n == name) {
            Some(idx) => {
                self.names.remove(idx);
                Ok(())
            }
            None => Err(CascadeError::NotFound(name.to_string())),
        }
    }
}

/// Per-stage diagnostics from one scheduler invocation.
///
/// Only the final value is the scheduler's contract output; the rest exists
/// so no intermediate fit result is discarded silently.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleTrace {
    /// Log-likelihood after each of the five stages, in execution order.
    pub stage_log_likelihoods: Vec<f64>,
}

impl ScheduleTrace {
    /// Final-stage log-likelihood.
    ///
    /// # Panics
    /// Panics on an empty trace; the scheduler always records five stages.
    pub fn final_log_likelihood(&self) -> f64 {
        *self
            .stage_log_likelihoods
            .last()
            .expect("trace always holds at least one stage")
    }
}

/// One cascade round's immutable record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundRecord {
    /// 0 = full model, then one round per removed source.
    pub round: usize,
    /// Label derived from the cumulative removal list (`all`, `no_bubble`, ...).
    pub label: String,
    /// Snapshot of the diffuse set active during this round.
    pub diffuse_sources: Vec<String>,
    /// Final log-likelihood of the round's scheduler run.
    pub log_likelihood: f64,
    /// Per-stage diagnostics.
    pub trace: ScheduleTrace,
    /// Where the fitted model snapshot was persisted.
    pub model_artifact: PathBuf,
    pub recorded_at: DateTime<Utc>,
}

/// All computed outputs of a single template run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub template: Template,
    pub records: Vec<RoundRecord>,
    /// Wall-clock seconds for the whole cascade.
    pub elapsed_secs: f64,
}
