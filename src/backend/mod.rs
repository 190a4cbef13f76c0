//! Likelihood/optimizer backend seam.
//!
//! The cascade core never owns model internals; it drives a mutable model
//! handle through this trait. Mutation rights are deliberately narrow: the
//! parameter-state controller and the cascade may change frozen/thawed state
//! and delete sources, and fit calls update parameter values — nothing else
//! touches the model.

use std::path::Path;

use crate::domain::Optimizer;
use crate::error::Result;

pub mod synthetic;

#[cfg(test)]
pub mod scripted;

pub use synthetic::SyntheticModel;

/// Contract for a likelihood model plus its optimizer.
///
/// Parameter indices are global across the model, in source order; callers
/// must only pass indices obtained from `parameter_indices`.
pub trait LikelihoodModel {
    /// Names of all sources currently in the model.
    fn source_names(&self) -> Vec<String>;

    /// Global parameter indices belonging to one source.
    ///
    /// Fails with `NotFound` when the source is absent.
    fn parameter_indices(&self, source: &str) -> Result<Vec<usize>>;

    /// Freeze every parameter of every source.
    fn freeze_all(&mut self);

    /// Thaw a single parameter by global index.
    fn thaw(&mut self, param_index: usize);

    /// Run the given optimizer over the thawed parameters and return the
    /// objective value (the scalar the optimizer minimizes).
    ///
    /// When `covariance` is set, the covariance matrix of the thawed block
    /// is computed and retained on the model for later inspection.
    /// Non-convergence surfaces as `BackendFit`.
    fn fit(&mut self, optimizer: Optimizer, covariance: bool) -> Result<f64>;

    /// Permanently remove a source from the model.
    ///
    /// Fails with `NotFound` when the source is absent. There is no undo:
    /// the source object is destroyed, not frozen.
    fn delete_source(&mut self, source: &str) -> Result<()>;

    /// Persist a snapshot of the current model to `dest`.
    fn serialize(&self, dest: &Path) -> Result<()>;
}
