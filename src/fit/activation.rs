//! Parameter-state control: which sources float during the next fit.

use crate::backend::LikelihoodModel;
use crate::domain::SourceSet;
use crate::error::{CascadeError, Result};

/// Freeze the whole model, then thaw one parameter per source in `sources`.
///
/// Freezing everything first is the safety baseline: no thawed parameter
/// from a previous stage may leak into the next one. For each named source,
/// only the lowest-indexed parameter is thawed — the normalization, by the
/// backend's layout convention. Spectral shape parameters stay frozen.
///
/// Errors:
/// - `InvalidArgument` for an empty set (a fit with nothing thawed is
///   meaningless)
/// - `NotFound` when a named source is absent from the model
pub fn set_active_sources(model: &mut dyn LikelihoodModel, sources: &SourceSet) -> Result<()> {
    if sources.is_empty() {
        return Err(CascadeError::InvalidArgument(
            "no sources to activate".to_string(),
        ));
    }

    model.freeze_all();

    for name in sources.iter() {
        let indices = model.parameter_indices(name)?;
        let lowest = indices.iter().copied().min().ok_or_else(|| {
            CascadeError::InvalidArgument(format!("source '{name}' has no parameters"))
        })?;
        model.thaw(lowest);
    }

    Ok(())
}
