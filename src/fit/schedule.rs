//! The iterative fit schedule: converge one model configuration.
//!
//! The sequence is fixed — five stages, no branching, no retry:
//!
//! 1. point sources, fast
//! 2. diffuse sources, fast
//! 3. diffuse sources (still active), precise
//! 4. point sources, fast
//! 5. diffuse sources, precise
//!
//! Point-source and diffuse degrees of freedom are isolated on purpose:
//! fitting them together would optimize a high-dimensional, partially
//! degenerate space in one shot. The precise stages pin down accurate
//! diffuse values plus their covariance; stage 4 then re-optimizes the
//! point sources against the refined diffuse background.

use crate::backend::LikelihoodModel;
use crate::domain::{ScheduleTrace, SourceSet, Strategy};
use crate::error::Result;
use crate::fit::{fit_once, set_active_sources};

/// Run the five-stage schedule and return the per-stage trace.
///
/// The final stage's value is the schedule's result
/// (`ScheduleTrace::final_log_likelihood`); earlier values are kept for
/// diagnostics only. A failure at any stage is terminal.
pub fn converge(
    model: &mut dyn LikelihoodModel,
    point_sources: &SourceSet,
    diffuse_sources: &SourceSet,
) -> Result<ScheduleTrace> {
    let mut stages = Vec::with_capacity(5);

    tracing::info!(
        n = point_sources.len(),
        "fitting point-source normalizations"
    );
    set_active_sources(model, point_sources)?;
    stages.push(fit_once(model, Strategy::Fast)?);
    tracing::debug!(stage = 1, log_likelihood = stages[0]);

    tracing::info!(sources = ?diffuse_sources.names(), "fitting diffuse sources");
    set_active_sources(model, diffuse_sources)?;
    stages.push(fit_once(model, Strategy::Fast)?);
    tracing::debug!(stage = 2, log_likelihood = stages[1]);

    // Diffuse set stays active; refine in place with covariance.
    tracing::info!("precise fit on diffuse sources");
    stages.push(fit_once(model, Strategy::Precise)?);
    tracing::debug!(stage = 3, log_likelihood = stages[2]);

    tracing::info!("re-fitting point sources against refined diffuse background");
    set_active_sources(model, point_sources)?;
    stages.push(fit_once(model, Strategy::Fast)?);
    tracing::debug!(stage = 4, log_likelihood = stages[3]);

    tracing::info!("final precise fit on diffuse sources");
    set_active_sources(model, diffuse_sources)?;
    stages.push(fit_once(model, Strategy::Precise)?);
    tracing::debug!(stage = 5, log_likelihood = stages[4]);

    Ok(ScheduleTrace {
        stage_log_likelihoods: stages,
    })
}
