//! Optimizer invocation.
//!
//! A thin deterministic wrapper: a `Strategy` resolves to a backend
//! algorithm plus a covariance flag, and the backend does the rest. Backend
//! non-convergence is not caught here — it propagates to the caller.

use crate::backend::LikelihoodModel;
use crate::domain::Strategy;
use crate::error::Result;

/// Run one fit with the given strategy and return the objective value.
pub fn fit_once(model: &mut dyn LikelihoodModel, strategy: Strategy) -> Result<f64> {
    tracing::debug!(
        strategy = strategy.display_name(),
        optimizer = strategy.optimizer().backend_name(),
        covariance = strategy.computes_covariance(),
        "invoking optimizer"
    );
    model.fit(strategy.optimizer(), strategy.computes_covariance())
}
