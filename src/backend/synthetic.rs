//! Deterministic reference backend.
//!
//! A real run drives an external binned-likelihood engine; this backend
//! stands in for it with a separable quadratic objective so that:
//!
//! - the binary runs end-to-end without external data products
//! - tests are hermetic and exactly reproducible
//! - the serialize/load contract is exercised for real
//!
//! Each parameter `i` contributes `c_i * (v_i - opt_i)^2` to the objective
//! on top of a per-model base value; a deleted source adds its
//! `significance` to the base instead, so stripping a real component always
//! worsens the reachable minimum. The "optimizers" differ the way the
//! real ones do in practice: the derivative-free pass leaves a small
//! residual around the optimum and skips the covariance matrix, while the
//! Newton-type pass lands exactly (one step on a quadratic) and retains the
//! covariance of the thawed block.

use std::collections::hash_map::DefaultHasher;
use std::fs::File;
use std::hash::{Hash, Hasher};
use std::path::Path;

use nalgebra::DMatrix;
use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;
use serde::{Deserialize, Serialize};

use crate::backend::LikelihoodModel;
use crate::domain::Optimizer;
use crate::error::{CascadeError, Result};

/// Fraction of the distance to the optimum left behind by the
/// derivative-free pass. The Newton-type pass removes it.
const FAST_RESIDUAL: f64 = 1e-3;

/// One scalar parameter of a source's spectrum.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub value: f64,
    pub lower: f64,
    pub upper: f64,
    pub frozen: bool,
    /// Location of this parameter's unconstrained optimum.
    pub optimum: f64,
    /// Quadratic curvature weight; must stay positive for the objective to
    /// have a minimum.
    pub curvature: f64,
}

/// A named source: a group of parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyntheticSource {
    pub name: String,
    pub params: Vec<Parameter>,
    /// Objective penalty incurred while this source is absent from the
    /// model: its emission becomes unmodeled residual that no remaining
    /// component can absorb.
    pub significance: f64,
}

/// In-process likelihood model with a separable quadratic objective.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyntheticModel {
    base_objective: f64,
    sources: Vec<SyntheticSource>,
    /// Covariance of the thawed block from the last precise fit.
    #[serde(skip)]
    covariance: Option<DMatrix<f64>>,
}

impl SyntheticModel {
    pub fn new(base_objective: f64, sources: Vec<SyntheticSource>) -> Self {
        SyntheticModel {
            base_objective,
            sources,
            covariance: None,
        }
    }

    /// Generate a model with two parameters per source (a normalization
    /// first, then a spectral index), seeded deterministically.
    pub fn generate(
        point_sources: &[String],
        diffuse_sources: &[String],
        seed: u64,
    ) -> Result<Self> {
        let mut rng = StdRng::seed_from_u64(mix_seed(seed, point_sources, diffuse_sources));
        // Unit-relative scatter for optima; values start displaced so the
        // first fit stage has work to do.
        let scatter = Normal::<f64>::new(0.0, 0.25)
            .map_err(|e| CascadeError::BackendFit(format!("scatter distribution error: {e}")))?;

        let mut sources = Vec::with_capacity(point_sources.len() + diffuse_sources.len());
        for name in point_sources.iter().chain(diffuse_sources.iter()) {
            let norm_opt = (1.0 + scatter.sample(&mut rng)).max(0.05);
            let index_opt = -2.0 + 0.5 * scatter.sample(&mut rng);
            sources.push(SyntheticSource {
                name: name.clone(),
                params: vec![
                    Parameter {
                        name: "Normalization".to_string(),
                        value: 1.0,
                        lower: 0.0,
                        upper: 10.0,
                        frozen: true,
                        optimum: norm_opt,
                        curvature: rng.gen_range(5.0..50.0),
                    },
                    Parameter {
                        name: "Index".to_string(),
                        value: -2.0,
                        lower: -5.0,
                        upper: -0.5,
                        frozen: true,
                        optimum: index_opt,
                        curvature: rng.gen_range(5.0..50.0),
                    },
                ],
                significance: rng.gen_range(50.0..500.0),
            });
        }

        Ok(SyntheticModel::new(rng.gen_range(9.0e4..1.1e5), sources))
    }

    /// Load a model snapshot previously written by `serialize`.
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let model: SyntheticModel = serde_json::from_reader(file)?;
        Ok(model)
    }

    /// Pin the bounds of one named parameter.
    pub fn set_bounds(&mut self, source: &str, param: &str, lower: f64, upper: f64) -> Result<()> {
        let src = self
            .sources
            .iter_mut()
            .find(|s| s.name == source)
            .ok_or_else(|| CascadeError::NotFound(source.to_string()))?;
        let p = src
            .params
            .iter_mut()
            .find(|p| p.name == param)
            .ok_or_else(|| {
                CascadeError::InvalidArgument(format!(
                    "source '{source}' has no parameter '{param}'"
                ))
            })?;
        p.lower = lower;
        p.upper = upper;
        p.value = p.value.clamp(lower, upper);
        Ok(())
    }

    /// Covariance matrix retained from the last precise fit, if any.
    pub fn covariance(&self) -> Option<&DMatrix<f64>> {
        self.covariance.as_ref()
    }

    /// Current objective value for the current parameter vector.
    pub fn objective(&self) -> f64 {
        let mut total = self.base_objective;
        for src in &self.sources {
            for p in &src.params {
                let d = p.value - p.optimum;
                total += p.curvature * d * d;
            }
        }
        total
    }

    fn params_mut(&mut self) -> impl Iterator<Item = &mut Parameter> {
        self.sources.iter_mut().flat_map(|s| s.params.iter_mut())
    }

    fn params(&self) -> impl Iterator<Item = &Parameter> {
        self.sources.iter().flat_map(|s| s.params.iter())
    }

    #[cfg(test)]
    pub fn frozen_flags(&self) -> Vec<bool> {
        self.params().map(|p| p.frozen).collect()
    }
}

impl LikelihoodModel for SyntheticModel {
    fn source_names(&self) -> Vec<String> {
        self.sources.iter().map(|s| s.name.clone()).collect()
    }

    fn parameter_indices(&self, source: &str) -> Result<Vec<usize>> {
        let mut offset = 0;
        for src in &self.sources {
            if src.name == source {
                return Ok((offset..offset + src.params.len()).collect());
            }
            offset += src.params.len();
        }
        Err(CascadeError::NotFound(source.to_string()))
    }

    fn freeze_all(&mut self) {
        for p in self.params_mut() {
            p.frozen = true;
        }
    }

    fn thaw(&mut self, param_index: usize) {
        if let Some(p) = self.params_mut().nth(param_index) {
            p.frozen = false;
        }
    }

    fn fit(&mut self, optimizer: Optimizer, covariance: bool) -> Result<f64> {
        // Validate curvature of the thawed block before touching values:
        // a non-positive curvature has no minimum, which is this backend's
        // analogue of non-convergence.
        for p in self.params().filter(|p| !p.frozen) {
            if !(p.curvature.is_finite() && p.curvature > 0.0) {
                return Err(CascadeError::BackendFit(format!(
                    "{}: non-positive curvature for parameter '{}'",
                    optimizer.backend_name(),
                    p.name
                )));
            }
        }

        let residual = match optimizer {
            Optimizer::Drmnfb => FAST_RESIDUAL,
            Optimizer::Minuit | Optimizer::NewMinuit => 0.0,
        };

        let mut thawed_curvatures = Vec::new();
        for p in self.params_mut() {
            if p.frozen {
                continue;
            }
            let target = p.optimum.clamp(p.lower, p.upper);
            p.value = target + (p.value - target) * residual;
            thawed_curvatures.push(p.curvature);
        }

        self.covariance = if covariance {
            Some(covariance_of(&thawed_curvatures))
        } else {
            None
        };

        Ok(self.objective())
    }

    fn delete_source(&mut self, source: &str) -> Result<()> {
        match self.sources.iter().position(|s| s.name == source) {
            Some(idx) => {
                let removed = self.sources.remove(idx);
                // The deleted source's emission is now unmodeled residual.
                self.base_objective += removed.significance;
                // Any retained covariance refers to a stale parameter layout.
                self.covariance = None;
                Ok(())
            }
            None => Err(CascadeError::NotFound(source.to_string())),
        }
    }

    fn serialize(&self, dest: &Path) -> Result<()> {
        let file = File::create(dest)?;
        serde_json::to_writer_pretty(file, self)?;
        Ok(())
    }
}

/// Inverse Hessian of the thawed block. The objective is separable, so the
/// Hessian is `diag(2 c_i)` and the covariance is its elementwise inverse.
fn covariance_of(curvatures: &[f64]) -> DMatrix<f64> {
    let n = curvatures.len();
    DMatrix::from_fn(n, n, |r, c| {
        if r == c {
            1.0 / (2.0 * curvatures[r])
        } else {
            0.0
        }
    })
}

/// Mix the user seed with the source-name layout so distinct templates get
/// distinct but reproducible models.
fn mix_seed(seed: u64, point_sources: &[String], diffuse_sources: &[String]) -> u64 {
    let mut hasher = DefaultHasher::new();
    seed.hash(&mut hasher);
    point_sources.hash(&mut hasher);
    diffuse_sources.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_source_model() -> SyntheticModel {
        SyntheticModel::new(
            100.0,
            vec![
                SyntheticSource {
                    name: "p1".to_string(),
                    params: vec![
                        Parameter {
                            name: "Normalization".to_string(),
                            value: 1.0,
                            lower: 0.0,
                            upper: 10.0,
                            frozen: true,
                            optimum: 2.0,
                            curvature: 10.0,
                        },
                        Parameter {
                            name: "Index".to_string(),
                            value: -2.0,
                            lower: -5.0,
                            upper: -0.5,
                            frozen: true,
                            optimum: -2.4,
                            curvature: 20.0,
                        },
                    ],
                    significance: 30.0,
                },
                SyntheticSource {
                    name: "HI".to_string(),
                    params: vec![Parameter {
                        name: "Normalization".to_string(),
                        value: 0.5,
                        lower: 0.0,
                        upper: 10.0,
                        frozen: true,
                        optimum: 1.5,
                        curvature: 4.0,
                    }],
                    significance: 75.0,
                },
            ],
        )
    }

    #[test]
    fn parameter_indices_are_global_and_in_source_order() {
        let model = two_source_model();
        assert_eq!(model.parameter_indices("p1").unwrap(), vec![0, 1]);
        assert_eq!(model.parameter_indices("HI").unwrap(), vec![2]);
        assert!(matches!(
            model.parameter_indices("missing"),
            Err(CascadeError::NotFound(_))
        ));
    }

    #[test]
    fn precise_fit_lands_on_optimum_and_keeps_covariance() {
        let mut model = two_source_model();
        model.thaw(2);
        let obj = model.fit(Optimizer::NewMinuit, true).unwrap();

        // HI normalization moved exactly to its optimum; frozen parameters
        // still contribute their displacement.
        let frozen_penalty = 10.0 * (1.0 - 2.0_f64).powi(2) + 20.0 * (-2.0 - -2.4_f64).powi(2);
        assert!((obj - (100.0 + frozen_penalty)).abs() < 1e-9);

        let cov = model.covariance().unwrap();
        assert_eq!(cov.nrows(), 1);
        assert!((cov[(0, 0)] - 1.0 / 8.0).abs() < 1e-12);
    }

    #[test]
    fn fast_fit_leaves_residual_and_no_covariance() {
        let mut model = two_source_model();
        model.thaw(2);
        model.fit(Optimizer::Drmnfb, false).unwrap();
        assert!(model.covariance().is_none());

        let value = model.params().nth(2).unwrap().value;
        assert!((value - 1.5).abs() > 0.0);
        assert!((value - 1.5).abs() < 1e-2);
    }

    #[test]
    fn fit_respects_bounds() {
        let mut model = two_source_model();
        model.set_bounds("HI", "Normalization", 0.0, 1.0).unwrap();
        model.thaw(2);
        model.fit(Optimizer::NewMinuit, false).unwrap();
        // Optimum 1.5 lies above the upper bound, so the fit stops at it.
        assert!((model.params().nth(2).unwrap().value - 1.0).abs() < 1e-12);
    }

    #[test]
    fn non_positive_curvature_is_a_fit_failure() {
        let mut model = two_source_model();
        model.sources[1].params[0].curvature = 0.0;
        model.thaw(2);
        let err = model.fit(Optimizer::NewMinuit, false).unwrap_err();
        assert!(matches!(err, CascadeError::BackendFit(_)));
    }

    #[test]
    fn delete_source_shrinks_the_model_and_raises_the_objective() {
        let mut model = two_source_model();
        let before = model.objective();
        model.delete_source("HI").unwrap();
        assert_eq!(model.source_names(), vec!["p1".to_string()]);

        // HI's quadratic contribution (4 * (0.5-1.5)^2 = 4) disappears, its
        // significance penalty (75) takes over.
        assert!((model.objective() - (before - 4.0 + 75.0)).abs() < 1e-9);

        assert!(matches!(
            model.delete_source("HI"),
            Err(CascadeError::NotFound(_))
        ));
    }

    #[test]
    fn snapshot_round_trips_through_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mdl_all.json");

        let model = two_source_model();
        LikelihoodModel::serialize(&model, &path).unwrap();
        let loaded = SyntheticModel::load(&path).unwrap();

        assert_eq!(loaded.source_names(), model.source_names());
        assert!((loaded.objective() - model.objective()).abs() < 1e-12);
    }

    #[test]
    fn generate_is_deterministic_per_seed() {
        let ps = vec!["p1".to_string()];
        let ds = vec!["HI".to_string()];
        let a = SyntheticModel::generate(&ps, &ds, 42).unwrap();
        let b = SyntheticModel::generate(&ps, &ds, 42).unwrap();
        let c = SyntheticModel::generate(&ps, &ds, 43).unwrap();
        assert!((a.objective() - b.objective()).abs() < 1e-12);
        assert!((a.objective() - c.objective()).abs() > 0.0);
    }
}
