//! Run-configuration resolution.
//!
//! A `Template` key resolves to an explicit `RunConfig` value: working
//! directories, model-definition path, exposure/livetime inputs, instrument
//! response, source-name lists, and the cascade's removal order. The config
//! is passed by value into the pipeline — nothing here is ambient state.

use std::path::PathBuf;

use crate::backend::SyntheticModel;
use crate::domain::Template;
use crate::error::{CascadeError, Result};

/// Instrument response functions used by every template.
pub const IRFS: &str = "P8R2_ULTRACLEANVETO_V6";

/// Diffuse components present in every model, before the template's own
/// component is appended.
const BASE_DIFFUSE: [&str; 4] = ["HI", "bubble", "eg_v05", "galprop"];

/// Candidates stripped by the comparison cascade, in removal order.
const REMOVAL_ORDER: [&str; 2] = ["bubble", "HI"];

/// Nearby, strong, or highly curved point sources whose normalizations
/// float during the point-source stages.
const POINT_SOURCES: [&str; 11] = [
    "3FGL J1621.1-2331",
    "3FGL J1628.0-3203",
    "3FGL J1614.5-2231",
    "3FGL J1617.3-2519",
    "3FGL J1714.6-3327",
    "3FGL J1616.8-2300",
    "3FGL J1626.0-2951",
    "3FGL J1625.7-2527",
    "3FGL J1553.3-2421",
    "3FGL J1645.7-2149",
    "3FGL J1625.6-2058",
];

/// Normalization bounds pinned on the isotropic component when the model is
/// not the standard interstellar emission model.
const ISOTROPIC_BOUNDS: (f64, f64) = (0.2, 1.3);

/// A full run's configuration as understood by the pipeline.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub template: Template,
    /// Analysis root holding the shared observation inputs.
    pub root: PathBuf,
    /// Per-template results directory (the root itself for Fermi).
    pub outdir: PathBuf,
    /// Model-definition snapshot; generated when absent.
    pub model_file: PathBuf,
    pub exposure_map: PathBuf,
    pub livetime_cube: PathBuf,
    pub source_maps: PathBuf,
    pub irfs: String,
    pub point_sources: Vec<String>,
    pub diffuse_sources: Vec<String>,
    pub removal_order: Vec<String>,
    /// Seed for synthetic model generation when no model file exists.
    pub seed: u64,
}

/// Resolve a template key into a `RunConfig`.
///
/// `root` falls back to the `CASCADE_ROOT` environment variable (a `.env`
/// file is honored).
pub fn resolve(template: Template, root: Option<PathBuf>, seed: u64) -> Result<RunConfig> {
    let root = match root {
        Some(root) => root,
        None => root_from_env()?,
    };

    let outdir = match template.dir_name() {
        Some(dir) => root.join(dir),
        None => root.clone(),
    };

    let model_file = match template.dir_name() {
        Some(dir) => root
            .join(dir)
            .join(format!("mdl_{}.json", dir.to_lowercase())),
        None => root.join("model_3fgl.json"),
    };

    let source_maps = match template {
        Template::Fermi => root.join("srcmap_fermi.fits"),
        _ => root.join("srcmap_allDiff_oldIC.fits"),
    };

    let mut diffuse_sources: Vec<String> = BASE_DIFFUSE.iter().map(|s| s.to_string()).collect();
    diffuse_sources.push(template.diffuse_name().to_string());

    Ok(RunConfig {
        template,
        exposure_map: root.join("bexpmap.fits"),
        livetime_cube: root.join("ltCube.fits"),
        source_maps,
        irfs: IRFS.to_string(),
        point_sources: POINT_SOURCES.iter().map(|s| s.to_string()).collect(),
        diffuse_sources,
        removal_order: REMOVAL_ORDER.iter().map(|s| s.to_string()).collect(),
        seed,
        root,
        outdir,
        model_file,
    })
}

fn root_from_env() -> Result<PathBuf> {
    dotenvy::dotenv().ok();
    std::env::var("CASCADE_ROOT")
        .map(PathBuf::from)
        .map_err(|_| {
            CascadeError::Config(
                "missing analysis root: pass --root or set CASCADE_ROOT (.env)".to_string(),
            )
        })
}

/// Construct the initial model for a run.
///
/// An existing model file is loaded; otherwise a synthetic model is
/// generated from the configured source lists with the configured seed. For
/// non-Fermi templates the isotropic component's normalization bounds are
/// pinned so the template's own diffuse component absorbs the large-scale
/// emission instead.
pub fn build_model(config: &RunConfig) -> Result<SyntheticModel> {
    let mut model = if config.model_file.is_file() {
        tracing::info!(path = %config.model_file.display(), "loading model definition");
        SyntheticModel::load(&config.model_file)?
    } else {
        tracing::info!(
            seed = config.seed,
            "no model file; generating synthetic model"
        );
        SyntheticModel::generate(&config.point_sources, &config.diffuse_sources, config.seed)?
    };

    if config.template != Template::Fermi {
        model.set_bounds(
            "eg_v05",
            "Normalization",
            ISOTROPIC_BOUNDS.0,
            ISOTROPIC_BOUNDS.1,
        )?;
    }

    Ok(model)
}

/// Where the run's round-record JSON lands.
pub fn rounds_json_path(config: &RunConfig) -> PathBuf {
    config.outdir.join("rounds.json")
}
