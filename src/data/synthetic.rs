//! Synthetic correspondence records from known parameters.
//!
//! Points are drawn uniformly inside a lat/lon box and projected with the
//! given parameters; optional Gaussian noise (meters, per axis) imitates the
//! rounding and picking error of coordinates read off the mission editor.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;

use crate::domain::{CorrespondenceRecord, GeodeticCoordinate, LocalCoordinate, ProjectionParameters};
use crate::error::{AppError, ProjectionError};
use crate::projection::ForwardProjector;

/// Settings for [`generate_synthetic`].
#[derive(Debug, Clone, PartialEq)]
pub struct SynthConfig {
    pub params: ProjectionParameters,
    pub lat_min: f64,
    pub lat_max: f64,
    pub lon_min: f64,
    pub lon_max: f64,
    pub count: usize,
    /// Standard deviation of the per-axis noise in meters (0 = exact).
    pub noise: f64,
    pub seed: u64,
}

/// Exact records for `points` under `params`, labelled `1..=n`.
pub fn synthetic_records(
    projector: &dyn ForwardProjector,
    params: &ProjectionParameters,
    points: &[GeodeticCoordinate],
) -> Result<Vec<CorrespondenceRecord>, ProjectionError> {
    let projected = projector.project_batch(params, points)?;
    Ok(points
        .iter()
        .zip(projected)
        .enumerate()
        .map(|(i, (g, local))| CorrespondenceRecord {
            label: (i + 1).to_string(),
            geodetic: *g,
            local,
        })
        .collect())
}

/// Draw `config.count` random records inside the configured box.
pub fn generate_synthetic(
    projector: &dyn ForwardProjector,
    config: &SynthConfig,
) -> Result<Vec<CorrespondenceRecord>, AppError> {
    if config.count == 0 {
        return Err(AppError::new(2, "Sample count must be > 0."));
    }
    if !(config.lat_min.is_finite() && config.lat_max.is_finite() && config.lat_max > config.lat_min) {
        return Err(AppError::new(2, "Invalid latitude range for synthetic data."));
    }
    if !(config.lon_min.is_finite() && config.lon_max.is_finite() && config.lon_max > config.lon_min) {
        return Err(AppError::new(2, "Invalid longitude range for synthetic data."));
    }
    if !(config.noise.is_finite() && config.noise >= 0.0) {
        return Err(AppError::new(2, "Noise must be finite and >= 0."));
    }

    let mut rng = StdRng::seed_from_u64(synth_seed(config));
    let normal = Normal::new(0.0, 1.0).map_err(|e| AppError::new(4, format!("Noise distribution error: {e}")))?;

    let mut points = Vec::with_capacity(config.count);
    for _ in 0..config.count {
        let lat = rng.gen_range(config.lat_min..=config.lat_max);
        let lon = rng.gen_range(config.lon_min..=config.lon_max);
        let point = GeodeticCoordinate::new(lat, lon).map_err(|e| AppError::new(2, format!("Synthetic box: {e}")))?;
        points.push(point);
    }

    let mut records = synthetic_records(projector, &config.params, &points)?;
    if config.noise > 0.0 {
        for r in &mut records {
            r.local = LocalCoordinate::new(
                r.local.x + config.noise * normal.sample(&mut rng),
                r.local.z + config.noise * normal.sample(&mut rng),
            );
        }
    }
    log::info!(
        "generated {} synthetic records (noise {} m, seed {})",
        records.len(),
        config.noise,
        config.seed
    );
    Ok(records)
}

fn synth_seed(config: &SynthConfig) -> u64 {
    let mut hasher = DefaultHasher::new();
    config.seed.hash(&mut hasher);
    config.count.hash(&mut hasher);
    for v in config.params.to_array() {
        v.to_bits().hash(&mut hasher);
    }
    config.lat_min.to_bits().hash(&mut hasher);
    config.lat_max.to_bits().hash(&mut hasher);
    config.lon_min.to_bits().hash(&mut hasher);
    config.lon_max.to_bits().hash(&mut hasher);
    config.noise.to_bits().hash(&mut hasher);
    hasher.finish()
}
