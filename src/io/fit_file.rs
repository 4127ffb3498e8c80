//! Read/write fit JSON files.
//!
//! A fit file is the portable result of `tmcal fit`: the parameters plus
//! everything needed to rebuild the same projector (axes, ellipsoid,
//! projector kind) for `tmcal project` and `tmcal locate`.
//!
//! The schema is defined by `domain::FitFile`.

use std::fs::File;
use std::path::Path;

use chrono::Utc;

use crate::domain::{CalibrationConfig, FitFile, ProjectionParameters, ResidualSummary};
use crate::error::AppError;

pub const TOOL_NAME: &str = "tmcal";

/// Assemble the fit file for a finished run.
pub fn build_fit_file(
    config: &CalibrationConfig,
    params: ProjectionParameters,
    cost: f64,
    summary: ResidualSummary,
) -> FitFile {
    FitFile {
        tool: TOOL_NAME.to_string(),
        created_at: Utc::now(),
        parameters: params,
        bounds: config.bounds,
        axes: config.axes,
        ellipsoid: config.ellipsoid,
        projector: config.projector,
        cost,
        summary,
    }
}

/// Write a fit JSON file.
pub fn write_fit_json(path: &Path, fit: &FitFile) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create fit JSON '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(file, fit).map_err(|e| AppError::new(2, format!("Failed to write fit JSON: {e}")))?;
    Ok(())
}

/// Read a fit JSON file.
pub fn read_fit_json(path: &Path) -> Result<FitFile, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open fit JSON '{}': {e}", path.display())))?;
    let fit: FitFile =
        serde_json::from_reader(file).map_err(|e| AppError::new(2, format!("Invalid fit JSON: {e}")))?;
    if !fit.parameters.is_finite() || fit.parameters.scale_factor <= 0.0 {
        return Err(AppError::new(
            2,
            format!("Fit JSON '{}' has invalid parameters.", path.display()),
        ));
    }
    Ok(fit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AxisOrder, Ellipsoid, ParameterBounds, ProjectorKind};

    fn sample() -> FitFile {
        FitFile {
            tool: TOOL_NAME.to_string(),
            created_at: Utc::now(),
            parameters: ProjectionParameters::new(0.9996, 57.0, 75_756.0, -2_894_933.0),
            bounds: ParameterBounds::default(),
            axes: AxisOrder::NorthingEasting,
            ellipsoid: Ellipsoid::Wgs84,
            projector: ProjectorKind::Tmerc,
            cost: 0.52,
            summary: ResidualSummary {
                n: 6,
                sse: 0.52,
                rms: 0.29,
                max: 0.5,
                mean_dx: 0.0,
                mean_dz: 0.0,
            },
        }
    }

    #[test]
    fn fit_file_survives_disk() {
        let path = std::env::temp_dir().join(format!("tmcal_fit_{}.json", std::process::id()));
        let fit = sample();
        write_fit_json(&path, &fit).unwrap();
        let back = read_fit_json(&path).unwrap();
        let _ = std::fs::remove_file(&path);

        assert_eq!(back.parameters, fit.parameters);
        assert_eq!(back.axes, fit.axes);
        assert_eq!(back.created_at, fit.created_at);
        assert_eq!(back.summary, fit.summary);
    }

    #[test]
    fn rejects_non_positive_scale() {
        let path = std::env::temp_dir().join(format!("tmcal_badfit_{}.json", std::process::id()));
        let mut fit = sample();
        fit.parameters.scale_factor = 0.0;
        write_fit_json(&path, &fit).unwrap();
        let err = read_fit_json(&path).unwrap_err();
        let _ = std::fs::remove_file(&path);
        assert_eq!(err.exit_code(), 2);
    }
}
