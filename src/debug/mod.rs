//! Debug bundle writer for inspecting a fit run.
//!
//! The bundle is a Markdown file with the run settings, every search phase,
//! the residual table and a one-parameter-at-a-time cost sensitivity table
//! around the optimum.

use std::fs::{File, create_dir_all};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Local;

use crate::app::pipeline::RunOutput;
use crate::domain::{CalibrationConfig, ParameterBounds, ProjectionParameters};
use crate::error::AppError;
use crate::fit::{WinnerSource, cost};
use crate::projection::{ForwardProjector, proj_definition};

/// Per-parameter perturbations for the sensitivity table: (k0, lon0, x0, y0).
const SENSITIVITY_STEPS: [f64; 4] = [1e-5, 1e-3, 1.0, 1.0];

fn write_err(e: std::io::Error) -> AppError {
    AppError::new(4, format!("Failed to write debug bundle: {e}"))
}

/// Write a bundle under `dir` and return its path.
pub fn write_debug_bundle(
    dir: &Path,
    config: &CalibrationConfig,
    run: &RunOutput,
    projector: &dyn ForwardProjector,
) -> Result<PathBuf, AppError> {
    create_dir_all(dir).map_err(|e| AppError::new(4, format!("Failed to create debug dir: {e}")))?;

    let ts = Local::now().format("%Y%m%d_%H%M%S");
    let path = dir.join(format!("tmcal_debug_seed{}_{}.md", config.search.seed, ts));
    let mut file = File::create(&path).map_err(|e| AppError::new(4, format!("Failed to create debug file: {e}")))?;

    let outcome = &run.outcome;
    let search = &config.search;

    writeln!(file, "# tmcal debug bundle").map_err(write_err)?;
    writeln!(file, "- generated: {}", Local::now().to_rfc3339()).map_err(write_err)?;
    writeln!(file, "- input: {} ({} records)", config.input.display(), run.records.len()).map_err(write_err)?;
    writeln!(
        file,
        "- projector: {} | axes: {:?} | ellipsoid: {:?}",
        run.projector, config.axes, config.ellipsoid
    )
    .map_err(write_err)?;
    writeln!(
        file,
        "- search: seed={} chains={} max_iter={} T0={} restart_ratio={} profile_steps={} polish={} (max {} evals)",
        search.seed,
        search.chains,
        search.max_iter,
        search.initial_temp,
        search.restart_temp_ratio,
        search.profile_steps,
        search.polish,
        search.polish_max_evals
    )
    .map_err(write_err)?;

    writeln!(file, "\n## Bounds").map_err(write_err)?;
    writeln!(file, "| parameter | min | max | kind |").map_err(write_err)?;
    writeln!(file, "| - | - | - | - |").map_err(write_err)?;
    for (name, range) in ParameterBounds::NAMES.iter().zip(config.bounds.ranges()) {
        writeln!(file, "| {name} | {} | {} | {:?} |", range.min, range.max, range.kind).map_err(write_err)?;
    }

    writeln!(file, "\n## Profile seed").map_err(write_err)?;
    match &outcome.profile {
        Some(seed) => {
            writeln!(
                file,
                "- grid: index {} of step {:.4} deg",
                seed.grid_index, seed.grid_step
            )
            .map_err(write_err)?;
            writeln!(file, "- params: {}", fmt_params(&seed.params)).map_err(write_err)?;
            writeln!(file, "- cost: {:.6e}", seed.cost).map_err(write_err)?;
        }
        None => writeln!(file, "- none (disabled, too few records, or no feasible meridian)").map_err(write_err)?,
    }

    writeln!(file, "\n## Annealing chains").map_err(write_err)?;
    writeln!(file, "| chain | seed | start cost | best cost | evaluations | accepted | restarts |").map_err(write_err)?;
    writeln!(file, "| - | - | - | - | - | - | - |").map_err(write_err)?;
    for c in &outcome.chains {
        writeln!(
            file,
            "| {} | {} | {:.6e} | {:.6e} | {} | {} | {} |",
            c.chain, c.seed, c.start_cost, c.cost, c.evaluations, c.accepted, c.restarts
        )
        .map_err(write_err)?;
    }

    writeln!(file, "\n## Result").map_err(write_err)?;
    let winner = match outcome.winner {
        WinnerSource::Profile => "profile seed".to_string(),
        WinnerSource::Chain(c) => format!("chain {c}"),
    };
    writeln!(file, "- winner before polish: {winner} (cost {:.6e})", outcome.pre_polish_cost).map_err(write_err)?;
    writeln!(file, "- status: {}", outcome.status.as_str()).map_err(write_err)?;
    writeln!(
        file,
        "- evaluations: {} ({} infeasible)",
        outcome.evaluations, outcome.infeasible
    )
    .map_err(write_err)?;
    writeln!(file, "- params: {}", fmt_params(&outcome.params)).map_err(write_err)?;
    writeln!(file, "- cost: {:.6e}", outcome.cost).map_err(write_err)?;
    writeln!(
        file,
        "- proj: `{}`",
        proj_definition(&outcome.params, config.ellipsoid).join(" ")
    )
    .map_err(write_err)?;

    writeln!(file, "\n## Residuals").map_err(write_err)?;
    writeln!(file, "| label | x | z | x_fit | z_fit | dx | dz | distance |").map_err(write_err)?;
    writeln!(file, "| - | - | - | - | - | - | - | - |").map_err(write_err)?;
    for r in &run.residuals {
        writeln!(
            file,
            "| {} | {:.3} | {:.3} | {:.3} | {:.3} | {:.3} | {:.3} | {:.3} |",
            r.record.label, r.record.local.x, r.record.local.z, r.predicted.x, r.predicted.z, r.dx, r.dz, r.distance
        )
        .map_err(write_err)?;
    }

    writeln!(file, "\n## Cost sensitivity").map_err(write_err)?;
    writeln!(file, "| parameter | step | cost(-step) | cost | cost(+step) |").map_err(write_err)?;
    writeln!(file, "| - | - | - | - | - |").map_err(write_err)?;
    for (i, (name, step)) in ParameterBounds::NAMES.iter().zip(SENSITIVITY_STEPS).enumerate() {
        let (minus, plus) = sensitivity(projector, run, i, step);
        writeln!(
            file,
            "| {name} | {step} | {} | {:.6e} | {} |",
            fmt_cost(minus),
            outcome.cost,
            fmt_cost(plus)
        )
        .map_err(write_err)?;
    }

    Ok(path)
}

fn sensitivity(projector: &dyn ForwardProjector, run: &RunOutput, index: usize, step: f64) -> (f64, f64) {
    let shifted = |delta: f64| {
        let mut v = run.outcome.params.to_array();
        v[index] += delta;
        cost(projector, &ProjectionParameters::from_array(v), &run.records)
    };
    (shifted(-step), shifted(step))
}

fn fmt_params(p: &ProjectionParameters) -> String {
    format!(
        "k0={:.10} lon0={:.8} x0={:.4} y0={:.4}",
        p.scale_factor, p.central_longitude, p.false_easting, p.false_northing
    )
}

fn fmt_cost(value: f64) -> String {
    if value.is_finite() {
        format!("{value:.6e}")
    } else {
        "inf".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::pipeline::run_fit_with_records;
    use crate::data::synthetic_records;
    use crate::domain::GeodeticCoordinate;
    use crate::projection::TransverseMercator;

    #[test]
    fn bundle_contains_every_section() {
        let tm = TransverseMercator::default();
        let truth = ProjectionParameters::new(0.9996, 57.0, 75_756.0, -2_894_933.0);
        let points: Vec<GeodeticCoordinate> = [(24.4, 56.6), (25.7, 58.5), (27.4, 57.2), (30.3, 51.5)]
            .iter()
            .map(|&(lat, lon)| GeodeticCoordinate::new(lat, lon).unwrap())
            .collect();
        let records = synthetic_records(&tm, &truth, &points).unwrap();

        let mut config = CalibrationConfig::new(PathBuf::from("synthetic.csv"));
        config.search.max_iter = 100;
        let run = run_fit_with_records(&config, &tm, records).unwrap();

        let dir = std::env::temp_dir().join(format!("tmcal_debug_{}", std::process::id()));
        let path = write_debug_bundle(&dir, &config, &run, &tm).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let _ = std::fs::remove_dir_all(&dir);

        for section in ["## Bounds", "## Profile seed", "## Annealing chains", "## Result", "## Residuals", "## Cost sensitivity"] {
            assert!(text.contains(section), "missing {section}");
        }
        assert!(text.contains("+proj=tmerc"));
    }
}
