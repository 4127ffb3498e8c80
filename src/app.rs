//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - runs the calibration pipeline
//! - prints reports/plots
//! - writes optional exports
//! - serves the `project`, `locate` and `synth` helpers

use std::io::{BufRead, Write};

use clap::Parser;

use crate::cli::{BoundsArgs, Command, FitArgs, LocateArgs, ProjectArgs, SynthArgs};
use crate::data::{SynthConfig, generate_synthetic};
use crate::domain::{
    CalibrationConfig, FitFile, GeodeticCoordinate, LocalCoordinate, ParameterBounds, ParameterRange, ProjectionParameters,
    SearchConfig,
};
use crate::error::AppError;
use crate::fit::{LocateResult, locate};
use crate::io::{
    build_fit_file, format_dms, parse_point, read_fit_json, write_fit_json, write_records_csv, write_residuals_csv,
};
use crate::projection::{ForwardProjector, build_projector, projector_for_config};
use crate::report::format::{
    format_cross_validation, format_holdout, format_residual_table, format_run_summary,
};

pub mod pipeline;

/// Entry point for the `tmcal` binary.
pub fn run() -> Result<(), AppError> {
    let cli = crate::cli::Cli::parse();

    match cli.command {
        Command::Fit(args) => handle_fit(args),
        Command::Project(args) => handle_project(args),
        Command::Locate(args) => handle_locate(args),
        Command::Synth(args) => handle_synth(args),
    }
}

fn handle_fit(args: FitArgs) -> Result<(), AppError> {
    let config = fit_config_from_args(&args);
    let projector = projector_for_config(&config)?;
    let run = pipeline::run_fit_with_projector(&config, projector.as_ref())?;

    println!("{}", format_run_summary(&run, &config));
    println!("{}", format_residual_table("Residuals (known - predicted)", &run.residuals));

    if let Some(holdout) = &run.holdout {
        println!("{}", format_holdout(holdout));
    }
    if let Some(cv) = &run.cross_validation {
        println!("{}", format_cross_validation(cv, &run.outcome.params));
    }

    if config.plot {
        let plot = crate::plot::render_residual_map(&run.residuals, config.plot_width, config.plot_height);
        println!("{plot}");
    }

    // Optional exports.
    if let Some(path) = &config.export_residuals {
        write_residuals_csv(path, &run.residuals)?;
        log::info!("residuals written to {}", path.display());
    }
    if let Some(path) = &config.export_fit {
        let fit = build_fit_file(&config, run.outcome.params, run.outcome.cost, run.summary);
        write_fit_json(path, &fit)?;
        log::info!("fit written to {}", path.display());
    }
    if config.debug_bundle {
        let path = crate::debug::write_debug_bundle(std::path::Path::new("debug"), &config, &run, projector.as_ref())?;
        log::info!("debug bundle written to {}", path.display());
    }

    Ok(())
}

fn handle_project(args: ProjectArgs) -> Result<(), AppError> {
    let fit = read_fit_json(&args.fit)?;
    let projector = build_projector(args.projector.unwrap_or(fit.projector), fit.ellipsoid, fit.axes)?;

    let lines: Vec<String> = if args.points.is_empty() {
        std::io::stdin()
            .lock()
            .lines()
            .collect::<Result<_, _>>()
            .map_err(|e| AppError::new(2, format!("Failed to read stdin: {e}")))?
    } else {
        args.points
    };

    let projected = project_lines(projector.as_ref(), &fit, &lines)?;
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    for p in projected {
        writeln!(out, "{:.3} {:.3}", p.x, p.z).map_err(|e| AppError::new(2, format!("Failed to write output: {e}")))?;
    }
    Ok(())
}

/// Parse point lines (blank and `#` lines skipped) and project them in one batch.
pub fn project_lines(
    projector: &dyn ForwardProjector,
    fit: &FitFile,
    lines: &[String],
) -> Result<Vec<LocalCoordinate>, AppError> {
    let mut points: Vec<GeodeticCoordinate> = Vec::new();
    for line in lines {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let point = parse_point(trimmed).map_err(|e| AppError::new(2, format!("Invalid point '{trimmed}': {e}")))?;
        points.push(point);
    }
    if points.is_empty() {
        return Err(AppError::new(3, "No points to project."));
    }
    Ok(projector.project_batch(&fit.parameters, &points)?)
}

fn handle_locate(args: LocateArgs) -> Result<(), AppError> {
    let fit = read_fit_json(&args.fit)?;
    let projector = build_projector(args.projector.unwrap_or(fit.projector), fit.ellipsoid, fit.axes)?;
    let target = LocalCoordinate::new(args.x, args.z);

    let found = locate(projector.as_ref(), &fit.parameters, &target)?;
    print!("{}", format_location(&target, &found));
    Ok(())
}

/// The `locate` report: target, decimal and DMS position, residual.
pub fn format_location(target: &LocalCoordinate, found: &LocateResult) -> String {
    let g = found.geodetic;
    let mut out = String::new();
    out.push_str(&format!("target   : X {:.3} Z {:.3}\n", target.x, target.z));
    out.push_str(&format!("latitude : {:.6} ({})\n", g.latitude, format_dms(g.latitude, 'N', 'S')));
    out.push_str(&format!("longitude: {:.6} ({})\n", g.longitude, format_dms(g.longitude, 'E', 'W')));
    out.push_str(&format!(
        "residual : {:.6} m (projects to X {:.3} Z {:.3}, {} evaluations)\n",
        found.distance, found.projected.x, found.projected.z, found.evaluations
    ));
    out
}

fn handle_synth(args: SynthArgs) -> Result<(), AppError> {
    let projector = build_projector(args.projector.projector, args.projector.ellipsoid, args.projector.axes)?;
    let config = SynthConfig {
        params: ProjectionParameters::new(args.k0, args.lon0, args.x0, args.y0),
        lat_min: args.lat_min,
        lat_max: args.lat_max,
        lon_min: args.lon_min,
        lon_max: args.lon_max,
        count: args.count,
        noise: args.noise,
        seed: args.seed,
    };
    let records = generate_synthetic(projector.as_ref(), &config)?;

    match &args.output {
        Some(path) => {
            let file = std::fs::File::create(path)
                .map_err(|e| AppError::new(2, format!("Failed to create '{}': {e}", path.display())))?;
            write_records_csv(file, &records)?;
            log::info!("{} synthetic records written to {}", records.len(), path.display());
        }
        None => write_records_csv(std::io::stdout().lock(), &records)?,
    }
    Ok(())
}

/// Convert parsed `fit` flags into the pipeline configuration.
pub fn fit_config_from_args(args: &FitArgs) -> CalibrationConfig {
    CalibrationConfig {
        input: args.input.clone(),
        holdout: args.holdout.clone(),
        leave_one_out: args.leave_one_out,

        bounds: bounds_from_args(&args.bounds),
        search: SearchConfig {
            seed: args.seed,
            chains: args.chains,
            max_iter: args.max_iter,
            initial_temp: args.initial_temp,
            restart_temp_ratio: args.restart_ratio,
            profile_steps: args.profile_steps,
            polish: !args.no_polish,
            polish_max_evals: args.polish_max_evals,
        },

        projector: args.projector.projector,
        axes: args.projector.axes,
        ellipsoid: args.projector.ellipsoid,

        plot: args.plot && !args.no_plot,
        plot_width: args.width,
        plot_height: args.height,

        export_residuals: args.export.clone(),
        export_fit: args.export_fit.clone(),
        debug_bundle: args.debug,
    }
}

/// Flag limits keep the default range kinds.
fn bounds_from_args(args: &BoundsArgs) -> ParameterBounds {
    let defaults = ParameterBounds::default();
    let with = |range: ParameterRange, min: f64, max: f64| ParameterRange::new(min, max, range.kind);
    ParameterBounds {
        scale_factor: with(defaults.scale_factor, args.k0_min, args.k0_max),
        central_longitude: with(defaults.central_longitude, args.lon0_min, args.lon0_max),
        false_easting: with(defaults.false_easting, args.x0_min, args.x0_max),
        false_northing: with(defaults.false_northing, args.y0_min, args.y0_max),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use crate::domain::{AxisOrder, RangeKind};
    use crate::projection::TransverseMercator;

    fn persian_gulf_fit() -> FitFile {
        let config = CalibrationConfig::new("points.csv".into());
        build_fit_file(
            &config,
            ProjectionParameters::new(0.9996, 57.0, 75_756.0, -2_894_933.0),
            0.0,
            crate::report::summarize(&[]),
        )
    }

    fn lines(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    fn parse_fit(argv: &[&str]) -> FitArgs {
        match Cli::try_parse_from(argv).unwrap().command {
            Command::Fit(args) => args,
            _ => panic!("expected fit"),
        }
    }

    #[test]
    fn default_flags_match_default_config() {
        let config = fit_config_from_args(&parse_fit(&["tmcal", "fit", "points.csv"]));
        let defaults = CalibrationConfig::new("points.csv".into());

        assert_eq!(config.bounds, defaults.bounds);
        assert_eq!(config.search, defaults.search);
        assert_eq!(config.axes, AxisOrder::NorthingEasting);
        assert!(config.plot);
        assert!(!config.debug_bundle);
    }

    #[test]
    fn flags_override_bounds_and_search() {
        let config = fit_config_from_args(&parse_fit(&[
            "tmcal",
            "fit",
            "points.csv",
            "--lon0-min",
            "50",
            "--lon0-max",
            "60",
            "--chains",
            "2",
            "--no-polish",
            "--no-plot",
            "--axes",
            "easting-northing",
        ]));

        assert_eq!(config.bounds.central_longitude.min, 50.0);
        assert_eq!(config.bounds.central_longitude.max, 60.0);
        assert_eq!(config.bounds.central_longitude.kind, RangeKind::Physical);
        assert_eq!(config.search.chains, 2);
        assert!(!config.search.polish);
        assert!(!config.plot);
        assert_eq!(config.axes, AxisOrder::EastingNorthing);
    }

    #[test]
    fn project_lines_skips_blanks_and_comments() {
        let tm = TransverseMercator::default();
        let fit = persian_gulf_fit();
        let out = project_lines(
            &tm,
            &fit,
            &lines(&["# origin first", "", "26d 10m 18.55s N, 56d 14m 30.96s E", "  ", "27.0 57.0"]),
        )
        .unwrap();

        assert_eq!(out.len(), 2);
        assert!(out[0].x.abs() < 5.0 && out[0].z.abs() < 5.0, "{:?}", out[0]);
        let direct = tm
            .project(&fit.parameters, &GeodeticCoordinate::new(27.0, 57.0).unwrap())
            .unwrap();
        assert_eq!(out[1], direct);
    }

    #[test]
    fn project_lines_without_points_is_not_enough_data() {
        let tm = TransverseMercator::default();
        let err = project_lines(&tm, &persian_gulf_fit(), &lines(&["# nothing", "   "])).unwrap_err();
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn project_lines_reports_bad_points_as_input_errors() {
        let tm = TransverseMercator::default();
        let err = project_lines(&tm, &persian_gulf_fit(), &lines(&["26.0 56.0", "north of here"])).unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(err.message().contains("north of here"));
    }

    #[test]
    fn locate_report_lists_position_in_both_notations() {
        let tm = TransverseMercator::default();
        let fit = persian_gulf_fit();
        let target = LocalCoordinate::new(0.0, 0.0);
        let found = locate(&tm, &fit.parameters, &target).unwrap();
        let text = format_location(&target, &found);

        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[1].starts_with("latitude : 26.1718"), "{}", lines[1]);
        assert!(lines[1].ends_with(" N)"));
        assert!(lines[2].starts_with("longitude: 56.2419"), "{}", lines[2]);
        assert!(lines[2].ends_with(" E)"));
        assert!(lines[3].starts_with("residual : 0.0000"), "{}", lines[3]);
    }
}
