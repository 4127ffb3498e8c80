//! Command-line parsing for the transverse Mercator calibrator.
//!
//! The goal of this module is to keep **argument parsing** separate from the
//! search and projection code. Everything here is converted into plain
//! config structs by `app` before any work happens.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::{AxisOrder, EARTH_CIRCUMFERENCE_M, Ellipsoid, ProjectorKind};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "tmcal",
    version,
    about = "Fit transverse Mercator parameters that map lat/lon onto a game map's local X/Z"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fit projection parameters to a correspondence CSV and report residuals.
    Fit(FitArgs),
    /// Project lat/lon pairs into local X/Z with a saved fit.
    Project(ProjectArgs),
    /// Find the lat/lon that projects onto a local X/Z point (default: the map origin).
    Locate(LocateArgs),
    /// Generate a synthetic correspondence CSV from known parameters.
    Synth(SynthArgs),
}

/// Projector selection shared by every subcommand that projects.
#[derive(Debug, Args, Clone)]
pub struct ProjectorArgs {
    /// Forward projector implementation.
    #[arg(long, value_enum, default_value_t = ProjectorKind::Tmerc)]
    pub projector: ProjectorKind,

    /// How projected (easting, northing) map onto local (X, Z).
    #[arg(long, value_enum, default_value_t = AxisOrder::NorthingEasting)]
    pub axes: AxisOrder,

    /// Reference ellipsoid.
    #[arg(long, value_enum, default_value_t = Ellipsoid::Wgs84)]
    pub ellipsoid: Ellipsoid,
}

/// Search bounds per parameter.
#[derive(Debug, Args, Clone)]
pub struct BoundsArgs {
    /// Lower bound for the scale factor k0 (must be > 0).
    #[arg(long, default_value_t = 0.1)]
    pub k0_min: f64,

    /// Upper bound for the scale factor k0.
    #[arg(long, default_value_t = 10.0)]
    pub k0_max: f64,

    /// Lower bound for the central meridian lon0 (degrees).
    #[arg(long, default_value_t = -180.0, allow_negative_numbers = true)]
    pub lon0_min: f64,

    /// Upper bound for the central meridian lon0 (degrees).
    #[arg(long, default_value_t = 180.0, allow_negative_numbers = true)]
    pub lon0_max: f64,

    /// Lower bound for the false easting x0 (meters).
    #[arg(long, default_value_t = -EARTH_CIRCUMFERENCE_M / 10.0, allow_negative_numbers = true)]
    pub x0_min: f64,

    /// Upper bound for the false easting x0 (meters).
    #[arg(long, default_value_t = EARTH_CIRCUMFERENCE_M, allow_negative_numbers = true)]
    pub x0_max: f64,

    /// Lower bound for the false northing y0 (meters).
    #[arg(long, default_value_t = -EARTH_CIRCUMFERENCE_M / 10.0, allow_negative_numbers = true)]
    pub y0_min: f64,

    /// Upper bound for the false northing y0 (meters).
    #[arg(long, default_value_t = EARTH_CIRCUMFERENCE_M, allow_negative_numbers = true)]
    pub y0_max: f64,
}

/// Options for fitting.
#[derive(Debug, Parser, Clone)]
pub struct FitArgs {
    /// Correspondence CSV (lat, lon, x, z[, label]; no header).
    #[arg(value_name = "CSV")]
    pub input: PathBuf,

    /// Extra correspondence CSV used only to validate the fit.
    #[arg(long, value_name = "CSV")]
    pub holdout: Option<PathBuf>,

    /// Refit once per record without it and report the held-out residuals.
    #[arg(long)]
    pub leave_one_out: bool,

    #[command(flatten)]
    pub projector: ProjectorArgs,

    #[command(flatten)]
    pub bounds: BoundsArgs,

    /// Random seed for the annealing chains.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Number of annealing chains (run in parallel).
    #[arg(long, default_value_t = 4)]
    pub chains: usize,

    /// Annealing iterations per chain.
    #[arg(long, default_value_t = 1000)]
    pub max_iter: usize,

    /// Initial annealing temperature (unit-cube step scale).
    #[arg(long, default_value_t = 1.0)]
    pub initial_temp: f64,

    /// Re-anneal from the best point once the temperature falls below this fraction.
    #[arg(long, default_value_t = 2e-3)]
    pub restart_ratio: f64,

    /// Central-meridian grid size for the least-squares seed (0 disables it).
    #[arg(long, default_value_t = 181)]
    pub profile_steps: usize,

    /// Skip the Nelder-Mead polish after annealing.
    #[arg(long)]
    pub no_polish: bool,

    /// Evaluation budget for the polish.
    #[arg(long, default_value_t = 4000)]
    pub polish_max_evals: usize,

    /// Render an ASCII residual map in the terminal (enabled by default).
    #[arg(long, default_value_t = true)]
    pub plot: bool,

    /// Disable the terminal plot.
    #[arg(long)]
    pub no_plot: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 80)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 25)]
    pub height: usize,

    /// Export per-record residuals to CSV.
    #[arg(long, value_name = "CSV")]
    pub export: Option<PathBuf>,

    /// Export the fitted parameters to JSON (input for `project` and `locate`).
    #[arg(long = "export-fit", value_name = "JSON")]
    pub export_fit: Option<PathBuf>,

    /// Write a Markdown debug bundle under `./debug`.
    #[arg(long)]
    pub debug: bool,
}

/// Options for projecting with a saved fit.
#[derive(Debug, Parser)]
pub struct ProjectArgs {
    /// Fit JSON produced by `tmcal fit --export-fit`.
    #[arg(long, value_name = "JSON")]
    pub fit: PathBuf,

    /// Override the projector recorded in the fit file.
    #[arg(long, value_enum)]
    pub projector: Option<ProjectorKind>,

    /// Points as "lat,lon" or "lat lon" (decimal or DMS). Reads stdin when empty.
    #[arg(value_name = "POINT", allow_hyphen_values = true)]
    pub points: Vec<String>,
}

/// Options for the inverse search.
#[derive(Debug, Parser)]
pub struct LocateArgs {
    /// Fit JSON produced by `tmcal fit --export-fit`.
    #[arg(long, value_name = "JSON")]
    pub fit: PathBuf,

    /// Override the projector recorded in the fit file.
    #[arg(long, value_enum)]
    pub projector: Option<ProjectorKind>,

    /// Target local X (meters).
    #[arg(short = 'x', long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub x: f64,

    /// Target local Z (meters).
    #[arg(short = 'z', long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub z: f64,
}

/// Options for synthetic data generation.
///
/// Parameter defaults are the Persian Gulf map's projection.
#[derive(Debug, Parser)]
pub struct SynthArgs {
    /// Scale factor k0.
    #[arg(long, default_value_t = 0.9996)]
    pub k0: f64,

    /// Central meridian lon0 (degrees).
    #[arg(long, default_value_t = 57.0, allow_negative_numbers = true)]
    pub lon0: f64,

    /// False easting x0 (meters).
    #[arg(long, default_value_t = 75_756.0, allow_negative_numbers = true)]
    pub x0: f64,

    /// False northing y0 (meters).
    #[arg(long, default_value_t = -2_894_933.0, allow_negative_numbers = true)]
    pub y0: f64,

    /// Southern edge of the sampling box (degrees).
    #[arg(long, default_value_t = 24.0, allow_negative_numbers = true)]
    pub lat_min: f64,

    /// Northern edge of the sampling box (degrees).
    #[arg(long, default_value_t = 30.0, allow_negative_numbers = true)]
    pub lat_max: f64,

    /// Western edge of the sampling box (degrees).
    #[arg(long, default_value_t = 51.0, allow_negative_numbers = true)]
    pub lon_min: f64,

    /// Eastern edge of the sampling box (degrees).
    #[arg(long, default_value_t = 59.0, allow_negative_numbers = true)]
    pub lon_max: f64,

    /// Number of records to generate.
    #[arg(short = 'n', long, default_value_t = 20)]
    pub count: usize,

    /// Standard deviation of Gaussian noise added to X and Z (meters).
    #[arg(long, default_value_t = 0.0)]
    pub noise: f64,

    /// Random seed.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    #[command(flatten)]
    pub projector: ProjectorArgs,

    /// Output CSV (stdout when omitted).
    #[arg(short = 'o', long, value_name = "CSV")]
    pub output: Option<PathBuf>,
}
