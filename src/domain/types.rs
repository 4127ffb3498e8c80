//! Shared domain types.
//!
//! These types are intentionally kept small, `Copy` where possible and
//! serializable so they can be:
//!
//! - used in-memory during the search
//! - exported to JSON/CSV
//! - reloaded later by `tmcal project` / `tmcal locate`

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, ParseError};

/// Rough circumference of the Earth in meters.
///
/// Used to give the mathematically unconstrained offsets a finite search range.
pub const EARTH_CIRCUMFERENCE_M: f64 = 40_000_000.0;

/// A signed latitude/longitude pair in decimal degrees (+N / +E).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeodeticCoordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeodeticCoordinate {
    /// Build a coordinate, rejecting values outside the valid angular ranges.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, ParseError> {
        if !(latitude.is_finite() && (-90.0..=90.0).contains(&latitude)) {
            return Err(ParseError::OutOfRange {
                kind: "latitude",
                value: latitude,
                limit: 90.0,
            });
        }
        if !(longitude.is_finite() && (-180.0..=180.0).contains(&longitude)) {
            return Err(ParseError::OutOfRange {
                kind: "longitude",
                value: longitude,
                limit: 180.0,
            });
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }
}

/// A position in the engine's local planar frame (meters).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocalCoordinate {
    pub x: f64,
    pub z: f64,
}

impl LocalCoordinate {
    pub fn new(x: f64, z: f64) -> Self {
        Self { x, z }
    }

    pub fn squared_distance(&self, other: &LocalCoordinate) -> f64 {
        let dx = self.x - other.x;
        let dz = self.z - other.z;
        dx * dx + dz * dz
    }
}

/// One known (geodetic, local) ground-truth mapping.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrespondenceRecord {
    pub label: String,
    pub geodetic: GeodeticCoordinate,
    pub local: LocalCoordinate,
}

/// Transverse Mercator parameters being solved for.
///
/// Array order everywhere is `(k0, lon0, x0, y0)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProjectionParameters {
    /// Scale factor on the central meridian (k₀).
    pub scale_factor: f64,
    /// Central meridian in decimal degrees (λ₀).
    pub central_longitude: f64,
    /// Constant added to projected eastings (x₀).
    pub false_easting: f64,
    /// Constant added to projected northings (y₀).
    pub false_northing: f64,
}

impl ProjectionParameters {
    pub fn new(scale_factor: f64, central_longitude: f64, false_easting: f64, false_northing: f64) -> Self {
        Self {
            scale_factor,
            central_longitude,
            false_easting,
            false_northing,
        }
    }

    pub fn to_array(&self) -> [f64; 4] {
        [
            self.scale_factor,
            self.central_longitude,
            self.false_easting,
            self.false_northing,
        ]
    }

    pub fn from_array(values: [f64; 4]) -> Self {
        Self::new(values[0], values[1], values[2], values[3])
    }

    /// Unit scale, no offsets: the raw projection about `central_longitude`.
    pub fn unit(central_longitude: f64) -> Self {
        Self::new(1.0, central_longitude, 0.0, 0.0)
    }

    pub fn is_finite(&self) -> bool {
        self.to_array().iter().all(|v| v.is_finite())
    }
}

/// Where a parameter range comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RangeKind {
    /// Implied by the mathematics (k₀ > 0, λ₀ is a longitude).
    Physical,
    /// The parameter is unconstrained in theory; the range is a practical
    /// limit so bounded optimizers (annealing) have a finite domain.
    Practical,
}

/// Closed `[min, max]` search range for one parameter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParameterRange {
    pub min: f64,
    pub max: f64,
    pub kind: RangeKind,
}

impl ParameterRange {
    pub fn new(min: f64, max: f64, kind: RangeKind) -> Self {
        Self { min, max, kind }
    }

    pub fn span(&self) -> f64 {
        self.max - self.min
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }

    fn to_unit(&self, value: f64) -> f64 {
        (value - self.min) / self.span()
    }

    fn from_unit(&self, u: f64) -> f64 {
        // Clamp twice: `min + 1.0 * span` may round past `max`.
        self.clamp(self.min + u.clamp(0.0, 1.0) * self.span())
    }
}

/// Per-parameter search bounds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParameterBounds {
    pub scale_factor: ParameterRange,
    pub central_longitude: ParameterRange,
    pub false_easting: ParameterRange,
    pub false_northing: ParameterRange,
}

impl Default for ParameterBounds {
    fn default() -> Self {
        // Offsets: a meaningful fraction of the circumference below zero, one
        // full circumference above. Game maps are approximately in meters.
        let offset = ParameterRange::new(
            -EARTH_CIRCUMFERENCE_M / 10.0,
            EARTH_CIRCUMFERENCE_M,
            RangeKind::Practical,
        );
        Self {
            scale_factor: ParameterRange::new(0.1, 10.0, RangeKind::Physical),
            central_longitude: ParameterRange::new(-180.0, 180.0, RangeKind::Physical),
            false_easting: offset,
            false_northing: offset,
        }
    }
}

impl ParameterBounds {
    pub const NAMES: [&'static str; 4] = ["k0", "lon0", "x0", "y0"];

    pub fn ranges(&self) -> [ParameterRange; 4] {
        [
            self.scale_factor,
            self.central_longitude,
            self.false_easting,
            self.false_northing,
        ]
    }

    /// Reject empty, inverted or non-finite ranges and physically invalid limits.
    pub fn validate(&self) -> Result<(), AppError> {
        for (name, range) in Self::NAMES.iter().zip(self.ranges()) {
            if !(range.min.is_finite() && range.max.is_finite() && range.max > range.min) {
                return Err(AppError::new(
                    2,
                    format!(
                        "Invalid bounds for {name}: [{}, {}] (must be finite with max > min).",
                        range.min, range.max
                    ),
                ));
            }
        }
        if self.scale_factor.min <= 0.0 {
            return Err(AppError::new(
                2,
                format!("Scale factor lower bound must be > 0 (got {}).", self.scale_factor.min),
            ));
        }
        if self.central_longitude.min < -180.0 || self.central_longitude.max > 180.0 {
            return Err(AppError::new(
                2,
                "Central longitude bounds must lie within [-180, 180].",
            ));
        }
        Ok(())
    }

    pub fn contains(&self, params: &ProjectionParameters) -> bool {
        self.ranges()
            .iter()
            .zip(params.to_array())
            .all(|(r, v)| r.contains(v))
    }

    pub fn clamp(&self, params: &ProjectionParameters) -> ProjectionParameters {
        let ranges = self.ranges();
        let v = params.to_array();
        ProjectionParameters::from_array([
            ranges[0].clamp(v[0]),
            ranges[1].clamp(v[1]),
            ranges[2].clamp(v[2]),
            ranges[3].clamp(v[3]),
        ])
    }

    /// Map parameters into the unit hypercube `[0, 1]^4`.
    pub fn to_unit(&self, params: &ProjectionParameters) -> [f64; 4] {
        let ranges = self.ranges();
        let v = params.to_array();
        [
            ranges[0].to_unit(v[0]),
            ranges[1].to_unit(v[1]),
            ranges[2].to_unit(v[2]),
            ranges[3].to_unit(v[3]),
        ]
    }

    /// Inverse of [`ParameterBounds::to_unit`]. Inputs outside `[0, 1]` are clamped,
    /// so the result is always within bounds.
    pub fn from_unit(&self, u: &[f64]) -> ProjectionParameters {
        let ranges = self.ranges();
        ProjectionParameters::from_array([
            ranges[0].from_unit(u[0]),
            ranges[1].from_unit(u[1]),
            ranges[2].from_unit(u[2]),
            ranges[3].from_unit(u[3]),
        ])
    }
}

/// How projected (easting, northing) map onto the local (X, Z) axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum AxisOrder {
    /// X = northing, Z = easting (DCS: World convention).
    NorthingEasting,
    /// X = easting, Z = northing.
    EastingNorthing,
}

impl AxisOrder {
    pub fn to_local(self, easting: f64, northing: f64) -> LocalCoordinate {
        match self {
            AxisOrder::NorthingEasting => LocalCoordinate::new(northing, easting),
            AxisOrder::EastingNorthing => LocalCoordinate::new(easting, northing),
        }
    }

    /// Inverse of [`AxisOrder::to_local`]: `(easting, northing)`.
    pub fn to_easting_northing(self, local: &LocalCoordinate) -> (f64, f64) {
        match self {
            AxisOrder::NorthingEasting => (local.z, local.x),
            AxisOrder::EastingNorthing => (local.x, local.z),
        }
    }

    /// Translate additive offsets on (X, Z) into `(false_easting, false_northing)`.
    pub fn offsets_to_false_origin(self, offset_x: f64, offset_z: f64) -> (f64, f64) {
        match self {
            AxisOrder::NorthingEasting => (offset_z, offset_x),
            AxisOrder::EastingNorthing => (offset_x, offset_z),
        }
    }
}

/// Reference ellipsoid used by the projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Ellipsoid {
    Wgs84,
    Grs80,
}

impl Ellipsoid {
    pub fn semi_major_axis(self) -> f64 {
        match self {
            Ellipsoid::Wgs84 | Ellipsoid::Grs80 => 6_378_137.0,
        }
    }

    pub fn inverse_flattening(self) -> f64 {
        match self {
            Ellipsoid::Wgs84 => 298.257_223_563,
            Ellipsoid::Grs80 => 298.257_222_101,
        }
    }

    /// Name understood by PROJ's `+ellps=`.
    pub fn proj_name(self) -> &'static str {
        match self {
            Ellipsoid::Wgs84 => "WGS84",
            Ellipsoid::Grs80 => "GRS80",
        }
    }
}

/// Which forward projector implementation to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ProjectorKind {
    /// Closed-form ellipsoidal transverse Mercator (in-process).
    Tmerc,
    /// Shell out to PROJ's `proj` command.
    Proj,
}

/// Global search knobs.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchConfig {
    /// Base RNG seed; chain `c` derives its own seed from this.
    pub seed: u64,
    /// Number of independent annealing chains (run in parallel).
    pub chains: usize,
    /// Annealing iterations per chain (each perturbs every coordinate once).
    pub max_iter: usize,
    /// Starting temperature in unit-cube step units.
    pub initial_temp: f64,
    /// Re-anneal from the chain's best point once `T < initial_temp * ratio`.
    pub restart_temp_ratio: f64,
    /// λ₀ grid size for the least-squares profile seed (0 disables it).
    pub profile_steps: usize,
    /// Run a Nelder–Mead polish on the best annealing result.
    pub polish: bool,
    /// Evaluation budget for the polish.
    pub polish_max_evals: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            chains: 4,
            max_iter: 1000,
            initial_temp: 1.0,
            restart_temp_ratio: 2e-3,
            profile_steps: 181,
            polish: true,
            polish_max_evals: 4000,
        }
    }
}

/// A full calibration run's configuration as understood by the pipeline.
///
/// This is derived from CLI flags (plus defaults).
#[derive(Debug, Clone)]
pub struct CalibrationConfig {
    pub input: PathBuf,
    /// Optional correspondence file used only for validation.
    pub holdout: Option<PathBuf>,
    pub leave_one_out: bool,

    pub bounds: ParameterBounds,
    pub search: SearchConfig,

    pub projector: ProjectorKind,
    pub axes: AxisOrder,
    pub ellipsoid: Ellipsoid,

    pub plot: bool,
    pub plot_width: usize,
    pub plot_height: usize,

    pub export_residuals: Option<PathBuf>,
    pub export_fit: Option<PathBuf>,
    pub debug_bundle: bool,
}

impl CalibrationConfig {
    /// Defaults for everything but the input file: closed-form projector,
    /// DCS axes, WGS84, no validation extras, no exports.
    pub fn new(input: PathBuf) -> Self {
        Self {
            input,
            holdout: None,
            leave_one_out: false,
            bounds: ParameterBounds::default(),
            search: SearchConfig::default(),
            projector: ProjectorKind::Tmerc,
            axes: AxisOrder::NorthingEasting,
            ellipsoid: Ellipsoid::Wgs84,
            plot: false,
            plot_width: 80,
            plot_height: 25,
            export_residuals: None,
            export_fit: None,
            debug_bundle: false,
        }
    }
}

/// Residual of one record under the fitted parameters (known − predicted).
#[derive(Debug, Clone)]
pub struct RecordResidual {
    pub record: CorrespondenceRecord,
    pub predicted: LocalCoordinate,
    pub dx: f64,
    pub dz: f64,
    pub distance: f64,
}

/// Aggregate residual diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResidualSummary {
    pub n: usize,
    pub sse: f64,
    pub rms: f64,
    pub max: f64,
    /// Mean residual vector; a large value relative to `rms` suggests a
    /// systematic offset rather than noise.
    pub mean_dx: f64,
    pub mean_dz: f64,
}

/// A saved fit (JSON).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitFile {
    pub tool: String,
    pub created_at: DateTime<Utc>,
    pub parameters: ProjectionParameters,
    pub bounds: ParameterBounds,
    pub axes: AxisOrder,
    pub ellipsoid: Ellipsoid,
    pub projector: ProjectorKind,
    pub cost: f64,
    pub summary: ResidualSummary,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn geodetic_rejects_out_of_range() {
        assert!(GeodeticCoordinate::new(90.5, 0.0).is_err());
        assert!(GeodeticCoordinate::new(0.0, -180.1).is_err());
        assert!(GeodeticCoordinate::new(f64::NAN, 0.0).is_err());
        assert!(GeodeticCoordinate::new(-90.0, 180.0).is_ok());
    }

    #[test]
    fn unit_mapping_stays_inside_bounds() {
        let bounds = ParameterBounds::default();
        for u in [[0.0; 4], [1.0; 4], [-3.0, 2.0, 0.5, 7.0]] {
            let p = bounds.from_unit(&u);
            assert!(bounds.contains(&p), "{p:?} escaped bounds for u={u:?}");
        }
    }

    #[test]
    fn unit_mapping_inverts() {
        let bounds = ParameterBounds::default();
        let p = ProjectionParameters::new(0.9996, 57.0, 75_756.0, -2_894_933.0);
        let back = bounds.from_unit(&bounds.to_unit(&p));
        assert!((back.scale_factor - p.scale_factor).abs() < 1e-12);
        assert!((back.central_longitude - p.central_longitude).abs() < 1e-9);
        assert!((back.false_easting - p.false_easting).abs() < 1e-6);
        assert!((back.false_northing - p.false_northing).abs() < 1e-6);
    }

    #[test]
    fn validate_rejects_non_positive_scale() {
        let mut bounds = ParameterBounds::default();
        bounds.scale_factor.min = 0.0;
        assert_eq!(bounds.validate().unwrap_err().exit_code(), 2);

        let mut bounds = ParameterBounds::default();
        bounds.false_easting.max = bounds.false_easting.min;
        assert!(bounds.validate().is_err());

        assert!(ParameterBounds::default().validate().is_ok());
    }

    #[test]
    fn axis_order_round_trips_offsets() {
        let local = AxisOrder::NorthingEasting.to_local(10.0, 20.0);
        assert_eq!(local, LocalCoordinate::new(20.0, 10.0));
        assert_eq!(
            AxisOrder::NorthingEasting.offsets_to_false_origin(1.0, 2.0),
            (2.0, 1.0)
        );
        assert_eq!(
            AxisOrder::EastingNorthing.offsets_to_false_origin(1.0, 2.0),
            (1.0, 2.0)
        );
    }
}
