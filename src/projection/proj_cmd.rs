//! Adapter around PROJ's `proj` command-line tool.
//!
//! Useful when results must match PROJ bit-for-bit. Each batch is one process:
//!
//! ```text
//! proj +proj=tmerc +lat_0=0 +lon_0=λ₀ +k_0=k₀ +x_0=x₀ +y_0=y₀ +ellps=WGS84 -r -f %.6f
//! stdin : "lat lon" per line      (-r: latitude first)
//! stdout: "easting<TAB>northing" per line, or "*\t*" when a point fails
//! ```

use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use crate::domain::{AxisOrder, Ellipsoid, GeodeticCoordinate, LocalCoordinate, ProjectionParameters};
use crate::error::{AppError, ProjectionError};
use crate::projection::{ForwardProjector, check_parameters};

/// Environment variable naming the `proj` executable.
pub const PROJ_BIN_ENV: &str = "TMCAL_PROJ_BIN";

#[derive(Debug, Clone)]
pub struct ProjCommand {
    program: PathBuf,
    ellipsoid: Ellipsoid,
    axes: AxisOrder,
}

impl ProjCommand {
    pub fn new(program: impl Into<PathBuf>, ellipsoid: Ellipsoid, axes: AxisOrder) -> Self {
        Self {
            program: program.into(),
            ellipsoid,
            axes,
        }
    }

    /// Resolve the executable from `TMCAL_PROJ_BIN` (environment or `.env`), else `proj`.
    pub fn from_env(ellipsoid: Ellipsoid, axes: AxisOrder) -> Result<Self, AppError> {
        dotenvy::dotenv().ok();
        let program = match std::env::var(PROJ_BIN_ENV) {
            Ok(v) if v.trim().is_empty() => {
                return Err(AppError::new(2, format!("{PROJ_BIN_ENV} is set but empty.")));
            }
            Ok(v) => PathBuf::from(v),
            Err(_) => PathBuf::from("proj"),
        };
        log::debug!("using external projector {}", program.display());
        Ok(Self::new(program, ellipsoid, axes))
    }

    pub fn args(&self, params: &ProjectionParameters) -> Vec<String> {
        let mut args = proj_definition(params, self.ellipsoid);
        args.extend(["-r", "-f", "%.6f"].map(String::from));
        args
    }
}

/// The `+proj=tmerc ...` definition for `params`, one token per element.
pub fn proj_definition(params: &ProjectionParameters, ellipsoid: Ellipsoid) -> Vec<String> {
    vec![
        "+proj=tmerc".to_string(),
        "+lat_0=0".to_string(),
        format!("+lon_0={}", params.central_longitude),
        format!("+k_0={}", params.scale_factor),
        format!("+x_0={}", params.false_easting),
        format!("+y_0={}", params.false_northing),
        format!("+ellps={}", ellipsoid.proj_name()),
    ]
}

impl ForwardProjector for ProjCommand {
    fn name(&self) -> &'static str {
        "proj"
    }

    fn axes(&self) -> AxisOrder {
        self.axes
    }

    fn project_batch(
        &self,
        params: &ProjectionParameters,
        points: &[GeodeticCoordinate],
    ) -> Result<Vec<LocalCoordinate>, ProjectionError> {
        check_parameters(params)?;
        if points.is_empty() {
            return Ok(Vec::new());
        }

        let mut child = Command::new(&self.program)
            .args(self.args(params))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| ProjectionError::Tool(format!("failed to start '{}': {e}", self.program.display())))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| ProjectionError::Tool("stdin not captured".to_string()))?;
        let mut input = String::new();
        for p in points {
            input.push_str(&format!("{}\t{}\n", p.latitude, p.longitude));
        }

        // Feed stdin from its own thread: proj streams its output, so a batch
        // larger than the pipe buffer stalls unless stdout is drained concurrently.
        let (written, output) = std::thread::scope(|s| {
            let writer = s.spawn(move || stdin.write_all(input.as_bytes()));
            let output = child.wait_with_output();
            (writer.join(), output)
        });

        let output = output.map_err(|e| ProjectionError::Tool(format!("failed to read proj output: {e}")))?;
        if !output.status.success() {
            return Err(ProjectionError::MalformedOutput(format!(
                "proj exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        match written {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(ProjectionError::Tool(format!("failed to write to proj: {e}"))),
            Err(_) => return Err(ProjectionError::Tool("proj input writer panicked".to_string())),
        }

        parse_output(&String::from_utf8_lossy(&output.stdout), points, self.axes)
    }
}

/// Parse `proj` stdout into local coordinates, one line per input point.
pub fn parse_output(
    stdout: &str,
    points: &[GeodeticCoordinate],
    axes: AxisOrder,
) -> Result<Vec<LocalCoordinate>, ProjectionError> {
    let lines: Vec<&str> = stdout.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
    if lines.len() != points.len() {
        return Err(ProjectionError::MalformedOutput(format!(
            "expected {} lines, got {}",
            points.len(),
            lines.len()
        )));
    }

    let mut out = Vec::with_capacity(points.len());
    for (line, point) in lines.iter().zip(points) {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() != 2 {
            return Err(ProjectionError::MalformedOutput(format!("expected 2 fields in '{line}'")));
        }
        if fields.contains(&"*") {
            return Err(ProjectionError::Unprojectable {
                latitude: point.latitude,
                longitude: point.longitude,
            });
        }
        let parse = |s: &str| {
            s.parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| ProjectionError::MalformedOutput(format!("non-numeric field '{s}' in '{line}'")))
        };
        let easting = parse(fields[0])?;
        let northing = parse(fields[1])?;
        out.push(axes.to_local(easting, northing));
    }
    Ok(out)
}
