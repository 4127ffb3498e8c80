//! CSV exports.
//!
//! - per-record residuals, for spreadsheets or downstream scripts
//! - correspondence records in the ingest format (used by `tmcal synth`)

use std::io::Write;
use std::path::Path;

use serde::Serialize;

use crate::domain::{CorrespondenceRecord, RecordResidual};
use crate::error::AppError;

#[derive(Debug, Serialize)]
struct ResidualRow<'a> {
    label: &'a str,
    latitude: f64,
    longitude: f64,
    x: f64,
    z: f64,
    x_fit: f64,
    z_fit: f64,
    dx: f64,
    dz: f64,
    distance: f64,
}

/// Write per-record residuals to a CSV file (with header).
pub fn write_residuals_csv(path: &Path, residuals: &[RecordResidual]) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| AppError::new(2, format!("Failed to create export CSV '{}': {e}", path.display())))?;

    for r in residuals {
        writer
            .serialize(ResidualRow {
                label: &r.record.label,
                latitude: r.record.geodetic.latitude,
                longitude: r.record.geodetic.longitude,
                x: r.record.local.x,
                z: r.record.local.z,
                x_fit: r.predicted.x,
                z_fit: r.predicted.z,
                dx: r.dx,
                dz: r.dz,
                distance: r.distance,
            })
            .map_err(|e| AppError::new(2, format!("Failed to write export CSV row: {e}")))?;
    }
    writer
        .flush()
        .map_err(|e| AppError::new(2, format!("Failed to write export CSV: {e}")))?;
    Ok(())
}

/// Write records in the headerless ingest format, so the output can be fed
/// straight back into `tmcal fit`.
pub fn write_records_csv<W: Write>(out: W, records: &[CorrespondenceRecord]) -> Result<(), AppError> {
    let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(out);
    for r in records {
        writer
            .write_record([
                format_dms(r.geodetic.latitude, 'N', 'S'),
                format_dms(r.geodetic.longitude, 'E', 'W'),
                format_offset('X', r.local.x),
                format_offset('Z', r.local.z),
                r.label.clone(),
            ])
            .map_err(|e| AppError::new(2, format!("Failed to write record CSV row: {e}")))?;
    }
    writer
        .flush()
        .map_err(|e| AppError::new(2, format!("Failed to write record CSV: {e}")))?;
    Ok(())
}

/// Format decimal degrees as `"24d 26m 47.09s N"` (hundredths of a second).
pub fn format_dms(value: f64, positive: char, negative: char) -> String {
    let hemisphere = if value < 0.0 { negative } else { positive };
    // Round once on the smallest printed unit so 59.999s never prints as 60.00s.
    let total = (value.abs() * 360_000.0).round() as u64;
    let hundredths = total % 6000;
    let minutes = (total / 6000) % 60;
    let degrees = total / 360_000;
    format!(
        "{degrees}d {minutes:02}m {:02}.{:02}s {hemisphere}",
        hundredths / 100,
        hundredths % 100
    )
}

/// Format a local coordinate the way the mission editor shows it: `"X -00191230"`.
pub fn format_offset(axis: char, value: f64) -> String {
    format!("{axis} {:+09}", value.round() as i64)
}
