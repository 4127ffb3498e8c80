//! Correspondence CSV ingest.
//!
//! Input is a headerless CSV exported from the mission editor's status bar:
//!
//! ```text
//! 24d 26m 47.09s N,56d 37m 37.74s E,X -00191230,Z +00037965
//! ```
//!
//! Columns are `lat, lon, x, z[, label]`. Blank lines and lines starting
//! with `#` are skipped. Unlike a bulk data feed, every row here matters, so
//! any malformed field fails the whole load with its line number.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::StringRecord;

use crate::domain::{CorrespondenceRecord, GeodeticCoordinate, LocalCoordinate};
use crate::error::{AppError, ParseError};

/// Load every correspondence record from `path`.
pub fn load_records(path: &Path) -> Result<Vec<CorrespondenceRecord>, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open CSV '{}': {e}", path.display())))?;
    let records = read_records(file, &path.display().to_string())?;
    if records.is_empty() {
        return Err(AppError::new(
            3,
            format!("No correspondence records in '{}'.", path.display()),
        ));
    }
    log::info!("loaded {} records from {}", records.len(), path.display());
    Ok(records)
}

/// Parse correspondence records from any reader. `source` names it in errors.
pub fn read_records<R: Read>(reader: R, source: &str) -> Result<Vec<CorrespondenceRecord>, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .comment(Some(b'#'))
        .from_reader(reader);

    let mut out = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        let record = result.map_err(|e| AppError::new(2, format!("{source}: CSV parse error: {e}")))?;
        let line = record
            .position()
            .map_or(idx + 1, |p| usize::try_from(p.line()).unwrap_or(idx + 1));
        let parsed = parse_row(&record, line).map_err(|e| AppError::new(2, format!("{source}:{line}: {e}")))?;
        out.push(parsed);
    }
    Ok(out)
}

fn parse_row(record: &StringRecord, line: usize) -> Result<CorrespondenceRecord, String> {
    if record.iter().all(str::is_empty) {
        return Err("empty row".to_string());
    }
    if !(4..=5).contains(&record.len()) {
        return Err(format!(
            "expected 4 or 5 columns (lat, lon, x, z[, label]), found {}",
            record.len()
        ));
    }

    let field = |i: usize| record.get(i).unwrap_or_default();
    let latitude = parse_latitude(field(0)).map_err(|e| e.to_string())?;
    let longitude = parse_longitude(field(1)).map_err(|e| e.to_string())?;
    let x = parse_offset(field(2)).map_err(|e| e.to_string())?;
    let z = parse_offset(field(3)).map_err(|e| e.to_string())?;
    let geodetic = GeodeticCoordinate::new(latitude, longitude).map_err(|e| e.to_string())?;

    let label = match record.get(4) {
        Some(l) if !l.is_empty() => l.to_string(),
        _ => line.to_string(),
    };

    Ok(CorrespondenceRecord {
        label,
        geodetic,
        local: LocalCoordinate::new(x, z),
    })
}

/// Parse `"24d 26m 47.09s N"` into signed decimal degrees.
///
/// The hemisphere letter sets the sign (N/E positive, S/W negative) and is
/// returned so callers can check the axis.
pub fn parse_dms(s: &str) -> Result<(f64, char), ParseError> {
    let bad = || ParseError::Angle(s.to_string());
    let mut rest = s.trim();

    let mut parts = [0.0_f64; 3];
    for (part, unit) in parts.iter_mut().zip(['d', 'm', 's']) {
        let end = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .ok_or_else(bad)?;
        if end == 0 {
            return Err(bad());
        }
        *part = rest[..end].parse().map_err(|_| bad())?;
        rest = rest[end..].trim_start();
        rest = rest.strip_prefix(unit).ok_or_else(bad)?.trim_start();
    }

    let mut chars = rest.chars();
    let hemisphere = chars.next().ok_or_else(bad)?.to_ascii_uppercase();
    if chars.next().is_some() {
        return Err(bad());
    }
    let sign = match hemisphere {
        'N' | 'E' => 1.0,
        'S' | 'W' => -1.0,
        _ => return Err(bad()),
    };

    let [d, m, sec] = parts;
    if m >= 60.0 || sec >= 60.0 {
        return Err(bad());
    }
    Ok((sign * (d + m / 60.0 + sec / 3600.0), hemisphere))
}

/// Parse a DMS angle into signed decimal degrees, ignoring which axis it names.
pub fn parse_angle(s: &str) -> Result<f64, ParseError> {
    parse_dms(s).map(|(v, _)| v)
}

/// Latitude as decimal degrees or DMS with an N/S hemisphere.
pub fn parse_latitude(s: &str) -> Result<f64, ParseError> {
    parse_axis(s, ['N', 'S'])
}

/// Longitude as decimal degrees or DMS with an E/W hemisphere.
pub fn parse_longitude(s: &str) -> Result<f64, ParseError> {
    parse_axis(s, ['E', 'W'])
}

fn parse_axis(s: &str, hemispheres: [char; 2]) -> Result<f64, ParseError> {
    let trimmed = s.trim();
    if let Ok(v) = trimmed.parse::<f64>() {
        return Ok(v);
    }
    let (value, hemisphere) = parse_dms(trimmed)?;
    if hemispheres.contains(&hemisphere) {
        Ok(value)
    } else {
        Err(ParseError::Angle(s.to_string()))
    }
}

/// Parse a local coordinate such as `"X -00191230"` or `"+37965"`.
pub fn parse_offset(s: &str) -> Result<f64, ParseError> {
    let trimmed = s.trim();
    let value = match trimmed.chars().next() {
        Some(c) if matches!(c.to_ascii_uppercase(), 'X' | 'Y' | 'Z') => trimmed[1..].trim_start(),
        _ => trimmed,
    };
    match value.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(ParseError::Offset(s.to_string())),
    }
}

/// Parse one `"lat,lon"` or `"lat lon"` pair (decimal or DMS).
///
/// DMS values contain spaces, so they must be comma separated.
pub fn parse_point(s: &str) -> Result<GeodeticCoordinate, ParseError> {
    let (lat, lon) = match s.split_once(',') {
        Some(pair) => pair,
        None => {
            let mut tokens = s.split_whitespace();
            match (tokens.next(), tokens.next(), tokens.next()) {
                (Some(a), Some(b), None) => (a, b),
                _ => return Err(ParseError::Angle(s.to_string())),
            }
        }
    };
    GeodeticCoordinate::new(parse_latitude(lat)?, parse_longitude(lon)?)
}
