//! Central-meridian grid generation for the profile search.
//!
//! λ₀ is the only parameter that enters the projection nonlinearly, so we scan
//! it on a deterministic grid and solve the rest exactly (see `math::ols`).
//! A grid avoids local minima, is reproducible, and with one dimension a
//! fine grid is cheap.

use crate::error::AppError;

/// Generate `steps` evenly spaced points between `min` and `max` (inclusive).
pub fn linspace(min: f64, max: f64, steps: usize) -> Result<Vec<f64>, AppError> {
    if !(min.is_finite() && max.is_finite() && max > min) {
        return Err(AppError::new(
            2,
            format!("Invalid grid range: min={min}, max={max} (must be finite and max>min)."),
        ));
    }
    if steps < 2 {
        return Err(AppError::new(2, "Grid steps must be >= 2."));
    }

    let step = (max - min) / (steps as f64 - 1.0);
    let mut out = Vec::with_capacity(steps);
    for i in 0..steps {
        out.push(min + step * i as f64);
    }
    // Pin the last point so rounding never leaves the range.
    if let Some(last) = out.last_mut() {
        *last = max;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linspace_includes_endpoints() {
        let v = linspace(-180.0, 180.0, 181).unwrap();
        assert_eq!(v.len(), 181);
        assert_eq!(v[0], -180.0);
        assert_eq!(v[180], 180.0);
        assert!((v[90]).abs() < 1e-12);
    }

    #[test]
    fn linspace_rejects_bad_input() {
        assert!(linspace(1.0, 1.0, 5).is_err());
        assert!(linspace(0.0, 1.0, 1).is_err());
        assert!(linspace(0.0, f64::NAN, 5).is_err());
    }
}
