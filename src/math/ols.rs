//! Least squares for the linear part of the projection.
//!
//! For a fixed central meridian λ₀, a transverse Mercator projection is affine
//! in the remaining unknowns:
//!
//! ```text
//! X_i = k₀ · u_i + c_x
//! Z_i = k₀ · v_i + c_z
//! ```
//!
//! where `(u_i, v_i)` is the unit-scale projection of record `i` (k₀ = 1, no
//! offsets). Stacking both axes gives a `2n × 3` system in `(k₀, c_x, c_z)`
//! that we solve with SVD, so the λ₀ profile search only has to be nonlinear
//! in one dimension.

use nalgebra::{DMatrix, DVector};

use crate::domain::LocalCoordinate;

/// Solution of the stacked scale/offset regression.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleOffsetFit {
    pub scale: f64,
    pub offset_x: f64,
    pub offset_z: f64,
}

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = x.clone().svd(true, true);

    // Try progressively looser tolerances if strict solve fails.
    for &tol in &[1e-12, 1e-10, 1e-8] {
        if let Ok(beta) = svd.solve(y, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }

    None
}

/// Fit `known ≈ scale · unit + offset` over both axes at once.
///
/// `unit` and `known` must have equal length; at least two points are needed
/// for the three unknowns to be determined.
pub fn fit_scale_and_offsets(unit: &[LocalCoordinate], known: &[LocalCoordinate]) -> Option<ScaleOffsetFit> {
    let n = unit.len();
    if n < 2 || known.len() != n {
        return None;
    }

    // Columns: [scale, offset_x, offset_z]
    let mut x = DMatrix::<f64>::zeros(2 * n, 3);
    let mut y = DVector::<f64>::zeros(2 * n);
    for (i, (u, k)) in unit.iter().zip(known).enumerate() {
        x[(2 * i, 0)] = u.x;
        x[(2 * i, 1)] = 1.0;
        y[2 * i] = k.x;

        x[(2 * i + 1, 0)] = u.z;
        x[(2 * i + 1, 2)] = 1.0;
        y[2 * i + 1] = k.z;
    }

    // The unit coordinates are ~1e6 while the offset columns are 1; scaling the
    // first column keeps the SVD well conditioned.
    let col_scale = x.column(0).amax().max(1.0);
    x.column_mut(0).scale_mut(1.0 / col_scale);

    let beta = solve_least_squares(&x, &y)?;
    Some(ScaleOffsetFit {
        scale: beta[0] / col_scale,
        offset_x: beta[1],
        offset_z: beta[2],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn least_squares_solves_simple_system() {
        // Fit y = 2 + 3x on x = [0,1,2]
        let x = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0]);
        let y = DVector::from_row_slice(&[2.0, 5.0, 8.0]);

        let beta = solve_least_squares(&x, &y).unwrap();
        assert!((beta[0] - 2.0).abs() < 1e-10);
        assert!((beta[1] - 3.0).abs() < 1e-10);
    }

    #[test]
    fn recovers_scale_and_offsets_exactly() {
        let unit = vec![
            LocalCoordinate::new(2_700_000.0, -150_000.0),
            LocalCoordinate::new(2_850_000.0, 40_000.0),
            LocalCoordinate::new(3_030_000.0, 210_000.0),
            LocalCoordinate::new(3_350_000.0, -520_000.0),
        ];
        let known: Vec<LocalCoordinate> = unit
            .iter()
            .map(|u| LocalCoordinate::new(0.9996 * u.x - 2_894_933.0, 0.9996 * u.z + 75_756.0))
            .collect();

        let fit = fit_scale_and_offsets(&unit, &known).unwrap();
        assert!((fit.scale - 0.9996).abs() < 1e-9);
        assert!((fit.offset_x + 2_894_933.0).abs() < 1e-3);
        assert!((fit.offset_z - 75_756.0).abs() < 1e-3);
    }

    #[test]
    fn rejects_underdetermined_input() {
        let one = [LocalCoordinate::new(1.0, 2.0)];
        assert!(fit_scale_and_offsets(&one, &one).is_none());
    }
}
