//! Krüger series for the ellipsoidal transverse Mercator projection.
//!
//! The forward mapping used here is the n-series expansion to sixth order in
//! the third flattening `n = f / (2 - f)` (Krüger 1912, as popularised by
//! Karney 2011 and used by PROJ's default `tmerc`):
//!
//! ```text
//! τ'  = sinh(atanh(sin φ) - e·atanh(e·sin φ))      conformal latitude (as tan)
//! ξ'  = atan2(τ', cos Δλ)
//! η'  = atanh(sin Δλ / sqrt(1 + τ'²))
//! ξ   = ξ' + Σ αj sin(2jξ') cosh(2jη')
//! η   = η' + Σ αj cos(2jξ') sinh(2jη')
//! E   = A·η,  N = A·ξ
//! ```
//!
//! Accuracy is sub-millimetre within a few thousand kilometres of the central
//! meridian. The expansion diverges as `|Δλ| → 90°`.

use std::f64::consts::FRAC_PI_2;

use crate::domain::Ellipsoid;

/// Precomputed series coefficients for one ellipsoid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KrugerSeries {
    /// Rectifying radius `A`.
    rectifying_radius: f64,
    /// First eccentricity.
    eccentricity: f64,
    alpha: [f64; 6],
}

impl KrugerSeries {
    pub fn new(ellipsoid: Ellipsoid) -> Self {
        let a = ellipsoid.semi_major_axis();
        let f = 1.0 / ellipsoid.inverse_flattening();
        let n = f / (2.0 - f);
        let n2 = n * n;
        let n3 = n2 * n;
        let n4 = n3 * n;
        let n5 = n4 * n;
        let n6 = n5 * n;

        let rectifying_radius = a / (1.0 + n) * (1.0 + n2 / 4.0 + n4 / 64.0 + n6 / 256.0);
        let alpha = [
            n / 2.0 - 2.0 * n2 / 3.0 + 5.0 * n3 / 16.0 + 41.0 * n4 / 180.0 - 127.0 * n5 / 288.0
                + 7891.0 * n6 / 37800.0,
            13.0 * n2 / 48.0 - 3.0 * n3 / 5.0 + 557.0 * n4 / 1440.0 + 281.0 * n5 / 630.0
                - 1_983_433.0 * n6 / 1_935_360.0,
            61.0 * n3 / 240.0 - 103.0 * n4 / 140.0 + 15061.0 * n5 / 26880.0
                + 167_603.0 * n6 / 181_440.0,
            49561.0 * n4 / 161_280.0 - 179.0 * n5 / 168.0 + 6_601_661.0 * n6 / 7_257_600.0,
            34729.0 * n5 / 80640.0 - 3_418_889.0 * n6 / 1_995_840.0,
            212_378_941.0 * n6 / 319_334_400.0,
        ];

        Self {
            rectifying_radius,
            eccentricity: (f * (2.0 - f)).sqrt(),
            alpha,
        }
    }

    /// Unit-scale `(easting, northing)` in meters for a point `delta_lon`
    /// degrees east of the central meridian, with origin on the equator.
    ///
    /// Returns `None` when the point is 90° or more from the central meridian.
    pub fn forward(&self, latitude: f64, delta_lon: f64) -> Option<(f64, f64)> {
        let phi = latitude.to_radians();
        let lambda = wrap_degrees(delta_lon).to_radians();
        if lambda.abs() >= FRAC_PI_2 {
            return None;
        }

        let e = self.eccentricity;
        let sin_phi = phi.sin();
        let tau = (sin_phi.atanh() - e * (e * sin_phi).atanh()).sinh();

        let xi_p = tau.atan2(lambda.cos());
        let eta_p = (lambda.sin() / (1.0 + tau * tau).sqrt()).atanh();

        let mut xi = xi_p;
        let mut eta = eta_p;
        for (j, alpha) in self.alpha.iter().enumerate() {
            let k = 2.0 * (j as f64 + 1.0);
            xi += alpha * (k * xi_p).sin() * (k * eta_p).cosh();
            eta += alpha * (k * xi_p).cos() * (k * eta_p).sinh();
        }

        let easting = self.rectifying_radius * eta;
        let northing = self.rectifying_radius * xi;
        if easting.is_finite() && northing.is_finite() {
            Some((easting, northing))
        } else {
            None
        }
    }
}

/// Wrap an angle in degrees into `[-180, 180)`.
pub fn wrap_degrees(deg: f64) -> f64 {
    (deg + 180.0).rem_euclid(360.0) - 180.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn meridian_arc_matches_wgs84() {
        // Known WGS84 meridian distance from the equator to 10°N.
        let series = KrugerSeries::new(Ellipsoid::Wgs84);
        let (e, n) = series.forward(10.0, 0.0).unwrap();
        assert!(e.abs() < 1e-9);
        assert!((n - 1_105_854.833).abs() < 1e-2, "northing={n}");
    }

    #[test]
    fn equator_easting_is_odd_in_longitude() {
        let series = KrugerSeries::new(Ellipsoid::Wgs84);
        let (e_east, n_east) = series.forward(0.0, 3.0).unwrap();
        let (e_west, _) = series.forward(0.0, -3.0).unwrap();
        assert!((e_east - 334_112.2018).abs() < 1e-2, "easting={e_east}");
        assert!(n_east.abs() < 1e-9);
        assert!((e_east + e_west).abs() < 1e-9);
    }

    #[test]
    fn diverges_at_ninety_degrees() {
        let series = KrugerSeries::new(Ellipsoid::Wgs84);
        assert!(series.forward(0.0, 90.0).is_none());
        assert!(series.forward(45.0, -135.0).is_none());
        assert!(series.forward(45.0, 89.0).is_some());
    }

    #[test]
    fn wrap_degrees_handles_dateline() {
        assert!((wrap_degrees(190.0) + 170.0).abs() < 1e-12);
        assert!((wrap_degrees(-190.0) - 170.0).abs() < 1e-12);
        assert!((wrap_degrees(45.0) - 45.0).abs() < 1e-12);
    }
}
