//! Simulated annealing on the unit hypercube.
//!
//! One chain:
//!
//! - temperature `T = T₀ / (1 + k)` (fast annealing schedule)
//! - each iteration perturbs every coordinate in turn with a Cauchy step of
//!   scale `T`
//! - steps leaving `[0, 1]` are reflected back in
//! - Metropolis acceptance on `ln(1 + cost)` differences
//! - infinite costs are never accepted but never stop the chain
//! - when `T` falls below `T₀ · restart_ratio` the chain re-anneals from its
//!   best point
//!
//! The chain always reports its best-so-far point.

use rand::Rng;
use rand::rngs::StdRng;
use rand_distr::{Cauchy, Distribution};

use crate::error::AppError;

/// Per-chain annealing options.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnnealOptions {
    pub max_iter: usize,
    pub initial_temp: f64,
    pub restart_ratio: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnnealResult {
    pub x: Vec<f64>,
    pub value: f64,
    pub evaluations: usize,
    pub accepted: usize,
    pub restarts: usize,
}

/// Run one annealing chain from `x0`.
pub fn anneal<F>(f: F, x0: &[f64], rng: &mut StdRng, opts: &AnnealOptions) -> Result<AnnealResult, AppError>
where
    F: Fn(&[f64]) -> f64,
{
    let cauchy = Cauchy::new(0.0, 1.0).map_err(|e| AppError::new(4, format!("Step distribution error: {e}")))?;
    let eval = |x: &[f64]| {
        let v = f(x);
        if v.is_nan() { f64::INFINITY } else { v }
    };

    let mut x: Vec<f64> = x0.iter().map(|v| v.clamp(0.0, 1.0)).collect();
    let mut fx = eval(&x);
    let mut best_x = x.clone();
    let mut best = fx;

    let mut evaluations = 1;
    let mut accepted = 0;
    let mut restarts = 0;
    let mut k = 0usize;

    for _ in 0..opts.max_iter {
        let t = opts.initial_temp / (1.0 + k as f64);
        k += 1;
        if t < opts.initial_temp * opts.restart_ratio {
            k = 0;
            restarts += 1;
            x.clone_from(&best_x);
            fx = best;
            continue;
        }

        for d in 0..x.len() {
            let mut candidate = x.clone();
            let step = t * cauchy.sample(rng);
            candidate[d] = reflect_unit(candidate[d] + step).unwrap_or_else(|| rng.r#gen::<f64>());

            let fc = eval(&candidate);
            evaluations += 1;

            if accept(fx, fc, t, rng) {
                x = candidate;
                fx = fc;
                accepted += 1;
                if fx < best {
                    best = fx;
                    best_x.clone_from(&x);
                }
            }
        }
    }

    Ok(AnnealResult {
        x: best_x,
        value: best,
        evaluations,
        accepted,
        restarts,
    })
}

/// Fold a coordinate back into `[0, 1]` by mirror reflection.
fn reflect_unit(v: f64) -> Option<f64> {
    if !v.is_finite() {
        return None;
    }
    let m = v.rem_euclid(2.0);
    Some(if m > 1.0 { 2.0 - m } else { m })
}

fn accept(current: f64, candidate: f64, t: f64, rng: &mut StdRng) -> bool {
    if candidate <= current {
        return true;
    }
    if !candidate.is_finite() {
        return false;
    }
    if !current.is_finite() {
        return true;
    }
    let delta = candidate.ln_1p() - current.ln_1p();
    rng.r#gen::<f64>() < (-delta / t).exp()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn opts() -> AnnealOptions {
        AnnealOptions {
            max_iter: 1000,
            initial_temp: 1.0,
            restart_ratio: 2e-3,
        }
    }

    #[test]
    fn reflect_unit_folds_into_range() {
        assert_eq!(reflect_unit(0.25), Some(0.25));
        assert!((reflect_unit(1.25).unwrap() - 0.75).abs() < 1e-12);
        assert!((reflect_unit(-0.25).unwrap() - 0.25).abs() < 1e-12);
        assert!((reflect_unit(4.5).unwrap() - 0.5).abs() < 1e-12);
        assert_eq!(reflect_unit(f64::INFINITY), None);
    }

    #[test]
    fn finds_global_basin_of_multimodal_function() {
        // Rastrigin-like surface on [0,1]^2 with the global minimum at (0.7, 0.2).
        let f = |x: &[f64]| {
            x.iter()
                .zip([0.7, 0.2])
                .map(|(v, c)| {
                    let s = (v - c) * 10.0;
                    s * s - 3.0 * (2.0 * std::f64::consts::PI * s).cos() + 3.0
                })
                .sum::<f64>()
        };
        let mut rng = StdRng::seed_from_u64(7);
        let r = anneal(f, &[0.05, 0.95], &mut rng, &opts()).unwrap();
        assert!((r.x[0] - 0.7).abs() < 0.05, "{:?}", r.x);
        assert!((r.x[1] - 0.2).abs() < 0.05, "{:?}", r.x);
    }

    #[test]
    fn survives_infeasible_regions() {
        // Only a narrow band is feasible; the chain must still report a finite best.
        let f = |x: &[f64]| if x[0] > 0.6 { (x[0] - 0.8).powi(2) } else { f64::INFINITY };
        let mut rng = StdRng::seed_from_u64(1);
        let r = anneal(f, &[0.1], &mut rng, &opts()).unwrap();
        assert!(r.value.is_finite());
        assert!((r.x[0] - 0.8).abs() < 0.05, "{:?}", r.x);
    }

    #[test]
    fn restarts_when_cold() {
        let f = |x: &[f64]| x[0];
        let mut rng = StdRng::seed_from_u64(3);
        let o = AnnealOptions {
            max_iter: 50,
            initial_temp: 1.0,
            restart_ratio: 0.1,
        };
        let r = anneal(f, &[0.5], &mut rng, &o).unwrap();
        assert!(r.restarts >= 1);
        assert!(r.x.iter().all(|v| (0.0..=1.0).contains(v)));
    }
}
