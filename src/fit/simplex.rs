//! Nelder–Mead simplex minimizer on the unit hypercube.
//!
//! Used as a local polish after annealing and for the inverse `locate` search.
//! Trial points are clamped into `[0, 1]^n`, which keeps every evaluation
//! inside the caller's bounds.

/// Simplex options.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimplexOptions {
    /// Edge length of the initial simplex (unit-cube units).
    pub initial_step: f64,
    pub max_evals: usize,
    /// Relative spread of vertex values below which we stop.
    pub ftol: f64,
    /// Max coordinate distance between vertices below which we stop.
    pub xtol: f64,
}

impl Default for SimplexOptions {
    fn default() -> Self {
        Self {
            initial_step: 0.01,
            max_evals: 4000,
            ftol: 1e-14,
            xtol: 1e-12,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimplexResult {
    pub x: Vec<f64>,
    pub value: f64,
    pub evaluations: usize,
    /// `true` if both tolerances were met before the budget ran out.
    pub converged: bool,
}

/// Minimize `f` starting from `x0`.
pub fn nelder_mead<F>(f: F, x0: &[f64], opts: &SimplexOptions) -> SimplexResult
where
    F: Fn(&[f64]) -> f64,
{
    let n = x0.len();
    let eval = |x: &[f64]| {
        let v = f(x);
        if v.is_nan() { f64::INFINITY } else { v }
    };

    let start: Vec<f64> = x0.iter().map(|v| v.clamp(0.0, 1.0)).collect();
    let mut points = vec![start.clone()];
    for i in 0..n {
        let mut p = start.clone();
        p[i] = if p[i] + opts.initial_step <= 1.0 {
            p[i] + opts.initial_step
        } else {
            p[i] - opts.initial_step
        };
        points.push(p);
    }
    let mut values: Vec<f64> = points.iter().map(|p| eval(p)).collect();
    let mut evaluations = n + 1;
    let mut converged = false;

    while evaluations < opts.max_evals {
        sort_simplex(&mut points, &mut values);

        let best = values[0];
        let worst = values[n];
        let f_spread = (worst - best).abs();
        let x_spread = points[1..]
            .iter()
            .flat_map(|p| p.iter().zip(&points[0]).map(|(a, b)| (a - b).abs()))
            .fold(0.0_f64, f64::max);
        if f_spread <= opts.ftol * best.abs() + f64::MIN_POSITIVE && x_spread <= opts.xtol {
            converged = true;
            break;
        }

        let centroid: Vec<f64> = (0..n)
            .map(|d| points[..n].iter().map(|p| p[d]).sum::<f64>() / n as f64)
            .collect();

        let reflected = along(&centroid, &points[n], -1.0);
        let f_reflected = eval(&reflected);
        evaluations += 1;

        if f_reflected < values[0] {
            let expanded = along(&centroid, &points[n], -2.0);
            let f_expanded = eval(&expanded);
            evaluations += 1;
            if f_expanded < f_reflected {
                points[n] = expanded;
                values[n] = f_expanded;
            } else {
                points[n] = reflected;
                values[n] = f_reflected;
            }
        } else if f_reflected < values[n - 1] {
            points[n] = reflected;
            values[n] = f_reflected;
        } else {
            // Outside contraction if the reflection helped at all, inside otherwise.
            let contracted = if f_reflected < values[n] {
                along(&centroid, &reflected, 0.5)
            } else {
                along(&centroid, &points[n], 0.5)
            };
            let f_contracted = eval(&contracted);
            evaluations += 1;

            if f_contracted < f_reflected.min(values[n]) {
                points[n] = contracted;
                values[n] = f_contracted;
            } else {
                for i in 1..=n {
                    let shrunk = along(&points[0], &points[i], 0.5);
                    values[i] = eval(&shrunk);
                    points[i] = shrunk;
                    evaluations += 1;
                }
            }
        }
    }

    sort_simplex(&mut points, &mut values);
    SimplexResult {
        x: points.swap_remove(0),
        value: values[0],
        evaluations,
        converged,
    }
}

/// `origin + t * (target - origin)`, clamped into the unit cube.
fn along(origin: &[f64], target: &[f64], t: f64) -> Vec<f64> {
    origin
        .iter()
        .zip(target)
        .map(|(o, x)| (o + t * (x - o)).clamp(0.0, 1.0))
        .collect()
}

fn sort_simplex(points: &mut Vec<Vec<f64>>, values: &mut Vec<f64>) {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].partial_cmp(&values[b]).unwrap_or(std::cmp::Ordering::Equal));
    *points = order.iter().map(|&i| points[i].clone()).collect();
    *values = order.iter().map(|&i| values[i]).collect();
}
