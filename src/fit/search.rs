//! Bounded global search for the projection parameters.
//!
//! Pipeline:
//!
//! 1. profile seed over λ₀ (optional, see `fit::profile`)
//! 2. independent annealing chains in parallel; chain 0 starts at the seed
//! 3. Nelder–Mead polish of the best point
//!
//! Everything runs in unit-cube coordinates, so every parameter vector handed
//! to the cost function lies inside the bounds.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use rand::prelude::*;
use rand::rngs::StdRng;
use rayon::prelude::*;

use crate::domain::{ParameterBounds, ProjectionParameters, SearchConfig};
use crate::error::AppError;
use crate::fit::anneal::{AnnealOptions, anneal};
use crate::fit::cost::ResidualCost;
use crate::fit::profile::{ProfileSeed, profile_search};
use crate::fit::simplex::{SimplexOptions, nelder_mead};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchStatus {
    /// The final polish met its tolerances.
    Converged,
    /// The evaluation budget ran out first; the result is still the best found.
    BudgetExhausted,
}

impl SearchStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SearchStatus::Converged => "converged",
            SearchStatus::BudgetExhausted => "budget exhausted",
        }
    }
}

/// Summary of one annealing chain.
#[derive(Debug, Clone, PartialEq)]
pub struct ChainSummary {
    pub chain: usize,
    pub seed: u64,
    pub start_cost: f64,
    pub cost: f64,
    pub evaluations: usize,
    pub accepted: usize,
    pub restarts: usize,
}

/// Where the winning point came from before polishing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WinnerSource {
    Profile,
    Chain(usize),
}

#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub params: ProjectionParameters,
    pub cost: f64,
    /// Projector invocations across all phases.
    pub evaluations: usize,
    /// Evaluations priced as `+∞`.
    pub infeasible: usize,
    pub status: SearchStatus,
    /// `true` if the profile search produced a seed.
    pub seeded: bool,
    pub profile: Option<ProfileSeed>,
    pub chains: Vec<ChainSummary>,
    pub winner: WinnerSource,
    /// Cost before the polish (equal to `cost` when polishing is off or did not help).
    pub pre_polish_cost: f64,
}

#[derive(Debug, Clone)]
struct ChainRun {
    summary: ChainSummary,
    x: Vec<f64>,
}

/// Search `bounds` for the parameters minimizing `cost`.
pub fn search(
    cost: &ResidualCost<'_>,
    bounds: &ParameterBounds,
    config: &SearchConfig,
) -> Result<SearchOutcome, AppError> {
    bounds.validate()?;
    validate_config(config)?;
    if cost.records().is_empty() {
        return Err(AppError::new(3, "No correspondence records to fit."));
    }

    let objective = |u: &[f64]| cost.evaluate(&bounds.from_unit(u));

    let profile = if config.profile_steps > 0 {
        profile_search(cost, bounds, config.profile_steps)?
    } else {
        None
    };
    check_fatal(cost)?;
    if let Some(seed) = &profile {
        log::info!(
            "profile seed: k0={:.8} lon0={:.6} x0={:.3} y0={:.3} cost={:.6e}",
            seed.params.scale_factor,
            seed.params.central_longitude,
            seed.params.false_easting,
            seed.params.false_northing,
            seed.cost
        );
    }

    let opts = AnnealOptions {
        max_iter: config.max_iter,
        initial_temp: config.initial_temp,
        restart_ratio: config.restart_temp_ratio,
    };
    let seed_unit = profile.as_ref().map(|p| bounds.to_unit(&p.params));

    let runs: Vec<ChainRun> = (0..config.chains)
        .into_par_iter()
        .map(|chain| -> Result<ChainRun, AppError> {
            let seed = chain_seed(config.seed, chain);
            let mut rng = StdRng::seed_from_u64(seed);
            let x0: Vec<f64> = match (chain, seed_unit) {
                (0, Some(u)) => u.to_vec(),
                _ => (0..4).map(|_| rng.r#gen::<f64>()).collect(),
            };
            let start_cost = objective(&x0);
            let r = anneal(objective, &x0, &mut rng, &opts)?;
            Ok(ChainRun {
                summary: ChainSummary {
                    chain,
                    seed,
                    start_cost,
                    cost: r.value,
                    evaluations: r.evaluations,
                    accepted: r.accepted,
                    restarts: r.restarts,
                },
                x: r.x,
            })
        })
        .collect::<Result<Vec<_>, AppError>>()?;
    check_fatal(cost)?;

    for run in &runs {
        log::debug!(
            "chain {}: cost={:.6e} (start {:.6e}), accepted={}, restarts={}",
            run.summary.chain,
            run.summary.cost,
            run.summary.start_cost,
            run.summary.accepted,
            run.summary.restarts
        );
    }

    // Deterministic selection: minimum cost; ties go to the profile, then the
    // lowest chain index.
    let mut winner = WinnerSource::Profile;
    let mut best_x: Option<Vec<f64>> = seed_unit.map(|u| u.to_vec());
    let mut best = profile.as_ref().map_or(f64::INFINITY, |p| p.cost);
    for run in &runs {
        if run.summary.cost < best || best_x.is_none() {
            winner = WinnerSource::Chain(run.summary.chain);
            best = run.summary.cost;
            best_x = Some(run.x.clone());
        }
    }
    let Some(mut best_x) = best_x else {
        return Err(AppError::new(4, "Search produced no candidate points."));
    };
    let pre_polish_cost = best;

    let mut status = SearchStatus::BudgetExhausted;
    if config.polish && best.is_finite() {
        let polished = nelder_mead(
            objective,
            &best_x,
            &SimplexOptions {
                max_evals: config.polish_max_evals,
                ..SimplexOptions::default()
            },
        );
        log::debug!(
            "polish: cost {:.6e} -> {:.6e} in {} evaluations (converged={})",
            best,
            polished.value,
            polished.evaluations,
            polished.converged
        );
        if polished.converged {
            status = SearchStatus::Converged;
        }
        if polished.value < best {
            best_x = polished.x;
        }
    }
    check_fatal(cost)?;

    let params = bounds.from_unit(&best_x);
    let final_cost = cost.evaluate(&params);
    if !final_cost.is_finite() {
        return Err(AppError::new(
            4,
            format!(
                "No feasible parameters found within bounds ({} of {} evaluations failed).",
                cost.infeasible(),
                cost.evaluations()
            ),
        ));
    }

    log::info!(
        "search finished: cost={:.6e}, {} evaluations ({} infeasible), {}",
        final_cost,
        cost.evaluations(),
        cost.infeasible(),
        status.as_str()
    );

    Ok(SearchOutcome {
        params,
        cost: final_cost,
        evaluations: cost.evaluations(),
        infeasible: cost.infeasible(),
        status,
        seeded: profile.is_some(),
        profile,
        chains: runs.into_iter().map(|r| r.summary).collect(),
        winner,
        pre_polish_cost,
    })
}

fn validate_config(config: &SearchConfig) -> Result<(), AppError> {
    if config.chains == 0 {
        return Err(AppError::new(2, "Search needs at least one chain."));
    }
    if !(config.initial_temp.is_finite() && config.initial_temp > 0.0) {
        return Err(AppError::new(2, "Initial temperature must be finite and > 0."));
    }
    if !(config.restart_temp_ratio > 0.0 && config.restart_temp_ratio < 1.0) {
        return Err(AppError::new(2, "Restart temperature ratio must lie in (0, 1)."));
    }
    if config.profile_steps == 1 {
        return Err(AppError::new(2, "Profile steps must be 0 (disabled) or >= 2."));
    }
    Ok(())
}

fn check_fatal(cost: &ResidualCost<'_>) -> Result<(), AppError> {
    match cost.fatal_error() {
        Some(err) => Err(AppError::from(err.clone())),
        None => Ok(()),
    }
}

/// Per-chain RNG seed derived from the base seed.
fn chain_seed(seed: u64, chain: usize) -> u64 {
    let mut hasher = DefaultHasher::new();
    seed.hash(&mut hasher);
    chain.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::synthetic_records;
    use crate::domain::{
        AxisOrder, CorrespondenceRecord, GeodeticCoordinate, LocalCoordinate, ParameterRange, RangeKind,
    };
    use crate::error::ProjectionError;
    use crate::projection::{ForwardProjector, TransverseMercator};

    fn truth() -> ProjectionParameters {
        ProjectionParameters::new(0.9996, 57.0, 75_756.0, -2_894_933.0)
    }

    fn points() -> Vec<GeodeticCoordinate> {
        (0..8)
            .map(|i| GeodeticCoordinate::new(24.0 + 0.8 * i as f64, 51.0 + ((i * 37) % 8) as f64).unwrap())
            .collect()
    }

    fn assert_recovered(got: &ProjectionParameters) {
        for (name, (g, t)) in ParameterBounds::NAMES.iter().zip(got.to_array().iter().zip(truth().to_array())) {
            assert!(((g - t) / t).abs() < 1e-3, "{name}: got {g}, want {t}");
        }
    }

    #[test]
    fn round_trip_recovers_parameters() {
        let tm = TransverseMercator::default();
        let records = synthetic_records(&tm, &truth(), &points()).unwrap();
        let cost = ResidualCost::new(&tm, &records);

        let out = search(&cost, &ParameterBounds::default(), &SearchConfig::default()).unwrap();
        assert_recovered(&out.params);
        assert!(out.seeded);
        assert!(out.cost < 1e-3, "cost={}", out.cost);
        assert_eq!(out.chains.len(), 4);
    }

    #[test]
    fn annealing_alone_recovers_parameters() {
        let tm = TransverseMercator::default();
        let records = synthetic_records(&tm, &truth(), &points()).unwrap();
        let cost = ResidualCost::new(&tm, &records);
        let config = SearchConfig {
            profile_steps: 0,
            ..SearchConfig::default()
        };

        let out = search(&cost, &ParameterBounds::default(), &config).unwrap();
        assert!(!out.seeded);
        assert!(matches!(out.winner, WinnerSource::Chain(_)));
        assert_recovered(&out.params);
    }

    #[test]
    fn result_respects_bounds_when_optimum_is_outside() {
        let tm = TransverseMercator::default();
        let records = synthetic_records(&tm, &truth(), &points()).unwrap();
        let cost = ResidualCost::new(&tm, &records);

        let mut bounds = ParameterBounds::default();
        bounds.scale_factor = ParameterRange::new(1.2, 1.5, RangeKind::Practical);
        bounds.central_longitude = ParameterRange::new(60.0, 70.0, RangeKind::Practical);

        let config = SearchConfig {
            max_iter: 200,
            ..SearchConfig::default()
        };
        let out = search(&cost, &bounds, &config).unwrap();
        assert!(bounds.contains(&out.params), "{:?}", out.params);
        assert!(out.cost.is_finite());
    }

    #[test]
    fn same_seed_gives_same_result() {
        let tm = TransverseMercator::default();
        let records = synthetic_records(&tm, &truth(), &points()).unwrap();
        let config = SearchConfig {
            max_iter: 100,
            profile_steps: 0,
            ..SearchConfig::default()
        };

        let a = search(&ResidualCost::new(&tm, &records), &ParameterBounds::default(), &config).unwrap();
        let b = search(&ResidualCost::new(&tm, &records), &ParameterBounds::default(), &config).unwrap();
        assert_eq!(a.params, b.params);
        assert_eq!(a.chains, b.chains);
    }

    #[test]
    fn empty_record_set_is_not_enough_data() {
        let tm = TransverseMercator::default();
        let cost = ResidualCost::new(&tm, &[]);
        let err = search(&cost, &ParameterBounds::default(), &SearchConfig::default()).unwrap_err();
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn rejects_invalid_config() {
        let tm = TransverseMercator::default();
        let records = synthetic_records(&tm, &truth(), &points()).unwrap();
        let cost = ResidualCost::new(&tm, &records);
        let config = SearchConfig {
            chains: 0,
            ..SearchConfig::default()
        };
        assert_eq!(
            search(&cost, &ParameterBounds::default(), &config).unwrap_err().exit_code(),
            2
        );
    }

    struct Broken;

    impl ForwardProjector for Broken {
        fn name(&self) -> &'static str {
            "broken"
        }

        fn axes(&self) -> AxisOrder {
            AxisOrder::NorthingEasting
        }

        fn project_batch(
            &self,
            _params: &ProjectionParameters,
            _points: &[GeodeticCoordinate],
        ) -> Result<Vec<LocalCoordinate>, ProjectionError> {
            Err(ProjectionError::Tool("proj: not found".to_string()))
        }
    }

    #[test]
    fn tool_failure_aborts_search() {
        let records = vec![CorrespondenceRecord {
            label: "1".to_string(),
            geodetic: GeodeticCoordinate::new(25.0, 55.0).unwrap(),
            local: LocalCoordinate::new(0.0, 0.0),
        }];
        let cost = ResidualCost::new(&Broken, &records);
        let err = search(&cost, &ParameterBounds::default(), &SearchConfig::default()).unwrap_err();
        assert_eq!(err.exit_code(), 4);
        assert!(err.message().contains("not found"), "{}", err.message());
    }

    #[test]
    fn chain_seeds_differ() {
        assert_ne!(chain_seed(42, 0), chain_seed(42, 1));
        assert_eq!(chain_seed(42, 3), chain_seed(42, 3));
    }
}
