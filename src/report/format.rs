//! Terminal formatting for fit runs.
//!
//! Everything that turns numbers into text for stdout lives here, so the
//! search and projection code never prints.

use crate::app::pipeline::{HoldoutReport, RunOutput};
use crate::domain::{CalibrationConfig, ProjectionParameters, RecordResidual, ResidualSummary};
use crate::fit::{CrossValidation, WinnerSource};
use crate::projection::proj_definition;

/// Format the run header: dataset, search diagnostics and fitted parameters.
pub fn format_run_summary(run: &RunOutput, config: &CalibrationConfig) -> String {
    let mut out = String::new();
    let outcome = &run.outcome;

    out.push_str("=== tmcal - Transverse Mercator calibration ===\n");
    out.push_str(&format!("Input: {} ({} records)\n", config.input.display(), run.records.len()));
    out.push_str(&format!(
        "Projector: {} | axes: {:?} | ellipsoid: {:?}\n",
        run.projector, config.axes, config.ellipsoid
    ));
    out.push_str(&format!(
        "Search: seed={} chains={} iterations={} T0={} profile_steps={}\n",
        config.search.seed,
        config.search.chains,
        config.search.max_iter,
        config.search.initial_temp,
        config.search.profile_steps
    ));

    out.push_str("\nSearch diagnostics:\n");
    match &outcome.profile {
        Some(seed) => out.push_str(&format!("  profile seed  cost={:.6e}  lon0={:.6}\n", seed.cost, seed.params.central_longitude)),
        None => out.push_str("  profile seed  (none)\n"),
    }
    for c in &outcome.chains {
        let chosen = if outcome.winner == WinnerSource::Chain(c.chain) { "*" } else { " " };
        out.push_str(&format!(
            "{chosen} chain {:<6} cost={:.6e}  accepted={} restarts={}\n",
            c.chain, c.cost, c.accepted, c.restarts
        ));
    }
    if outcome.winner == WinnerSource::Profile {
        out.push_str("* profile seed beat every chain\n");
    }
    out.push_str(&format!(
        "  evaluations={} (infeasible {}) status={}\n",
        outcome.evaluations,
        outcome.infeasible,
        outcome.status.as_str()
    ));

    out.push_str("\nParameters:\n");
    out.push_str(&format_parameters(&outcome.params));
    out.push_str(&format!("- proj : {}\n", proj_definition(&outcome.params, config.ellipsoid).join(" ")));

    out.push_str("\nFit quality:\n");
    out.push_str(&format!("- cost : {:.6e} m^2\n", outcome.cost));
    out.push_str(&format_summary_line(&run.summary));

    out
}

/// One line per parameter.
pub fn format_parameters(p: &ProjectionParameters) -> String {
    format!(
        "- k0   : {:.10}\n- lon0 : {:.8} deg\n- x0   : {:.3} m\n- y0   : {:.3} m\n",
        p.scale_factor, p.central_longitude, p.false_easting, p.false_northing
    )
}

fn format_summary_line(s: &ResidualSummary) -> String {
    format!(
        "- n={} rms={:.3} m max={:.3} m bias=({:+.3}, {:+.3}) m\n",
        s.n, s.rms, s.max, s.mean_dx, s.mean_dz
    )
}

/// Residual table under a title.
pub fn format_residual_table(title: &str, rows: &[RecordResidual]) -> String {
    let mut out = String::new();
    out.push_str(title);
    out.push_str(":\n");
    out.push_str(
        format!(
            "{:<20} {:>14} {:>14} {:>10} {:>10} {:>10}",
            "label", "x", "z", "dx", "dz", "distance"
        )
        .trim_end(),
    );
    out.push('\n');
    out.push_str(format!("{:-<20} {:-<14} {:-<14} {:-<10} {:-<10} {:-<10}", "", "", "", "", "", "").trim_end());
    out.push('\n');

    for r in rows {
        out.push_str(
            format!(
                "{:<20} {:>14.3} {:>14.3} {:>10.3} {:>10.3} {:>10.3}",
                truncate(&r.record.label, 20),
                r.record.local.x,
                r.record.local.z,
                r.dx,
                r.dz,
                r.distance
            )
            .trim_end(),
        );
        out.push('\n');
    }

    out
}

/// Held-out file residuals and their summary.
pub fn format_holdout(report: &HoldoutReport) -> String {
    let mut out = format_residual_table(&format!("Holdout ({})", report.path.display()), &report.residuals);
    out.push_str(&format_summary_line(&report.summary));
    out
}

/// Leave-one-out prediction residuals, with how far each fold's parameters moved.
pub fn format_cross_validation(cv: &CrossValidation, full: &ProjectionParameters) -> String {
    let mut out = String::new();
    out.push_str("Leave-one-out:\n");
    out.push_str(
        format!(
            "{:<20} {:>10} {:>12} {:>12} {:>12}",
            "excluded", "distance", "d_k0", "d_lon0", "cost"
        )
        .trim_end(),
    );
    out.push('\n');
    out.push_str(format!("{:-<20} {:-<10} {:-<12} {:-<12} {:-<12}", "", "", "", "", "").trim_end());
    out.push('\n');

    for fold in &cv.folds {
        out.push_str(
            format!(
                "{:<20} {:>10.3} {:>12.3e} {:>12.6} {:>12.4e}",
                truncate(&fold.residual.record.label, 20),
                fold.residual.distance,
                fold.params.scale_factor - full.scale_factor,
                fold.params.central_longitude - full.central_longitude,
                fold.cost
            )
            .trim_end(),
        );
        out.push('\n');
    }
    out.push_str(&format_summary_line(&cv.summary));
    out
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out = String::new();
    for (i, ch) in s.chars().enumerate() {
        if i + 1 >= max {
            break;
        }
        out.push(ch);
    }
    out.push('.');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CorrespondenceRecord, GeodeticCoordinate, LocalCoordinate};

    fn residual(label: &str, dx: f64, dz: f64) -> RecordResidual {
        RecordResidual {
            record: CorrespondenceRecord {
                label: label.to_string(),
                geodetic: GeodeticCoordinate::new(25.0, 56.0).unwrap(),
                local: LocalCoordinate::new(100.0, -200.0),
            },
            predicted: LocalCoordinate::new(100.0 - dx, -200.0 - dz),
            dx,
            dz,
            distance: dx.hypot(dz),
        }
    }

    #[test]
    fn residual_table_has_header_rule_and_rows() {
        let table = format_residual_table("Residuals", &[residual("Khasab", 3.0, 4.0), residual("Dubai", 0.0, 0.0)]);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[0], "Residuals:");
        assert!(lines[1].starts_with("label"));
        assert!(lines[2].starts_with("----"));
        assert!(lines[3].starts_with("Khasab"));
        assert!(lines[3].ends_with("5.000"));
        assert!(lines.iter().all(|l| l.len() == l.trim_end().len()));
    }

    #[test]
    fn long_labels_are_truncated() {
        assert_eq!(truncate("Bandar Abbas International", 10), "Bandar Ab.");
        assert_eq!(truncate("Sirri", 10), "Sirri");
    }

    #[test]
    fn parameters_are_listed_in_order() {
        let text = format_parameters(&ProjectionParameters::new(0.9996, 57.0, 75_756.0, -2_894_933.0));
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "- k0   : 0.9996000000");
        assert_eq!(lines[1], "- lon0 : 57.00000000 deg");
        assert_eq!(lines[3], "- y0   : -2894933.000 m");
    }
}
