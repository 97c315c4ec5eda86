//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the math/fitting code stays clean and testable
//! - output changes are localized (golden tests below pin the layout)

use crate::domain::{ExperimentData, FitResult, N_PARAMS, PARAM_NAMES, PARAM_UNITS, ParameterSet, PointResidual};
use crate::fit::{DiscrepancyReport, MultiStartOutcome};

/// Format the run summary (experiments + solver diagnostics + fit quality).
pub fn format_run_summary(
    experiments: &[ExperimentData],
    initial_guess: &ParameterSet,
    fit: &FitResult,
    multistart: Option<&MultiStartOutcome>,
) -> String {
    let mut out = String::new();

    out.push_str("=== kfit - A<=>B kinetics calibration ===\n");
    out.push_str(&format!(
        "Experiments: {} | points: n={}\n",
        experiments.len(),
        fit.quality.n
    ));
    for exp in experiments {
        let (t_first, t_last) = match (exp.times.first(), exp.times.last()) {
            (Some(a), Some(b)) => (*a, *b),
            _ => (f64::NAN, f64::NAN),
        };
        out.push_str(&format!(
            "  {:<12} T={:.2}K cA0={:.3} cB0={:.3} n={} t=[{t_first:.1}, {t_last:.1}]s\n",
            truncate(&exp.display_label(), 12),
            exp.temperature,
            exp.c_a0,
            exp.c_b0,
            exp.len(),
        ));
    }

    out.push_str(&format!("\nStarting guess: {initial_guess}\n"));
    if let Some(ms) = multistart {
        out.push_str(&format!(
            "Multi-start: best #{} of {} starts ({} failed), from {}\n",
            ms.best_index,
            ms.attempts.len(),
            ms.failures(),
            ms.attempts[ms.best_index].guess
        ));
    }

    let q = &fit.quality;
    out.push_str(&format!(
        "Solver: {} after {} iterations ({} evaluations)\n",
        q.termination.display_name(),
        q.iterations,
        q.evaluations
    ));
    out.push_str(&format!(
        "Fit quality: SSE={:.6} RMSE={:.6} dof={}\n",
        q.sse, q.rmse, q.dof
    ));
    out.push_str(&format!("Optimized: {}\n", fit.parameters));
    if fit.is_degenerate() {
        out.push_str("Warning: covariance is degenerate; some standard errors are undefined.\n");
    }
    out.push('\n');

    out
}

/// Side-by-side guess / optimized / standard error table.
pub fn format_parameter_table(initial_guess: &ParameterSet, fit: &FitResult) -> String {
    let guess = initial_guess.to_array();
    let opt = fit.parameters.to_array();
    let se = fit.standard_errors();

    let mut out = String::new();
    out.push_str(
        format!(
            "{:<6} {:>12} {:>14} {:>14} {:>12}",
            "param", "unit", "guess", "optimized", "stderr"
        )
        .trim_end(),
    );
    out.push('\n');
    out.push_str(format!("{:-<6} {:-<12} {:-<14} {:-<14} {:-<12}", "", "", "", "", "").trim_end());
    out.push('\n');

    for i in 0..N_PARAMS {
        out.push_str(
            format!(
                "{:<6} {:>12} {:>14.4} {:>14.4} {:>12.4}",
                PARAM_NAMES[i], PARAM_UNITS[i], guess[i], opt[i], se[i]
            )
            .trim_end(),
        );
        out.push('\n');
    }

    out
}

/// Truth vs optimized in units of standard error.
pub fn format_discrepancy(report: &DiscrepancyReport) -> String {
    let mut out = String::new();
    out.push_str("Discrepancy vs truth (z = (optimized - truth) / stderr):\n");
    out.push_str(
        format!(
            "{:<6} {:>14} {:>14} {:>12} {:>8}",
            "param", "truth", "optimized", "stderr", "z"
        )
        .trim_end(),
    );
    out.push('\n');
    out.push_str(format!("{:-<6} {:-<14} {:-<14} {:-<12} {:-<8}", "", "", "", "", "").trim_end());
    out.push('\n');

    for row in &report.rows {
        out.push_str(
            format!(
                "{:<6} {:>14.4} {:>14.4} {:>12.4} {:>8.3}",
                row.name, row.truth, row.optimized, row.stderr, row.z
            )
            .trim_end(),
        );
        out.push('\n');
    }

    match report.max_abs_z() {
        Some(z) => out.push_str(&format!("max |z| = {z:.3}\n")),
        None => out.push_str("max |z| = undefined\n"),
    }

    out
}

/// Per-point observed vs fitted values.
pub fn format_residual_table(residuals: &[PointResidual], experiments: &[ExperimentData]) -> String {
    let mut out = String::new();
    out.push_str(
        format!(
            "{:<12} {:>8} {:>10} {:>10} {:>10}",
            "experiment", "time", "c_a_obs", "c_a_fit", "residual"
        )
        .trim_end(),
    );
    out.push('\n');
    out.push_str(format!("{:-<12} {:-<8} {:-<10} {:-<10} {:-<10}", "", "", "", "", "").trim_end());
    out.push('\n');

    for r in residuals {
        let label = experiments
            .get(r.experiment)
            .map(ExperimentData::display_label)
            .unwrap_or_else(|| format!("#{}", r.experiment));
        out.push_str(
            format!(
                "{:<12} {:>8.2} {:>10.4} {:>10.4} {:>10.4}",
                truncate(&label, 12),
                r.time,
                r.c_a_obs,
                r.c_a_fit,
                r.residual
            )
            .trim_end(),
        );
        out.push('\n');
    }

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
