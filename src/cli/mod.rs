//! Command-line parsing for the kinetics calibration tool.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the modeling/math code.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::domain::{GridAxis, ParameterSet};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "kfit", version, about = "Reversible A<=>B kinetics calibration")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fit the kinetic parameters, print diagnostics, and optionally plot/export.
    Fit(FitArgs),
    /// Generate a synthetic experiment JSON file.
    Simulate(SimulateArgs),
    /// Plot a previously exported fit JSON.
    Plot(PlotArgs),
}

/// Options for fitting.
#[derive(Debug, Parser, Clone)]
pub struct FitArgs {
    /// Experiment JSON file (defaults to the bundled reference experiments).
    #[arg(long, value_name = "JSON")]
    pub data: Option<PathBuf>,

    /// Fit only these experiments (0-based index; repeatable). Default: all.
    #[arg(long = "experiment", value_name = "N")]
    pub experiments: Vec<usize>,

    /// Starting guess `logA,Ea,dH,dS` (Ea in kJ/mol, dH in J/mol, dS in J/mol/K).
    #[arg(long, default_value = "6.0,45.0,-10000.0,-50.0", allow_hyphen_values = true)]
    pub guess: ParameterSet,

    /// Known parameters `logA,Ea,dH,dS` for the discrepancy report.
    ///
    /// Defaults to the reference truth when fitting the bundled experiments.
    #[arg(long, allow_hyphen_values = true)]
    pub truth: Option<ParameterSet>,

    /// Skip the discrepancy report.
    #[arg(long, conflicts_with = "truth")]
    pub no_truth: bool,

    /// Refine a grid of starting guesses and keep the lowest SSE.
    #[arg(long)]
    pub multistart: bool,

    /// Multi-start grid for Ea: `min,max,steps` (kJ/mol).
    #[arg(long, default_value = "35,65,4", allow_hyphen_values = true)]
    pub grid_ea: GridAxis,

    /// Multi-start grid for dH: `min,max,steps` (J/mol).
    #[arg(long, default_value = "-20000,-5000,4", allow_hyphen_values = true)]
    pub grid_dh: GridAxis,

    /// Solver iteration limit.
    #[arg(long = "max-iter", default_value_t = 500)]
    pub max_iter: usize,

    /// Print the per-point residual table.
    #[arg(long)]
    pub residuals: bool,

    /// Render an ASCII plot in the terminal (enabled by default).
    #[arg(long, overrides_with = "no_plot")]
    pub plot: bool,

    /// Disable the terminal plot.
    #[arg(long, overrides_with = "plot")]
    pub no_plot: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 80)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 20)]
    pub height: usize,

    /// Export the fit (parameters + covariance + fitted grids) to JSON.
    #[arg(long = "export-fit", value_name = "JSON")]
    pub export_fit: Option<PathBuf>,

    /// Export per-point residuals to CSV.
    #[arg(long = "export-residuals", value_name = "CSV")]
    pub export_residuals: Option<PathBuf>,
}

/// Options for synthetic data generation.
#[derive(Debug, Parser, Clone)]
pub struct SimulateArgs {
    /// Output experiment JSON file.
    #[arg(long, value_name = "JSON")]
    pub out: PathBuf,

    /// Parameters `logA,Ea,dH,dS` to simulate from.
    #[arg(long, default_value = "6.9,49.0,-13000.0,-42.0", allow_hyphen_values = true)]
    pub truth: ParameterSet,

    /// Standard deviation of the Gaussian measurement noise (mol/L).
    #[arg(long, default_value_t = 0.05)]
    pub noise: f64,

    /// Random seed.
    #[arg(long, default_value_t = 7)]
    pub seed: u64,

    /// Temperature of one experiment (K; repeatable). Default: 298.15, 308.15, 323.15.
    #[arg(long = "temperature", value_name = "K")]
    pub temperatures: Vec<f64>,

    /// Sample times `t1,t2,...` (s), shared by every experiment.
    #[arg(long, value_delimiter = ',')]
    pub times: Option<Vec<f64>>,

    /// Initial concentration of A (mol/L).
    #[arg(long = "c-a0", default_value_t = 10.0)]
    pub c_a0: f64,

    /// Initial concentration of B (mol/L).
    #[arg(long = "c-b0", default_value_t = 0.0)]
    pub c_b0: f64,
}

/// Options for plotting a saved fit.
#[derive(Debug, Parser)]
pub struct PlotArgs {
    /// Fit JSON file produced by `kfit fit --export-fit`.
    #[arg(long, value_name = "JSON")]
    pub fit: PathBuf,

    /// Plot width (columns).
    #[arg(long, default_value_t = 80)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 20)]
    pub height: usize,
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn fit_defaults_and_negative_lists() {
        let cli = Cli::try_parse_from([
            "kfit",
            "fit",
            "--experiment",
            "0",
            "--experiment",
            "2",
            "--truth",
            "6.9,49,-13000,-42",
            "--grid-dh",
            "-15000,-10000,3",
        ])
        .unwrap();
        let Command::Fit(args) = cli.command else {
            panic!("expected fit");
        };
        assert_eq!(args.experiments, vec![0, 2]);
        assert_eq!(args.guess, ParameterSet::new(6.0, 45.0, -10000.0, -50.0));
        assert_eq!(args.truth, Some(ParameterSet::new(6.9, 49.0, -13000.0, -42.0)));
        assert_eq!(args.grid_dh.steps, 3);
        assert_eq!(args.grid_dh.min, -15000.0);
        assert_eq!(args.max_iter, 500);
        assert!(!args.no_plot);
    }

    #[test]
    fn simulate_parses_times_and_temperatures() {
        let cli = Cli::try_parse_from([
            "kfit",
            "simulate",
            "--out",
            "exps.json",
            "--temperature",
            "300",
            "--temperature",
            "320",
            "--times",
            "1,2,4",
        ])
        .unwrap();
        let Command::Simulate(args) = cli.command else {
            panic!("expected simulate");
        };
        assert_eq!(args.temperatures, vec![300.0, 320.0]);
        assert_eq!(args.times, Some(vec![1.0, 2.0, 4.0]));
        assert_eq!(args.noise, 0.05);
    }

    #[test]
    fn malformed_guess_is_rejected() {
        assert!(Cli::try_parse_from(["kfit", "fit", "--guess", "1,2,3"]).is_err());
        assert!(Cli::try_parse_from(["kfit", "fit", "--no-truth", "--truth", "1,2,3,4"]).is_err());
    }
}
