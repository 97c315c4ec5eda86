//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - loads or simulates experiments
//! - runs the calibration (single or multi-start)
//! - prints reports/plots
//! - writes optional exports

use clap::Parser;
use log::info;

use crate::cli::{Command, FitArgs, PlotArgs, SimulateArgs};
use crate::data::{REFERENCE_TRUTH, SimulationSpec, simulate_experiments};
use crate::domain::FitConfig;
use crate::error::AppError;

pub mod pipeline;

/// Entry point for the `kfit` binary.
pub fn run() -> Result<(), AppError> {
    // `kfit` and `kfit --guess ...` behave like `kfit fit ...`.
    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);

    match cli.command {
        Command::Fit(args) => handle_fit(args),
        Command::Simulate(args) => handle_simulate(args),
        Command::Plot(args) => handle_plot(args),
    }
}

fn handle_fit(args: FitArgs) -> Result<(), AppError> {
    let config = fit_config_from_args(&args);
    let run = pipeline::run_fit(&config)?;

    println!(
        "{}",
        crate::report::format_run_summary(
            &run.experiments,
            &config.initial_guess,
            &run.fit,
            run.multistart.as_ref(),
        )
    );
    println!(
        "{}",
        crate::report::format_parameter_table(&config.initial_guess, &run.fit)
    );
    if let Some(report) = &run.discrepancy {
        println!("{}", crate::report::format_discrepancy(report));
    }
    if config.show_residuals {
        println!(
            "{}",
            crate::report::format_residual_table(&run.residuals, &run.experiments)
        );
    }

    if config.plot {
        let plot = crate::plot::render_ascii_plot(
            &run.experiments,
            &run.fit.parameters,
            config.plot_width,
            config.plot_height,
        );
        println!("{plot}");
    }

    // Optional exports.
    if let Some(path) = &config.export_residuals {
        crate::io::write_residuals_csv(path, &run.residuals)?;
        info!("wrote residuals to {}", path.display());
    }
    if let Some(path) = &config.export_fit {
        let fit_file = crate::io::build_fit_file(&config.initial_guess, &run.fit, &run.experiments);
        crate::io::write_fit_json(path, &fit_file)?;
        info!("wrote fit to {}", path.display());
    }

    Ok(())
}

fn handle_simulate(args: SimulateArgs) -> Result<(), AppError> {
    let spec = simulation_spec_from_args(&args);
    let experiments = simulate_experiments(&spec)?;
    crate::io::write_experiments_json(&args.out, &experiments)?;

    println!(
        "Wrote {} experiments ({} points each, noise sd={}) to {}",
        experiments.len(),
        spec.times.len(),
        spec.noise_sd,
        args.out.display()
    );
    Ok(())
}

fn handle_plot(args: PlotArgs) -> Result<(), AppError> {
    let fit_file = crate::io::read_fit_json(&args.fit)?;

    println!(
        "Fit from {} ({}): {}",
        fit_file.tool, fit_file.generated_at, fit_file.fit.parameters
    );
    let plot = crate::plot::render_ascii_plot_from_fit_file(&fit_file, args.width, args.height);
    println!("{plot}");
    Ok(())
}

pub fn fit_config_from_args(args: &FitArgs) -> FitConfig {
    // The reference truth only describes the bundled experiments.
    let truth = if args.no_truth {
        None
    } else if args.truth.is_some() {
        args.truth
    } else if args.data.is_none() {
        Some(REFERENCE_TRUTH)
    } else {
        None
    };

    FitConfig {
        data_path: args.data.clone(),
        experiments: args.experiments.clone(),
        initial_guess: args.guess,
        truth,
        max_iterations: args.max_iter,
        multistart: args.multistart,
        grid_ea: args.grid_ea,
        grid_dh: args.grid_dh,
        show_residuals: args.residuals,
        plot: !args.no_plot,
        plot_width: args.width,
        plot_height: args.height,
        export_fit: args.export_fit.clone(),
        export_residuals: args.export_residuals.clone(),
    }
}

pub fn simulation_spec_from_args(args: &SimulateArgs) -> SimulationSpec {
    let defaults = SimulationSpec::default();
    SimulationSpec {
        truth: args.truth,
        temperatures: if args.temperatures.is_empty() {
            defaults.temperatures
        } else {
            args.temperatures.clone()
        },
        times: args.times.clone().unwrap_or(defaults.times),
        c_a0: args.c_a0,
        c_b0: args.c_b0,
        noise_sd: args.noise,
        seed: args.seed,
    }
}

/// Rewrite argv so `kfit` defaults to `kfit fit`.
///
/// Rules:
/// - `kfit`                      -> `kfit fit`
/// - `kfit --guess ... `         -> `kfit fit --guess ...`
/// - `kfit --help/--version/-h`  -> unchanged (show top-level help/version)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("fit".to_string());
        return argv;
    };

    let is_top_level_help_or_version = matches!(
        arg1.as_str(),
        "-h" | "--help" | "-V" | "--version" | "help"
    );
    if is_top_level_help_or_version {
        return argv;
    }

    if arg1.starts_with('-') {
        argv.insert(1, "fit".to_string());
    }
    argv
}
