//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory during fitting
//! - exported to JSON/CSV
//! - reloaded later for plotting or comparisons

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CalibrationError;

/// Number of fitted parameters.
pub const N_PARAMS: usize = 4;

/// Parameter labels in solver/covariance order.
pub const PARAM_NAMES: [&str; N_PARAMS] = ["logA", "Ea", "dH", "dS"];

/// Parameter units in solver/covariance order.
pub const PARAM_UNITS: [&str; N_PARAMS] = ["log10(1/s)", "kJ/mol", "J/mol", "J/mol/K"];

/// Physical parameters of the reversible A⇌B reaction.
///
/// Units:
/// - `log_a`: log10 of the Arrhenius pre-exponential factor (1/s)
/// - `ea`: activation energy (kJ/mol)
/// - `dh`: reaction enthalpy (J/mol)
/// - `ds`: reaction entropy (J/mol/K)
///
/// `Ea` is quoted in kJ/mol while `dH` is quoted in J/mol so that `dH - T·dS`
/// needs no conversion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParameterSet {
    pub log_a: f64,
    pub ea: f64,
    pub dh: f64,
    pub ds: f64,
}

impl ParameterSet {
    pub const fn new(log_a: f64, ea: f64, dh: f64, ds: f64) -> Self {
        Self { log_a, ea, dh, ds }
    }

    pub fn to_array(self) -> [f64; N_PARAMS] {
        [self.log_a, self.ea, self.dh, self.ds]
    }

    pub fn from_array(v: [f64; N_PARAMS]) -> Self {
        Self::new(v[0], v[1], v[2], v[3])
    }

    /// Build from a slice in solver order.
    ///
    /// # Panics
    /// Panics if `v.len() < 4`.
    pub fn from_slice(v: &[f64]) -> Self {
        Self::new(v[0], v[1], v[2], v[3])
    }

    pub fn is_finite(&self) -> bool {
        self.to_array().iter().all(|v| v.is_finite())
    }
}

impl fmt::Display for ParameterSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "logA={:.4}, Ea={:.4}, dH={:.4}, dS={:.4}",
            self.log_a, self.ea, self.dh, self.ds
        )
    }
}

/// Parse `logA,Ea,dH,dS` (used by CLI flags).
impl FromStr for ParameterSet {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let values = parse_f64_list(s)?;
        if values.len() != N_PARAMS {
            return Err(format!(
                "expected {N_PARAMS} comma-separated values (logA,Ea,dH,dS), got {}",
                values.len()
            ));
        }
        Ok(Self::from_slice(&values))
    }
}

/// Parse a comma-separated list of floats.
pub fn parse_f64_list(s: &str) -> Result<Vec<f64>, String> {
    s.split(',')
        .map(|part| {
            let part = part.trim();
            part.parse::<f64>()
                .map_err(|e| format!("invalid number '{part}': {e}"))
        })
        .collect()
}

/// Temperature and initial state of a batch run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReactionConditions {
    /// Absolute temperature (K).
    pub temperature: f64,
    /// Initial concentration of A (mol/L).
    pub c_a0: f64,
    /// Initial concentration of B (mol/L).
    pub c_b0: f64,
}

impl ReactionConditions {
    pub const DEFAULT_TEMPERATURE: f64 = 298.15;
    pub const DEFAULT_C_A0: f64 = 10.0;
    pub const DEFAULT_C_B0: f64 = 0.0;

    pub const fn new(temperature: f64, c_a0: f64, c_b0: f64) -> Self {
        Self {
            temperature,
            c_a0,
            c_b0,
        }
    }

    /// 298.15 K, pure A at 10 mol/L.
    pub const fn default_batch() -> Self {
        Self::new(
            Self::DEFAULT_TEMPERATURE,
            Self::DEFAULT_C_A0,
            Self::DEFAULT_C_B0,
        )
    }
}

impl Default for ReactionConditions {
    fn default() -> Self {
        Self::default_batch()
    }
}

fn default_c_b0() -> f64 {
    ReactionConditions::DEFAULT_C_B0
}

/// One experimental run: measured concentration of A over time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Absolute temperature (K).
    pub temperature: f64,
    /// Initial concentration of A (mol/L).
    pub c_a0: f64,
    /// Initial concentration of B (mol/L).
    #[serde(default = "default_c_b0")]
    pub c_b0: f64,
    /// Sample times (s).
    pub times: Vec<f64>,
    /// Measured concentration of A (mol/L), aligned with `times`.
    pub c_a: Vec<f64>,
}

impl ExperimentData {
    /// Build a validated experiment starting from pure A.
    pub fn new(
        temperature: f64,
        c_a0: f64,
        times: Vec<f64>,
        c_a: Vec<f64>,
    ) -> Result<Self, CalibrationError> {
        let exp = Self {
            label: None,
            temperature,
            c_a0,
            c_b0: ReactionConditions::DEFAULT_C_B0,
            times,
            c_a,
        };
        exp.validate()?;
        Ok(exp)
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_c_b0(mut self, c_b0: f64) -> Self {
        self.c_b0 = c_b0;
        self
    }

    /// Check conditions, shape, time ordering and that observations are finite.
    ///
    /// Deserialized records bypass `new`, so readers call this explicitly.
    pub fn validate(&self) -> Result<(), CalibrationError> {
        if !(self.temperature.is_finite() && self.temperature > 0.0) {
            return Err(CalibrationError::InvalidConditions(format!(
                "temperature must be finite and > 0 K, got {}",
                self.temperature
            )));
        }
        if !(self.c_a0.is_finite() && self.c_a0 >= 0.0 && self.c_b0.is_finite() && self.c_b0 >= 0.0) {
            return Err(CalibrationError::InvalidConditions(format!(
                "initial concentrations must be finite and >= 0, got cA0={} cB0={}",
                self.c_a0, self.c_b0
            )));
        }
        if self.times.len() != self.c_a.len() {
            return Err(CalibrationError::ShapeMismatch {
                expected: self.times.len(),
                found: self.c_a.len(),
            });
        }
        if self.times.iter().any(|t| !t.is_finite() || *t <= 0.0) {
            return Err(CalibrationError::InvalidTimes);
        }
        if self.times.windows(2).any(|w| w[1] <= w[0]) {
            return Err(CalibrationError::InvalidTimes);
        }
        if let Some(i) = self.c_a.iter().position(|c| !c.is_finite()) {
            return Err(CalibrationError::InvalidConditions(format!(
                "observation {i} is not finite"
            )));
        }
        Ok(())
    }

    pub fn conditions(&self) -> ReactionConditions {
        ReactionConditions::new(self.temperature, self.c_a0, self.c_b0)
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Label for tables and plots (falls back to the temperature).
    pub fn display_label(&self) -> String {
        match &self.label {
            Some(l) => l.clone(),
            None => format!("T={:.2}K", self.temperature),
        }
    }
}

/// Why the solver stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Termination {
    /// Relative reduction of the objective fell below `ftol`.
    Ftol,
    /// Scaled step length fell below `xtol`.
    Xtol,
    /// Gradient is orthogonal to the residual vector within `gtol`.
    Gtol,
    /// Residuals are exactly zero.
    ExactFit,
}

impl Termination {
    pub fn display_name(self) -> &'static str {
        match self {
            Termination::Ftol => "objective change below ftol",
            Termination::Xtol => "step below xtol",
            Termination::Gtol => "gradient below gtol",
            Termination::ExactFit => "exact fit",
        }
    }
}

/// Fit quality diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitQuality {
    pub sse: f64,
    pub rmse: f64,
    /// Number of pooled observations.
    pub n: usize,
    /// Degrees of freedom (`n - 4`, saturating).
    pub dof: usize,
    pub iterations: usize,
    pub evaluations: usize,
    pub termination: Termination,
}

/// Output of one calibration run.
///
/// Standard errors are derived from `covariance` on demand and never stored
/// separately.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitResult {
    pub parameters: ParameterSet,
    #[serde(deserialize_with = "nullable::matrix")]
    pub covariance: [[f64; N_PARAMS]; N_PARAMS],
    pub quality: FitQuality,
}

impl FitResult {
    /// `sqrt(diag(covariance))`; `NaN` for negative or non-finite variances.
    pub fn standard_errors(&self) -> [f64; N_PARAMS] {
        crate::fit::standard_errors(&self.covariance)
    }

    /// True when the covariance carries non-finite entries or any standard
    /// error is undefined.
    pub fn is_degenerate(&self) -> bool {
        self.covariance.iter().flatten().any(|v| !v.is_finite())
            || self.standard_errors().iter().any(|v| !v.is_finite())
    }
}

/// A per-observation fitted value (used for tables, plots and exports).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointResidual {
    /// Index of the experiment within the fitted set.
    pub experiment: usize,
    pub temperature: f64,
    pub time: f64,
    pub c_a_obs: f64,
    pub c_a_fit: f64,
    pub residual: f64,
}

/// Range of starting values for one parameter in the multi-start grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridAxis {
    pub min: f64,
    pub max: f64,
    pub steps: usize,
}

/// Parse `min,max,steps`.
impl FromStr for GridAxis {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let values = parse_f64_list(s)?;
        if values.len() != 3 {
            return Err(format!("expected min,max,steps, got {} values", values.len()));
        }
        let steps = values[2];
        if !(steps.is_finite() && steps >= 1.0 && steps.fract() == 0.0) {
            return Err(format!("steps must be a positive integer, got {steps}"));
        }
        Ok(Self {
            min: values[0],
            max: values[1],
            steps: steps as usize,
        })
    }
}

/// A full run's configuration as understood by the pipeline.
///
/// This is derived from CLI flags (plus defaults).
#[derive(Debug, Clone)]
pub struct FitConfig {
    /// Experiment JSON file; `None` means the bundled reference experiments.
    pub data_path: Option<PathBuf>,
    /// Indices of experiments to fit (empty = all).
    pub experiments: Vec<usize>,
    pub initial_guess: ParameterSet,
    /// Ground truth for the discrepancy report.
    pub truth: Option<ParameterSet>,

    pub max_iterations: usize,

    pub multistart: bool,
    pub grid_ea: GridAxis,
    pub grid_dh: GridAxis,

    pub show_residuals: bool,

    pub plot: bool,
    pub plot_width: usize,
    pub plot_height: usize,

    pub export_fit: Option<PathBuf>,
    pub export_residuals: Option<PathBuf>,
}

/// Experiment file (JSON).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentFile {
    pub experiments: Vec<ExperimentData>,
}

/// Fitted trajectory sampled on a regular time grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurveGrid {
    pub label: String,
    pub temperature: f64,
    pub time: Vec<f64>,
    pub c_a: Vec<f64>,
}

/// A saved fit (JSON).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitFile {
    pub tool: String,
    pub generated_at: DateTime<Utc>,
    pub initial_guess: ParameterSet,
    pub fit: FitResult,
    #[serde(deserialize_with = "nullable::vector")]
    pub standard_errors: [f64; N_PARAMS],
    pub experiments: Vec<ExperimentData>,
    pub grids: Vec<CurveGrid>,
}

/// serde_json writes non-finite floats as `null`; read them back as `NaN`.
mod nullable {
    use serde::{Deserialize, Deserializer};

    use super::N_PARAMS;

    pub fn vector<'de, D: Deserializer<'de>>(d: D) -> Result<[f64; N_PARAMS], D::Error> {
        let raw = <[Option<f64>; N_PARAMS]>::deserialize(d)?;
        Ok(raw.map(|v| v.unwrap_or(f64::NAN)))
    }

    pub fn matrix<'de, D: Deserializer<'de>>(
        d: D,
    ) -> Result<[[f64; N_PARAMS]; N_PARAMS], D::Error> {
        let raw = <[[Option<f64>; N_PARAMS]; N_PARAMS]>::deserialize(d)?;
        Ok(raw.map(|row| row.map(|v| v.unwrap_or(f64::NAN))))
    }
}
