use thiserror::Error;

/// Errors raised by the calibration core.
///
/// Numeric overflow inside the kinetics model is *not* an error; it surfaces as
/// `inf`/`NaN` values and is handled by the solver's step rejection.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CalibrationError {
    #[error("No observations to fit.")]
    EmptyData,
    #[error("Shape mismatch: expected {expected} values, found {found}.")]
    ShapeMismatch { expected: usize, found: usize },
    #[error("Sample times must be finite, > 0 and strictly increasing.")]
    InvalidTimes,
    #[error("Invalid experiment: {0}")]
    InvalidConditions(String),
    #[error("Objective is not finite at the starting guess.")]
    NonFiniteStart,
    #[error("Solver did not converge within {iterations} iterations.")]
    NotConverged { iterations: usize },
    #[error("No starting guess produced a converged fit.")]
    NoCandidates,
    #[error("Invalid start grid: {0}")]
    InvalidGrid(String),
}

impl CalibrationError {
    /// Process exit code used by the binary for this failure class.
    pub fn exit_code(&self) -> u8 {
        match self {
            CalibrationError::EmptyData => 3,
            CalibrationError::ShapeMismatch { .. }
            | CalibrationError::InvalidTimes
            | CalibrationError::InvalidConditions(_)
            | CalibrationError::InvalidGrid(_) => 2,
            CalibrationError::NonFiniteStart
            | CalibrationError::NotConverged { .. }
            | CalibrationError::NoCandidates => 4,
        }
    }
}

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl From<CalibrationError> for AppError {
    fn from(err: CalibrationError) -> Self {
        AppError::new(err.exit_code(), err.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn calibration_errors_map_to_exit_codes() {
        let err: AppError = CalibrationError::NotConverged { iterations: 12 }.into();
        assert_eq!(err.exit_code(), 4);
        assert_eq!(err.to_string(), "Solver did not converge within 12 iterations.");

        let err: AppError = CalibrationError::ShapeMismatch { expected: 3, found: 2 }.into();
        assert_eq!(err.exit_code(), 2);

        let err: AppError = CalibrationError::InvalidConditions("T=0".to_string()).into();
        assert_eq!(err.exit_code(), 2);

        let err: AppError = CalibrationError::EmptyData.into();
        assert_eq!(err.exit_code(), 3);
    }
}
