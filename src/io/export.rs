//! Export per-point residuals to CSV.
//!
//! The export is meant to be easy to consume in spreadsheets or downstream scripts.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::domain::PointResidual;
use crate::error::AppError;

pub const RESIDUAL_CSV_HEADER: &str = "experiment,temperature,time,c_a_obs,c_a_fit,residual";

/// Write per-point residuals to a CSV file.
pub fn write_residuals_csv(path: &Path, residuals: &[PointResidual]) -> Result<(), AppError> {
    let mut file = File::create(path).map_err(|e| {
        AppError::new(2, format!("Failed to create residual CSV '{}': {e}", path.display()))
    })?;

    writeln!(file, "{RESIDUAL_CSV_HEADER}")
        .map_err(|e| AppError::new(2, format!("Failed to write residual CSV header: {e}")))?;

    for r in residuals {
        writeln!(
            file,
            "{},{:.2},{:.6},{:.6},{:.6},{:.6}",
            r.experiment, r.temperature, r.time, r.c_a_obs, r.c_a_fit, r.residual,
        )
        .map_err(|e| AppError::new(2, format!("Failed to write residual CSV row: {e}")))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn residual_csv_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("residuals.csv");
        let rows = vec![PointResidual {
            experiment: 1,
            temperature: 308.15,
            time: 3.0,
            c_a_obs: 8.9723,
            c_a_fit: 8.95,
            residual: 0.0223,
        }];

        write_residuals_csv(&path, &rows).unwrap();
        let txt = fs::read_to_string(&path).unwrap();
        assert_eq!(
            txt,
            "experiment,temperature,time,c_a_obs,c_a_fit,residual\n\
             1,308.15,3.000000,8.972300,8.950000,0.022300\n"
        );
    }
}
