//! Read/write experiment JSON files.
//!
//! Schema (`domain::ExperimentFile`):
//!
//! ```text
//! { "experiments": [ { "label"?, "temperature", "c_a0", "c_b0"?, "times": [...], "c_a": [...] } ] }
//! ```

use std::fs::File;
use std::path::Path;

use log::debug;

use crate::domain::{ExperimentData, ExperimentFile};
use crate::error::AppError;

/// Read and validate an experiment JSON file.
pub fn read_experiments_json(path: &Path) -> Result<Vec<ExperimentData>, AppError> {
    let file = File::open(path).map_err(|e| {
        AppError::new(2, format!("Failed to open experiment JSON '{}': {e}", path.display()))
    })?;
    let parsed: ExperimentFile = serde_json::from_reader(file)
        .map_err(|e| AppError::new(2, format!("Invalid experiment JSON: {e}")))?;

    if parsed.experiments.is_empty() {
        return Err(AppError::new(
            3,
            format!("No experiments in '{}'.", path.display()),
        ));
    }
    for (idx, exp) in parsed.experiments.iter().enumerate() {
        exp.validate()
            .map_err(|e| AppError::new(e.exit_code(), format!("Experiment #{idx}: {e}")))?;
    }

    debug!(
        "read {} experiments from {}",
        parsed.experiments.len(),
        path.display()
    );
    Ok(parsed.experiments)
}

/// Write experiments as pretty JSON.
pub fn write_experiments_json(path: &Path, experiments: &[ExperimentData]) -> Result<(), AppError> {
    let file = File::create(path).map_err(|e| {
        AppError::new(2, format!("Failed to create experiment JSON '{}': {e}", path.display()))
    })?;
    let payload = ExperimentFile {
        experiments: experiments.to_vec(),
    };
    serde_json::to_writer_pretty(file, &payload)
        .map_err(|e| AppError::new(2, format!("Failed to write experiment JSON: {e}")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::data::reference_experiments;

    #[test]
    fn experiments_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("exps.json");
        let exps = reference_experiments();

        write_experiments_json(&path, &exps).unwrap();
        let back = read_experiments_json(&path).unwrap();
        assert_eq!(back, exps);
    }

    #[test]
    fn invalid_files_map_to_exit_codes() {
        let dir = tempfile::tempdir().unwrap();

        let empty = dir.path().join("empty.json");
        fs::write(&empty, r#"{"experiments": []}"#).unwrap();
        assert_eq!(read_experiments_json(&empty).unwrap_err().exit_code(), 3);

        let ragged = dir.path().join("ragged.json");
        fs::write(
            &ragged,
            r#"{"experiments": [{"temperature": 300.0, "c_a0": 10.0, "times": [1.0, 2.0], "c_a": [9.0]}]}"#,
        )
        .unwrap();
        let err = read_experiments_json(&ragged).unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(err.to_string().contains("Experiment #0"));

        let frozen = dir.path().join("frozen.json");
        fs::write(
            &frozen,
            r#"{"experiments": [{"temperature": 0.0, "c_a0": 10.0, "times": [1.0], "c_a": [9.0]}]}"#,
        )
        .unwrap();
        let err = read_experiments_json(&frozen).unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(err.to_string().contains("temperature"));

        let garbage = dir.path().join("garbage.json");
        fs::write(&garbage, "not json").unwrap();
        assert_eq!(read_experiments_json(&garbage).unwrap_err().exit_code(), 2);

        let missing = dir.path().join("missing.json");
        assert_eq!(read_experiments_json(&missing).unwrap_err().exit_code(), 2);
    }
}
