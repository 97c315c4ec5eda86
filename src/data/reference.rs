//! Bundled reference experiments.
//!
//! Three batch runs of the same reaction at 298.15 K, 308.15 K and 323.15 K,
//! each starting from pure A at 10 mol/L. The concentrations were generated
//! from `REFERENCE_TRUTH` with Gaussian measurement noise (σ = 0.05 mol/L)
//! and rounded to four decimals.

use crate::domain::{ExperimentData, ParameterSet, ReactionConditions};

/// Parameters the reference data was generated from (dH in J/mol).
pub const REFERENCE_TRUTH: ParameterSet = ParameterSet::new(6.9, 49.0, -13000.0, -42.0);

/// Starting guess used for the reference fits.
pub const REFERENCE_GUESS: ParameterSet = ParameterSet::new(6.0, 45.0, -10000.0, -50.0);

const RUN_298_TIMES: [f64; 10] = [5.0, 10.0, 15.0, 20.0, 30.0, 40.0, 50.0, 60.0, 80.0, 100.0];
const RUN_298_CA: [f64; 10] = [
    9.0638, 8.3675, 7.7459, 7.2763, 6.5809, 6.1959, 5.9957, 5.7926, 5.6488, 5.5395,
];

const RUN_308_TIMES: [f64; 10] = [3.0, 6.0, 9.0, 12.0, 18.0, 24.0, 30.0, 40.0, 50.0, 60.0];
const RUN_308_CA: [f64; 10] = [
    8.9723, 8.1363, 7.3931, 7.0064, 6.2664, 5.8171, 5.4288, 5.1758, 5.1053, 5.0752,
];

const RUN_323_TIMES: [f64; 10] = [1.0, 2.0, 3.0, 5.0, 7.0, 10.0, 14.0, 18.0, 24.0, 30.0];
const RUN_323_CA: [f64; 10] = [
    9.1396, 8.385, 7.793, 6.7732, 6.1396, 5.4758, 4.9315, 4.8038, 4.5856, 4.5607,
];

/// The three reference runs, ordered by temperature.
pub fn reference_experiments() -> Vec<ExperimentData> {
    let runs: [(f64, &[f64], &[f64]); 3] = [
        (298.15, &RUN_298_TIMES, &RUN_298_CA),
        (308.15, &RUN_308_TIMES, &RUN_308_CA),
        (323.15, &RUN_323_TIMES, &RUN_323_CA),
    ];

    runs.iter()
        .map(|&(temperature, times, c_a)| ExperimentData {
            label: Some(format!("{temperature:.2} K")),
            temperature,
            c_a0: ReactionConditions::DEFAULT_C_A0,
            c_b0: ReactionConditions::DEFAULT_C_B0,
            times: times.to_vec(),
            c_a: c_a.to_vec(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_runs_are_valid() {
        let exps = reference_experiments();
        assert_eq!(exps.len(), 3);
        for exp in &exps {
            exp.validate().unwrap();
            assert_eq!(exp.len(), 10);
            assert!(exp.c_a.iter().all(|&c| c > 0.0 && c < exp.c_a0));
        }
        assert_eq!(exps[0].temperature, 298.15);
        assert_eq!(exps[2].label.as_deref(), Some("323.15 K"));
    }
}
