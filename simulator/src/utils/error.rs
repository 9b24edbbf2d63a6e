use isf_common::{CommonError, ConfigurationError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error(
        "wavefunction norm fell below {epsilon:e} at voxel ({x}, {y}, {z}) during step {step}"
    )]
    NumericalDegeneracy {
        step: u64,
        x: usize,
        y: usize,
        z: usize,
        epsilon: f64,
    },

    #[error("fourier round trip deviated by {deviation:e} on a {n}^3 grid (tolerance {tolerance:e})")]
    TransformContractViolation {
        n: usize,
        deviation: f64,
        tolerance: f64,
    },

    #[error("wavefunction fixture {path} holds {got} voxels, expected {expected}")]
    FixtureResolutionMismatch {
        path: String,
        got: usize,
        expected: usize,
    },

    #[error("Failed to read or write field data: {0}")]
    Io(#[from] std::io::Error),

    #[error("Error in common: {err}")]
    CommonError {
        #[from]
        err: CommonError,
    },

    #[error("Invalid configuration: {err}")]
    ConfigurationError {
        #[from]
        err: ConfigurationError,
    },
}
