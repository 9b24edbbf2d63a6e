use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "type")]
pub enum InitialConditions {
    /// Loads a user specified wavefunction pair from json fixtures
    UserSpecified { psi1: String, psi2: String },

    /// A uniform plane wave in psi1 with integer mode numbers along each axis,
    /// plus a small structured perturbation of the given amplitude in psi2
    PlaneWave { modes: [i64; 3], perturbation: f64 },
}
