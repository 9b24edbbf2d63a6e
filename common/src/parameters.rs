use serde::{Deserialize, Serialize};

use crate::{error::CommonError, ics::InitialConditions};

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct TomlParameters {
    /// Number of grid cells per axis
    pub size: usize,
    /// Physical length of each axis of the box
    pub axis_length: [f64; 3],
    /// Reduced Planck constant analogue
    pub hbar: f64,
    /// Timestep
    pub dt: f64,
    /// End time of simulation
    pub final_sim_time: f64,
    /// Number of data dumps
    pub num_data_dumps: u32,
    /// Name of simulation (used for directories)
    pub sim_name: String,
    /// Initial Conditions
    pub ics: InitialConditions,
}

/// This function reads toml files
pub fn read_toml(path: &str) -> Result<TomlParameters, CommonError> {
    // Read toml config file
    let toml_contents: &str =
        &std::fs::read_to_string(path).map_err(|_| CommonError::TomlReadError {
            path: path.to_string(),
        })?;

    // Return parsed toml from str
    toml::from_str(toml_contents).map_err(|e| CommonError::TomlParseError {
        msg: format!("{e:?}"),
    })
}

#[test]
fn test_parse_plane_wave_toml() {
    let sample = r#"
        size = 16
        axis_length = [2.0, 2.0, 2.0]
        hbar = 0.1
        dt = 0.03333333333333333
        final_sim_time = 1.0
        num_data_dumps = 10
        sim_name = "jet"

        [ics]
        type = "PlaneWave"
        modes = [1, 0, 0]
        perturbation = 0.01
    "#;

    let toml: TomlParameters = toml::from_str(sample).unwrap();
    assert_eq!(toml.size, 16);
    assert_eq!(toml.axis_length, [2.0; 3]);
    assert_eq!(
        toml.ics,
        InitialConditions::PlaneWave {
            modes: [1, 0, 0],
            perturbation: 0.01,
        }
    );
}

#[test]
fn test_parse_user_specified_toml() {
    let sample = r#"
        size = 8
        axis_length = [1.0, 1.0, 1.0]
        hbar = 0.05
        dt = 0.01
        final_sim_time = 0.1
        num_data_dumps = 1
        sim_name = "fixture"

        [ics]
        type = "UserSpecified"
        psi1 = "fixtures/psi1.json"
        psi2 = "fixtures/psi2.json"
    "#;

    let toml: TomlParameters = toml::from_str(sample).unwrap();
    assert_eq!(
        toml.ics,
        InitialConditions::UserSpecified {
            psi1: "fixtures/psi1.json".to_string(),
            psi2: "fixtures/psi2.json".to_string(),
        }
    );
}
