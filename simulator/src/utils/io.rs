use anyhow::Result;
use ndarray::{Array1, Array3};
use ndarray_npy::write_npy;
use num::Complex;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::sync::Arc;
use std::thread::{spawn, JoinHandle};

use isf_common::{ConfigurationError, TomlParameters};

use super::error::RuntimeError;
use crate::simulation_object::SimulationParameters;

/// This function converts raw toml parameters into validated runtime
/// simulation parameters.
pub fn parameters_from_toml(
    toml: &TomlParameters,
) -> Result<SimulationParameters, ConfigurationError> {
    SimulationParameters::new(
        toml.size,
        toml.axis_length,
        toml.hbar,
        toml.dt,
        toml.final_sim_time,
        toml.num_data_dumps,
        toml.sim_name.clone(),
    )
}

/// This function writes a complex field to disk as a pair of .npy files,
/// one per component, each on its own thread.
pub fn complex_array_to_disk(
    path: String,
    field: &Array3<Complex<f64>>,
) -> Result<Vec<JoinHandle<()>>> {
    let shape = field.dim();

    // Host a flat copy shared by both writer threads
    let real_host: Arc<Vec<Complex<f64>>> = Arc::new(field.iter().copied().collect());
    let imag_host = real_host.clone();

    // Construct paths
    let real_path = format!("{path}_real.npy");
    let imag_path = format!("{path}_imag.npy");

    // Spawn a thread for each of the i/o operations
    let real_handle = spawn(move || {
        let real: Vec<f64> = real_host.iter().map(|x| x.re).collect();
        let real = Array1::from_vec(real)
            .into_shape(shape)
            .expect("host buffer length matches the field shape");
        write_npy(real_path, &real).expect("write to disk in parallel failed");
    });
    let imag_handle = spawn(move || {
        let imag: Vec<f64> = imag_host.iter().map(|x| x.im).collect();
        let imag = Array1::from_vec(imag)
            .into_shape(shape)
            .expect("host buffer length matches the field shape");
        write_npy(imag_path, &imag).expect("write to disk in parallel failed");
    });

    Ok(vec![real_handle, imag_handle])
}

/// Loads a complex field fixture: a flat row-major json array of [re, im]
/// pairs, checked against the expected resolution.
pub fn load_complex_field(path: &str, n: usize) -> Result<Array3<Complex<f64>>, RuntimeError> {
    let file = File::open(path)?;
    let pairs: Vec<[f64; 2]> =
        serde_json::from_reader(BufReader::new(file)).map_err(std::io::Error::from)?;

    if pairs.len() != n * n * n {
        return Err(RuntimeError::FixtureResolutionMismatch {
            path: path.to_string(),
            got: pairs.len(),
            expected: n * n * n,
        });
    }

    let values: Vec<Complex<f64>> = pairs.iter().map(|&[re, im]| Complex::new(re, im)).collect();
    let field = Array3::from_shape_vec((n, n, n), values)
        .expect("fixture length checked against the grid resolution");
    Ok(field)
}

/// Exports a field snapshot to the same flat [re, im] representation.
pub fn export_complex_field(path: &str, field: &Array3<Complex<f64>>) -> Result<(), RuntimeError> {
    let pairs: Vec<[f64; 2]> = field.iter().map(|v| [v.re, v.im]).collect();

    let file = File::create(path)?;
    serde_json::to_writer(BufWriter::new(file), &pairs).map_err(std::io::Error::from)?;
    Ok(())
}

#[test]
fn test_json_field_roundtrip() {
    let n = 8;
    let field = Array3::from_shape_fn((n, n, n), |(i, j, k)| {
        Complex::new(i as f64 - j as f64, k as f64 * 0.5)
    });

    let path = std::env::temp_dir().join("isf_io_roundtrip.json");
    let path = path.to_str().unwrap();

    export_complex_field(path, &field).unwrap();
    let loaded = load_complex_field(path, n).unwrap();
    assert_eq!(loaded, field);
}

#[test]
fn test_json_field_resolution_mismatch() {
    let n = 8;
    let field = Array3::from_elem((n, n, n), Complex::new(1.0, 0.0));

    let path = std::env::temp_dir().join("isf_io_mismatch.json");
    let path = path.to_str().unwrap();

    export_complex_field(path, &field).unwrap();
    assert!(matches!(
        load_complex_field(path, 16),
        Err(RuntimeError::FixtureResolutionMismatch { .. })
    ));
}
