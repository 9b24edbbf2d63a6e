use std::f64::consts::PI;
use std::fmt::Display;

use ndarray::{Array3, Array4};
use num::Complex;

use isf_common::constants::{DISPATCH_TILE, NORM_EPSILON};
use isf_common::error::ConfigurationError;

use crate::kernels::{self, SpectralMultipliers};
use crate::utils::error::RuntimeError;
use crate::utils::fft::SpectralTransform;
use crate::utils::grid::check_norm;
use crate::utils::io;

/// This struct holds the wavefunction pair which represents the fluid state
pub struct SimulationGrid {
    /// First component of the wavefunction pair
    pub ψ1: Array3<Complex<f64>>,

    /// Second component of the wavefunction pair
    pub ψ2: Array3<Complex<f64>>,
}

impl SimulationGrid {
    pub fn new(ψ1: Array3<Complex<f64>>, ψ2: Array3<Complex<f64>>) -> Self {
        debug_assert_eq!(ψ1.dim(), ψ2.dim());
        SimulationGrid { ψ1, ψ2 }
    }
}

/// This `SimulationParameters` struct stores simulation parameters
pub struct SimulationParameters {
    // Grid Parameters
    /// Number of pixels per axis
    pub n_grid: usize,
    /// Physical length of each axis
    pub axis_length: [f64; 3],
    /// Spatial cell size per axis
    pub dx: [f64; 3],
    /// k-space cell size per axis
    pub dk: [f64; 3],

    // Temporal Parameters
    /// Current simulation time
    pub time: f64,
    /// Total simulation time
    pub final_sim_time: f64,
    /// Timestep
    pub dt: f64,
    /// Number of data dumps
    pub num_data_dumps: u32,

    // Physical Parameters
    /// Reduced Planck constant analogue
    pub hbar: f64,

    // Metadata
    /// Simulation name
    pub sim_name: String,
}

impl SimulationParameters {
    pub fn new(
        n_grid: usize,
        axis_length: [f64; 3],
        hbar: f64,
        dt: f64,
        final_sim_time: f64,
        num_data_dumps: u32,
        sim_name: String,
    ) -> Result<Self, ConfigurationError> {
        // The per-voxel kernels are dispatched in cubic tiles; a resolution
        // that does not divide into tiles would silently truncate the domain.
        if n_grid == 0 || n_grid % DISPATCH_TILE != 0 {
            return Err(ConfigurationError::ResolutionNotTileAligned {
                n: n_grid,
                tile: DISPATCH_TILE,
            });
        }
        for (name, value) in [
            ("hbar", hbar),
            ("dt", dt),
            ("final_sim_time", final_sim_time),
        ] {
            if value <= 0.0 {
                return Err(ConfigurationError::NonPositiveParameter { name, value });
            }
        }
        for &length in &axis_length {
            if length <= 0.0 {
                return Err(ConfigurationError::NonPositiveParameter {
                    name: "axis_length",
                    value: length,
                });
            }
        }

        // Overconstrained parameters
        let dx = axis_length.map(|length| length / n_grid as f64);
        let dk = axis_length.map(|length| 2.0 * PI / length);

        Ok(SimulationParameters {
            n_grid,
            axis_length,
            dx,
            dk,
            time: 0.0,
            final_sim_time,
            dt,
            num_data_dumps,
            hbar,
            sim_name,
        })
    }
}

impl Display for SimulationParameters {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}\n", "-".repeat(40))?;
        write!(f, "n_grid         = {}\n", self.n_grid)?;
        write!(f, "axis_length    = {:?}\n", self.axis_length)?;
        write!(f, "dx             = {:?}\n", self.dx)?;
        write!(f, "dk             = {:?}\n", self.dk)?;
        write!(f, "hbar           = {}\n", self.hbar)?;
        write!(f, "dt             = {}\n", self.dt)?;
        write!(f, "current_time   = {}\n", self.time)?;
        write!(f, "final_sim_time = {}\n", self.final_sim_time)?;
        write!(f, "num_data_dumps = {}\n", self.num_data_dumps)?;
        write!(f, "sim_name       = {}\n", self.sim_name)?;
        write!(f, "{}\n", "-".repeat(40))?;
        Ok(())
    }
}

/// The fixed enumeration of pipeline sub-stages; one simulation step runs
/// them in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Integrate,
    Normalize,
    VelocityOneForm,
    Divergence,
    PoissonSolve,
    GaugeTransform,
}

/// This stores the wavefunction pair along with everything the per-step
/// pipeline needs: the parameters, the precomputed spectral multipliers,
/// the transform engine, and the velocity/divergence buffers. All grid-sized
/// resources live here and are allocated exactly once.
pub struct SimulationObject {
    /// This has the wavefunction pair
    pub grid: SimulationGrid,

    /// This has the simulation parameters
    pub parameters: SimulationParameters,

    /// Precomputed per-frequency multipliers
    multipliers: SpectralMultipliers,

    /// Fourier transform engine
    transform: SpectralTransform,

    /// Velocity one-form buffer, three edge values per voxel. Kept disjoint
    /// from the wavefunction so the neighbor-reading kernels never alias
    /// their input.
    velocity: Array4<f64>,

    /// Divergence / pressure-potential buffer
    divergence: Array3<Complex<f64>>,

    /// Steps taken so far
    step: u64,
}

impl SimulationObject {
    pub fn new(
        grid: SimulationGrid,
        parameters: SimulationParameters,
    ) -> Result<Self, RuntimeError> {
        let n = parameters.n_grid;
        debug_assert_eq!(grid.ψ1.dim(), (n, n, n));

        // Surface a transform engine defect before the first step
        let transform = SpectralTransform::new(n);
        transform.check_roundtrip()?;

        let multipliers = kernels::init_multipliers(&parameters);

        Ok(SimulationObject {
            grid,
            parameters,
            multipliers,
            transform,
            velocity: Array4::zeros((n, n, n, 3)),
            divergence: Array3::zeros((n, n, n)),
            step: 0,
        })
    }

    pub fn new_from_toml(path: &str) -> Result<Self, RuntimeError> {
        let toml = isf_common::read_toml(path)?;
        let parameters = io::parameters_from_toml(&toml)?;
        let grid = crate::ics::from_toml(&toml.ics, &parameters)?;
        Self::new(grid, parameters)
    }

    /// This function advances the wavefunction pair by one timestep:
    /// Integrate → Normalize → Project, strictly in that order.
    pub fn update(&mut self, verbose: bool) -> Result<(), RuntimeError> {
        self.schroedinger_integration();
        self.normalize()?;
        self.pressure_project();

        self.parameters.time += self.parameters.dt;
        self.step += 1;

        debug_assert!(check_norm(&self.grid.ψ1, &self.grid.ψ2, 1e-5));

        if verbose {
            log::debug!("step {} done, t = {:.5}", self.step, self.parameters.time);
        }
        Ok(())
    }

    /// Stage 1: exact integration of the kinetic term in frequency space.
    pub fn schroedinger_integration(&mut self) {
        log::trace!("entering {:?}", Stage::Integrate);
        self.transform.forward_inplace(&mut self.grid.ψ1);
        self.transform.forward_inplace(&mut self.grid.ψ2);

        kernels::schroedinger_evolve(&mut self.grid.ψ1, &self.multipliers);
        kernels::schroedinger_evolve(&mut self.grid.ψ2, &self.multipliers);

        self.transform.inverse_inplace(&mut self.grid.ψ1);
        self.transform.inverse_inplace(&mut self.grid.ψ2);
    }

    /// Stage 2: restore the pointwise unit norm.
    pub fn normalize(&mut self) -> Result<(), RuntimeError> {
        log::trace!("entering {:?}", Stage::Normalize);
        kernels::normalize(&mut self.grid.ψ1, &mut self.grid.ψ2).map_err(|(x, y, z)| {
            RuntimeError::NumericalDegeneracy {
                step: self.step,
                x,
                y,
                z,
                epsilon: NORM_EPSILON,
            }
        })
    }

    /// Stage 3: project the implied velocity onto its divergence-free part.
    /// The one-form is taken in units where ħ = 1 so the gauge phase cancels
    /// the compressible component exactly.
    pub fn pressure_project(&mut self) {
        log::trace!("entering {:?}", Stage::VelocityOneForm);
        kernels::velocity_one_form(&self.grid.ψ1, &self.grid.ψ2, 1.0, &mut self.velocity);

        log::trace!("entering {:?}", Stage::Divergence);
        kernels::divergence(&self.velocity, self.parameters.dx, &mut self.divergence);

        log::trace!("entering {:?}", Stage::PoissonSolve);
        self.transform.forward_inplace(&mut self.divergence);
        kernels::poisson_multiply(&mut self.divergence, &self.multipliers);
        self.transform.inverse_inplace(&mut self.divergence);

        log::trace!("entering {:?}", Stage::GaugeTransform);
        kernels::gauge_transform(&mut self.grid.ψ1, &mut self.grid.ψ2, &self.divergence);
    }

    /// Physical velocity one-form implied by the current wavefunction pair.
    pub fn velocity_field(&mut self) -> &Array4<f64> {
        kernels::velocity_one_form(
            &self.grid.ψ1,
            &self.grid.ψ2,
            self.parameters.hbar,
            &mut self.velocity,
        );
        &self.velocity
    }

    /// Largest |divergence| of the current one-form, in the ħ = 1 units the
    /// projection operates in.
    pub fn max_divergence(&mut self) -> f64 {
        kernels::velocity_one_form(&self.grid.ψ1, &self.grid.ψ2, 1.0, &mut self.velocity);
        kernels::divergence(&self.velocity, self.parameters.dx, &mut self.divergence);
        self.divergence
            .iter()
            .map(|v| v.re.abs())
            .fold(0.0, f64::max)
    }

    /// Total probability Σ (|ψ1|² + |ψ2|²) over the grid.
    pub fn total_probability(&self) -> f64 {
        crate::utils::grid::total_probability(&self.grid.ψ1, &self.grid.ψ2)
    }

    pub fn not_finished(&self) -> bool {
        self.parameters.time < self.parameters.final_sim_time
    }

    pub fn current_step(&self) -> u64 {
        self.step
    }

    /// This function writes both wavefunction components to disk.
    pub fn dump(&self) -> anyhow::Result<()> {
        std::fs::create_dir_all(&self.parameters.sim_name)?;

        let mut handles = Vec::new();
        handles.extend(io::complex_array_to_disk(
            format!("{}/psi1_{:05}", self.parameters.sim_name, self.step),
            &self.grid.ψ1,
        )?);
        handles.extend(io::complex_array_to_disk(
            format!("{}/psi2_{:05}", self.parameters.sim_name, self.step),
            &self.grid.ψ2,
        )?);
        for handle in handles {
            handle
                .join()
                .map_err(|_| anyhow::anyhow!("i/o writer thread panicked"))?;
        }
        Ok(())
    }
}

#[test]
fn test_new_sim_parameters() {
    use approx::assert_abs_diff_eq;

    let params = SimulationParameters::new(
        16,
        [2.0, 2.0, 2.0],
        0.1,
        1.0 / 30.0,
        1.0,
        10,
        "my-sim".to_string(),
    )
    .unwrap();

    assert_abs_diff_eq!(params.dx[0], 0.125, epsilon = 1e-15);
    assert_abs_diff_eq!(params.dk[0], PI, epsilon = 1e-15);
    println!("{}", params);
}

#[test]
fn test_rejects_tile_misaligned_resolution() {
    let result = SimulationParameters::new(
        12,
        [2.0, 2.0, 2.0],
        0.1,
        1.0 / 30.0,
        1.0,
        10,
        "bad-res".to_string(),
    );
    assert_eq!(
        result.err(),
        Some(ConfigurationError::ResolutionNotTileAligned { n: 12, tile: 8 })
    );
}

#[test]
fn test_rejects_non_positive_parameters() {
    let result = SimulationParameters::new(
        16,
        [2.0, 2.0, 2.0],
        0.1,
        0.0,
        1.0,
        10,
        "bad-dt".to_string(),
    );
    assert_eq!(
        result.err(),
        Some(ConfigurationError::NonPositiveParameter {
            name: "dt",
            value: 0.0
        })
    );

    let result = SimulationParameters::new(
        16,
        [2.0, -2.0, 2.0],
        0.1,
        1.0 / 30.0,
        1.0,
        10,
        "bad-box".to_string(),
    );
    assert!(matches!(
        result,
        Err(ConfigurationError::NonPositiveParameter {
            name: "axis_length",
            ..
        })
    ));
}
