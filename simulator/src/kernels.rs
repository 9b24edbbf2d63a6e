//! The data-parallel per-voxel operators of the ISF pipeline. Each kernel
//! reads only completed fields from the previous stage (plus the read-only
//! multiplier cache) and writes disjoint output locations, so every launch is
//! free of intra-kernel races; sequencing between launches is provided by the
//! orchestrator's exclusive borrows.

use ndarray::parallel::prelude::*;
use ndarray::{Array3, Array4, Axis, FoldWhile, Zip};
use num::Complex;
use std::f64::consts::PI;

use isf_common::constants::NORM_EPSILON;

use crate::simulation_object::SimulationParameters;
use crate::utils::complex::unit_phase;
use crate::utils::fft::fftshift;

/// This struct holds the two precomputed per-frequency fields that turn the
/// kinetic evolution and the pressure Poisson solve into pointwise
/// multiplications. Derived once from the grid parameters, read-only after.
pub struct SpectralMultipliers {
    /// Unit-modulus phase factor exp(-i dt ħ |k|²/2) per frequency
    pub schroedinger_mul: Array3<Complex<f64>>,
    /// -1/|k|² per frequency, zero at the zero mode
    pub poisson_mul: Array3<f64>,
}

/// This function derives both spectral multipliers from the grid parameters.
/// The fields are built with mode numbers centered about zero and shifted
/// once so the zero-frequency entry lands at index (0, 0, 0), matching the
/// layout of the transform output they multiply.
pub fn init_multipliers(parameters: &SimulationParameters) -> SpectralMultipliers {
    let n = parameters.n_grid;
    let half = (n / 2) as i64;

    let schroedinger_mul = Array3::from_shape_fn((n, n, n), |index| {
        let k2 = wavenumber_squared(parameters, index, half);
        unit_phase(-0.5 * parameters.dt * parameters.hbar * k2)
    });
    let poisson_mul = Array3::from_shape_fn((n, n, n), |index| {
        let k2 = wavenumber_squared(parameters, index, half);
        if k2 == 0.0 {
            // The Poisson equation fixes the potential only up to a constant;
            // pinning the mean component keeps the solve finite.
            0.0
        } else {
            -1.0 / k2
        }
    });

    debug_assert!(schroedinger_mul
        .iter()
        .all(|m| (m.norm() - 1.0).abs() < 1e-12));

    SpectralMultipliers {
        schroedinger_mul: fftshift(&schroedinger_mul),
        poisson_mul: fftshift(&poisson_mul),
    }
}

/// Squared physical wavenumber at a grid index, with mode numbers running
/// symmetrically about zero.
fn wavenumber_squared(
    parameters: &SimulationParameters,
    index: (usize, usize, usize),
    half: i64,
) -> f64 {
    [index.0, index.1, index.2]
        .iter()
        .zip(parameters.axis_length.iter())
        .map(|(&i, &length)| {
            let mode = i as i64 - half;
            let k = 2.0 * PI * mode as f64 / length;
            k * k
        })
        .sum()
}

/// Pointwise multiplication of a frequency-space wavefunction component by
/// the evolution phase. Exactly integrates the kinetic term over one
/// timestep; lossless in norm because the multiplier is pure phase.
pub fn schroedinger_evolve(ψk: &mut Array3<Complex<f64>>, multipliers: &SpectralMultipliers) {
    Zip::from(ψk)
        .and(&multipliers.schroedinger_mul)
        .par_for_each(|p, &mul| *p *= mul);
}

/// Rescales both components at every voxel so |ψ1|² + |ψ2|² = 1. A voxel
/// whose denominator would underflow is a fatal numerical degeneracy; its
/// coordinate is returned untouched instead of injecting NaN into the grid.
pub fn normalize(
    ψ1: &mut Array3<Complex<f64>>,
    ψ2: &mut Array3<Complex<f64>>,
) -> Result<(), (usize, usize, usize)> {
    // Locate any degenerate voxel before touching the data
    let degenerate = Zip::indexed(&*ψ1)
        .and(&*ψ2)
        .fold_while(None, |found, index, p1, p2| {
            if p1.norm_sqr() + p2.norm_sqr() < NORM_EPSILON {
                FoldWhile::Done(Some(index))
            } else {
                FoldWhile::Continue(found)
            }
        })
        .into_inner();
    if let Some(position) = degenerate {
        return Err(position);
    }

    Zip::from(ψ1).and(ψ2).par_for_each(|p1, p2| {
        let r = (p1.norm_sqr() + p2.norm_sqr()).sqrt();
        *p1 /= r;
        *p2 /= r;
    });
    Ok(())
}

/// This kernel computes the discrete velocity one-form on the three forward
/// edges of every voxel: `hbar_eff` times the phase advance of the combined
/// wavefunction pair between a voxel and its periodic forward neighbor,
///
///   v_a(x) = hbar_eff · arg( conj(ψ1(x))·ψ1(x+e_a) + conj(ψ2(x))·ψ2(x+e_a) )
///
/// The projection path runs this in units where hbar_eff = 1 so the gauge
/// phase cancels the compressible component exactly; the physical velocity
/// uses the configured ħ.
pub fn velocity_one_form(
    ψ1: &Array3<Complex<f64>>,
    ψ2: &Array3<Complex<f64>>,
    hbar_eff: f64,
    velocity: &mut Array4<f64>,
) {
    let n = ψ1.dim().0;
    velocity
        .axis_iter_mut(Axis(0))
        .into_par_iter()
        .enumerate()
        .for_each(|(ix, mut slab)| {
            for iy in 0..n {
                for iz in 0..n {
                    let here = [ix, iy, iz];
                    let forward = [
                        [(ix + 1) % n, iy, iz],
                        [ix, (iy + 1) % n, iz],
                        [ix, iy, (iz + 1) % n],
                    ];
                    for (axis, there) in forward.into_iter().enumerate() {
                        let advance = (ψ1[here].conj() * ψ1[there]
                            + ψ2[here].conj() * ψ2[there])
                            .arg();
                        slab[[iy, iz, axis]] = hbar_eff * advance;
                    }
                }
            }
        });
}

/// Discrete divergence of the one-form: backward difference of every edge
/// component scaled by 1/dx², summed over the three axes, with periodic
/// wrapping. Written into a complex field (zero imaginary part) so the
/// result rides the same transform path as the wavefunction.
pub fn divergence(velocity: &Array4<f64>, dx: [f64; 3], div: &mut Array3<Complex<f64>>) {
    let n = velocity.dim().0;
    div.axis_iter_mut(Axis(0))
        .into_par_iter()
        .enumerate()
        .for_each(|(ix, mut slab)| {
            for iy in 0..n {
                for iz in 0..n {
                    let backward = [
                        [(ix + n - 1) % n, iy, iz],
                        [ix, (iy + n - 1) % n, iz],
                        [ix, iy, (iz + n - 1) % n],
                    ];
                    let mut sum = 0.0;
                    for (axis, from) in backward.into_iter().enumerate() {
                        sum += (velocity[[ix, iy, iz, axis]]
                            - velocity[[from[0], from[1], from[2], axis]])
                            / (dx[axis] * dx[axis]);
                    }
                    slab[[iy, iz]] = Complex::new(sum, 0.0);
                }
            }
        });
}

/// Pointwise multiplication of the frequency-space divergence by the Poisson
/// multiplier, yielding the pressure potential up to the (pinned) mean.
pub fn poisson_multiply(divk: &mut Array3<Complex<f64>>, multipliers: &SpectralMultipliers) {
    Zip::from(divk)
        .and(&multipliers.poisson_mul)
        .par_for_each(|d, &mul| *d *= mul);
}

/// Applies the compensating rotation exp(-i φ) to both components, removing
/// the compressible part of the implied velocity. Pure phase rotation, so
/// the pointwise norm is untouched.
pub fn gauge_transform(
    ψ1: &mut Array3<Complex<f64>>,
    ψ2: &mut Array3<Complex<f64>>,
    φ: &Array3<Complex<f64>>,
) {
    Zip::from(ψ1).and(ψ2).and(φ).par_for_each(|p1, p2, potential| {
        let rotation = unit_phase(-potential.re);
        *p1 *= rotation;
        *p2 *= rotation;
    });
}

#[test]
fn test_multipliers_unit_modulus_and_zero_mode() {
    for n in [8, 16, 32] {
        let parameters = SimulationParameters::new(
            n,
            [2.0, 2.0, 2.0],
            0.1,
            1.0 / 30.0,
            1.0,
            1,
            "multipliers".to_string(),
        )
        .unwrap();
        let multipliers = init_multipliers(&parameters);

        // Every evolution entry is a pure phase
        assert!(multipliers
            .schroedinger_mul
            .iter()
            .all(|m| (m.norm() - 1.0).abs() < 1e-12));

        // The zero mode sits at the origin after the shift and is pinned
        assert_eq!(multipliers.poisson_mul[[0, 0, 0]], 0.0);
        assert!(multipliers.poisson_mul.iter().all(|m| m.is_finite()));
        assert!(multipliers
            .poisson_mul
            .iter()
            .filter(|&&m| m != 0.0)
            .all(|&m| m < 0.0));
    }
}

#[test]
fn test_normalize_rescales_pointwise() {
    use approx::assert_abs_diff_eq;

    let n = 8;
    let mut ψ1 = Array3::from_shape_fn((n, n, n), |(i, j, k)| {
        Complex::new(1.0 + (i + j) as f64, k as f64)
    });
    let mut ψ2 = Array3::from_elem((n, n, n), Complex::new(0.3, -0.4));

    normalize(&mut ψ1, &mut ψ2).unwrap();
    assert!(crate::utils::grid::check_norm(&ψ1, &ψ2, 1e-12));
    assert_abs_diff_eq!(
        crate::utils::grid::total_probability(&ψ1, &ψ2),
        (n * n * n) as f64,
        epsilon = 1e-9
    );
}

#[test]
fn test_normalize_rejects_degenerate_voxel() {
    let n = 8;
    let mut ψ1 = Array3::from_elem((n, n, n), Complex::new(1.0, 0.0));
    let mut ψ2 = Array3::from_elem((n, n, n), Complex::new(0.0, 0.0));
    ψ1[[2, 5, 7]] = Complex::new(0.0, 0.0);

    assert_eq!(normalize(&mut ψ1, &mut ψ2), Err((2, 5, 7)));

    // The degenerate voxel was left untouched, not filled with NaN
    assert_eq!(ψ1[[2, 5, 7]], Complex::new(0.0, 0.0));
}

#[test]
fn test_velocity_one_form_of_plane_wave() {
    let n = 16;
    let ψ1 = Array3::from_shape_fn((n, n, n), |(i, _, _)| {
        unit_phase(2.0 * PI * i as f64 / n as f64)
    });
    let ψ2 = Array3::from_elem((n, n, n), Complex::new(0.0, 0.0));

    let mut velocity = Array4::zeros((n, n, n, 3));
    velocity_one_form(&ψ1, &ψ2, 1.0, &mut velocity);

    // Constant phase advance of 2π/N along x, none along y or z
    let expected = 2.0 * PI / n as f64;
    for value in velocity.index_axis(Axis(3), 0).iter() {
        assert!((value - expected).abs() < 1e-12);
    }
    for axis in [1, 2] {
        for value in velocity.index_axis(Axis(3), axis).iter() {
            assert!(value.abs() < 1e-12);
        }
    }

    // A constant one-form is divergence free
    let mut div = Array3::from_elem((n, n, n), Complex::new(0.0, 0.0));
    divergence(&velocity, [0.125; 3], &mut div);
    for value in div.iter() {
        assert!(value.re.abs() < 1e-9);
    }
}

#[test]
fn test_gauge_transform_preserves_norm() {
    let n = 8;
    let mut ψ1 = Array3::from_shape_fn((n, n, n), |(i, j, k)| {
        Complex::new(0.8, (i + 2 * j + 3 * k) as f64 * 0.01)
    });
    let mut ψ2 = Array3::from_elem((n, n, n), Complex::new(0.0, 0.6));
    normalize(&mut ψ1, &mut ψ2).unwrap();

    let φ = Array3::from_shape_fn((n, n, n), |(i, j, k)| {
        Complex::new((i * j + k) as f64 * 0.1, 0.0)
    });
    gauge_transform(&mut ψ1, &mut ψ2, &φ);

    assert!(crate::utils::grid::check_norm(&ψ1, &ψ2, 1e-12));
}
