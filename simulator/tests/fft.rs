use isf_simulator::utils::fft::SpectralTransform;
use ndarray::Array3;
use num::Complex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[test]
fn test_roundtrip_of_random_fields() {
    for n in [8usize, 16, 32] {
        let mut rng = StdRng::seed_from_u64(42);
        let field = Array3::from_shape_fn((n, n, n), |_| {
            Complex::new(rng.gen::<f64>() - 0.5, rng.gen::<f64>() - 0.5)
        });

        let transform = SpectralTransform::new(n);
        let mut out = field.clone();
        transform.forward_inplace(&mut out);
        transform.inverse_inplace(&mut out);

        let deviation = out
            .iter()
            .zip(field.iter())
            .map(|(after, before)| (after - before).norm())
            .fold(0.0, f64::max);
        assert!(deviation < 1e-12, "n = {n}: deviation {deviation:e}");
    }
}

#[test]
fn test_constant_field_concentrates_at_zero_frequency() {
    let n = 16;
    let transform = SpectralTransform::new(n);
    let mut field = Array3::from_elem((n, n, n), Complex::new(1.0, 0.0));
    transform.forward_inplace(&mut field);

    // All spectral weight sits at the zero-frequency entry, index (0, 0, 0),
    // the position the multiplier cache assumes after its shift
    assert!((field[[0, 0, 0]].re - (n as f64).powf(1.5)).abs() < 1e-9);
    assert!(field.iter().skip(1).all(|v| v.norm() < 1e-9));
}

#[test]
fn test_transform_preserves_total_power() {
    let n = 32;
    let mut rng = StdRng::seed_from_u64(7);
    let mut field = Array3::from_shape_fn((n, n, n), |_| {
        Complex::new(rng.gen::<f64>() - 0.5, rng.gen::<f64>() - 0.5)
    });
    let before: f64 = field.iter().map(|v| v.norm_sqr()).sum();

    let transform = SpectralTransform::new(n);
    transform.forward_inplace(&mut field);
    let after: f64 = field.iter().map(|v| v.norm_sqr()).sum();

    assert!((before - after).abs() < 1e-8 * before);
}
