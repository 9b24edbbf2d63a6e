use ndarray::Array3;
use num::Complex;

/// Total probability Σ (|ψ1|² + |ψ2|²) over the whole grid.
pub fn total_probability(ψ1: &Array3<Complex<f64>>, ψ2: &Array3<Complex<f64>>) -> f64 {
    ψ1.iter().map(|p| p.norm_sqr()).sum::<f64>() + ψ2.iter().map(|p| p.norm_sqr()).sum::<f64>()
}

/// Checks the pointwise invariant |ψ1|² + |ψ2|² = 1 within `tolerance`
/// at every voxel.
pub fn check_norm(ψ1: &Array3<Complex<f64>>, ψ2: &Array3<Complex<f64>>, tolerance: f64) -> bool {
    ψ1.iter()
        .zip(ψ2.iter())
        .all(|(p1, p2)| (p1.norm_sqr() + p2.norm_sqr() - 1.0).abs() < tolerance)
}

/// Returns false if any component of the field is NaN or infinite.
pub fn check_complex_for_nans(field: &Array3<Complex<f64>>) -> bool {
    field.iter().all(|v| v.re.is_finite() && v.im.is_finite())
}

#[test]
fn test_total_probability_of_unit_pair() {
    let n = 8;
    let ψ1 = Array3::from_elem((n, n, n), Complex::new(0.6, 0.0));
    let ψ2 = Array3::from_elem((n, n, n), Complex::new(0.0, 0.8));

    let total = total_probability(&ψ1, &ψ2);
    assert!((total - (n * n * n) as f64).abs() < 1e-9);
    assert!(check_norm(&ψ1, &ψ2, 1e-12));
}

#[test]
fn test_nan_scan() {
    let n = 8;
    let mut field = Array3::from_elem((n, n, n), Complex::new(1.0, 0.0));
    assert!(check_complex_for_nans(&field));

    field[[3, 1, 4]] = Complex::new(f64::NAN, 0.0);
    assert!(!check_complex_for_nans(&field));
}
