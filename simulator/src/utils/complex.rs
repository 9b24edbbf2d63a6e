use num::Complex;

/// Unit-modulus phase factor exp(iθ)
pub fn unit_phase(theta: f64) -> Complex<f64> {
    Complex::from_polar(1.0, theta)
}

#[test]
fn test_unit_phase_modulus() {
    for theta in [-7.3, -1.0, 0.0, 0.5, 3.9] {
        assert!((unit_phase(theta).norm() - 1.0).abs() < 1e-15);
    }
}
