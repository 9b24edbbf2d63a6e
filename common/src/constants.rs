/// Edge length of the cubic dispatch tile the per-voxel kernels are blocked
/// into. The grid resolution must be a multiple of this.
pub const DISPATCH_TILE: usize = 8;

/// Threshold on the squared pointwise norm |ψ1|² + |ψ2|² below which
/// normalization is treated as a fatal numerical degeneracy.
pub const NORM_EPSILON: f64 = 1e-12;

/// Maximum elementwise deviation tolerated by the forward/inverse transform
/// round-trip probe.
pub const ROUNDTRIP_TOLERANCE: f64 = 1e-10;
