pub mod ics;
pub mod kernels;
pub mod simulation_object;
pub mod utils;
