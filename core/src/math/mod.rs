pub mod fft;
pub mod matrix;
pub mod stats;

pub use fft::FftHelper;
pub use matrix::{MatrixHelper, PolyFit};
pub use stats::StatsHelper;
