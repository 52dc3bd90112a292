//! Digital Signal Processing utilities

pub mod fft;
pub mod stats;
pub mod windows;

pub use fft::{bin_frequency, full_magnitude_spectrum, FftProcessor, Planner};
pub use windows::{create_window, WindowType};
