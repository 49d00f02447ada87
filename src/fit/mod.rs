//! The signal parameter estimation engine.
//!
//! Turns a raw [`SampleBuffer`](crate::acquire::SampleBuffer) into fitted
//! period, phase, and amplitude per channel by minimizing the residual of
//! an assumed sinusoidal model under a coarse-to-fine brute-force search.
//! No trigonometric inversion, no FFT: the search tolerates `|cos|` kinks,
//! clipped samples, and a non-uniform time base, and its runtime is
//! bounded by construction.

pub mod fitter;
pub mod model;
pub mod search;
pub mod smoothing;

pub use fitter::SignalModelFitter;
pub use model::{WaveModel, WaveParams};
pub use search::{Bracket, Candidate};
pub use smoothing::Smoothing;
