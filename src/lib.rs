//! # gridsense
//!
//! Core library for remote AC power monitoring. Raw, noisy, non-uniformly
//! timed ADC samples go in; calibrated line voltage, three-phase current,
//! frequency, and approximate real power come out, recovered by fitting
//! an assumed sinusoidal model with a coarse-to-fine brute-force search,
//! with no RMS chip, PLL, or FFT hardware involved.
//!
//! ## Crate Structure
//!
//! - **`core`**: the trait seams to the outside world (`SampleSource`,
//!   `MonotonicClock`, `ResultSink`, `ActivitySink`) and the compressed
//!   `MeasurementResult` they exchange.
//! - **`config`**: TOML-backed settings with semantic validation; every
//!   engine constant is a named, documented field.
//! - **`channel`**: per-channel configuration and the fit state threaded
//!   through the pipeline stages.
//! - **`acquire`**: blocking sample capture with an empirically measured
//!   time base.
//! - **`activity`**: cheap signal-presence detection plus edge-triggered
//!   status tracking.
//! - **`fit`**: the estimation engine: smoothing seed, bracket search,
//!   wave model, and the three-round fitter.
//! - **`calibrate`**: polynomial mapping from fitted source units to RMS
//!   and frequency.
//! - **`power`**: per-line real-power approximation from RMS magnitudes
//!   and phase differences.
//! - **`orchestrator`**: the bounded-retry measurement state machine tying
//!   the stages together.
//! - **`instrument`**: sample source implementations (currently the
//!   deterministic mock).
//! - **`sink`**: JSON-lines, tracing, and in-memory record sinks.
//! - **`error`**: the `SenseError` type shared by the collaborator layer.

pub mod acquire;
pub mod activity;
pub mod calibrate;
pub mod channel;
pub mod config;
pub mod core;
pub mod error;
pub mod fit;
pub mod instrument;
pub mod orchestrator;
pub mod power;
pub mod sink;
