//! Core traits and data types for the monitoring engine.
//!
//! The traits here are the seams to the outside world: where samples come
//! from, how time is measured, and where finished measurements and status
//! changes go. Everything behind them (durable buffering, publishing,
//! modem handling, scheduling) is a collaborator concern and stays out of
//! the engine.

use crate::error::AppResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// A capability that reads one instantaneous raw value from an analog input.
///
/// The acquirer calls this in a tight loop and measures the true elapsed
/// time itself; implementations should return as fast as the underlying
/// hardware allows and must not buffer or interpolate.
pub trait SampleSource {
    fn read_raw(&mut self, input: usize) -> AppResult<f64>;
}

/// Monotonic microsecond clock.
///
/// Sample timing is never assumed from a nominal rate; the acquirer derives
/// the empirical per-sample interval from this clock on every capture.
pub trait MonotonicClock {
    fn now_micros(&self) -> u64;
}

/// [`MonotonicClock`] backed by [`std::time::Instant`].
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl MonotonicClock for SystemClock {
    fn now_micros(&self) -> u64 {
        self.origin.elapsed().as_micros() as u64
    }
}

/// One finished measurement cycle, compressed for storage.
///
/// Values are fixed-point integers: the calibrated quantity multiplied by
/// the configured compression multiplier and rounded. A field equal to the
/// configured invalid placeholder means "no measurement available this
/// cycle", which consumers must not read as zero; zero is a genuine
/// reading from a confirmed-quiet source.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeasurementResult {
    pub timestamp: DateTime<Utc>,
    /// Whether the source was producing a signal when sampled.
    pub generator_active: bool,
    /// True when every fitted channel stayed within its error budget.
    pub valid: bool,
    pub voltage: u32,
    pub frequency: u32,
    pub currents: [u32; 3],
    pub power: u32,
}

/// An edge-triggered change of source activity.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ActivityTransition {
    pub timestamp: DateTime<Utc>,
    pub active: bool,
}

/// Accepts finished measurements for durable buffering or publishing.
///
/// Implementations must only be invoked between measurement cycles, never
/// while one is in flight; the capture loop's timing is the fit's time
/// base and tolerates no competing work.
pub trait ResultSink {
    fn record(&mut self, result: &MeasurementResult) -> AppResult<()>;
}

/// Accepts activity transitions for status-change logging, independent of
/// full measurement cycles.
pub trait ActivitySink {
    fn activity_changed(&mut self, event: &ActivityTransition) -> AppResult<()>;
}
