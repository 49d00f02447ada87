//! Per-channel configuration and fit state.

use serde::{Deserialize, Serialize};

/// Number of monitored channels: one voltage reference plus three phase
/// currents, matching the sense board layout.
pub const CHANNEL_COUNT: usize = 4;

/// Static description of one monitored signal.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChannelConfig {
    /// Analog input this channel samples.
    pub input: usize,
    /// Model the signal as `|cos|` instead of a raw cosine (the channel
    /// passes through a full-wave rectifying sense circuit).
    #[serde(default)]
    pub rectified: bool,
    /// Excluded from fitting; every output becomes the invalid placeholder.
    #[serde(default)]
    pub ignore: bool,
    /// ADC zero point of the modeled wave, raw counts.
    pub y_offset: f64,
    /// Samples at or below this raw value never enter the residual.
    pub wave_min: f64,
    /// Samples at or above this raw value never enter the residual.
    pub wave_max: f64,
    /// RMS calibration polynomial, lowest-degree coefficient first.
    pub rms_poly: Vec<f64>,
    /// Frequency calibration polynomial, lowest-degree coefficient first.
    pub freq_poly: Vec<f64>,
    /// Largest acceptable root-sum-square fit residual.
    pub max_error: f64,
}

/// Fit state for one channel, recreated every measurement attempt.
///
/// Stages take these by value and hand back updated copies; the
/// orchestrator owns the authoritative set for the cycle in flight.
/// `period`, `phase`, and `amplitude` are in source units (microseconds,
/// phase units, hundredths of a raw count); `rms` and `frequency` are
/// calibrated physical values filled in by the calibration stage.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelFit {
    pub period: i64,
    pub phase: i64,
    pub amplitude: i64,
    pub error: f64,
    pub rms: f64,
    pub frequency: f64,
    pub ignored: bool,
}

impl ChannelFit {
    /// Placeholder state for a channel excluded from fitting.
    pub fn placeholder(value: u32) -> Self {
        Self {
            period: i64::from(value),
            phase: i64::from(value),
            amplitude: i64::from(value),
            error: f64::from(value),
            rms: f64::from(value),
            frequency: f64::from(value),
            ignored: true,
        }
    }

    /// Confirmed-quiet state: the source was checked and is not producing.
    pub fn zeroed() -> Self {
        Self {
            period: 0,
            phase: 0,
            amplitude: 0,
            error: 0.0,
            rms: 0.0,
            frequency: 0.0,
            ignored: false,
        }
    }
}
