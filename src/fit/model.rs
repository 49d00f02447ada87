//! The assumed sinusoidal signal model and its residual metric.

use crate::channel::ChannelConfig;
use std::f64::consts::PI;

/// Candidate parameter set for one channel's wave.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaveParams {
    /// Cycle length, in the same microsecond units as the sample interval.
    pub period: i64,
    /// Horizontal shift in phase units; one full cycle is the configured
    /// phase-range maximum.
    pub phase: i64,
    /// Peak height in hundredths of a raw count.
    pub amplitude: i64,
}

/// Shape of one channel's modeled signal: a cosine, or its absolute value
/// for channels behind a full-wave rectifying sense circuit, riding on a
/// fixed ADC zero point. The validity window bounds which raw samples may
/// enter the residual; readings outside it are clipped or saturated.
#[derive(Debug, Clone, Copy)]
pub struct WaveModel {
    pub y_offset: f64,
    pub rectified: bool,
    /// Phase units per full cycle.
    pub phase_unit: i64,
    pub wave_min: f64,
    pub wave_max: f64,
}

impl WaveModel {
    pub fn for_channel(channel: &ChannelConfig, phase_unit: i64) -> Self {
        Self {
            y_offset: channel.y_offset,
            rectified: channel.rectified,
            phase_unit,
            wave_min: channel.wave_min,
            wave_max: channel.wave_max,
        }
    }

    /// Model value at sample index `index` under the measured interval.
    pub fn value_at(&self, params: WaveParams, index: usize, interval_us: f64) -> f64 {
        let cycles = params.phase as f64 / self.phase_unit as f64
            + index as f64 * interval_us / params.period as f64;
        let wave = (2.0 * PI * cycles).cos();
        let wave = if self.rectified { wave.abs() } else { wave };
        self.y_offset + params.amplitude as f64 / 100.0 * wave
    }

    /// Root-sum-square residual of `params` against the first `cap`
    /// samples. Samples outside the open validity window are skipped; a
    /// window that admits no sample at all, or a degenerate period, yields
    /// `f64::INFINITY` so it can never win a search.
    pub fn residual(&self, samples: &[f64], cap: usize, params: WaveParams, interval_us: f64) -> f64 {
        if params.period <= 0 {
            return f64::INFINITY;
        }
        let cap = cap.min(samples.len());
        let mut sum = 0.0;
        let mut used = 0usize;
        for (index, &sample) in samples[..cap].iter().enumerate() {
            if sample > self.wave_min && sample < self.wave_max {
                let diff = sample - self.value_at(params, index, interval_us);
                sum += diff * diff;
                used += 1;
            }
        }
        if used == 0 {
            return f64::INFINITY;
        }
        sum.sqrt()
    }
}
