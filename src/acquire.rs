//! Raw sample capture.
//!
//! Capture is deliberately blocking: the loop's own timing is the time base
//! every later fit runs against, so nothing may preempt it mid-buffer. The
//! per-sample interval is measured from the monotonic clock on every run;
//! ADC read timing drifts with temperature and load, so the nominal rate is
//! never trusted.

use crate::channel::ChannelConfig;
use crate::core::{MonotonicClock, SampleSource};
use crate::error::AppResult;
use tracing::debug;

/// Channel-major matrix of raw samples plus the measured time axis.
#[derive(Debug, Clone)]
pub struct SampleBuffer {
    data: Vec<Vec<f64>>,
    /// Measured wall-clock microseconds between consecutive samples of one
    /// channel.
    pub sample_interval_us: f64,
}

impl SampleBuffer {
    pub fn new(data: Vec<Vec<f64>>, sample_interval_us: f64) -> Self {
        Self {
            data,
            sample_interval_us,
        }
    }

    pub fn channel(&self, index: usize) -> &[f64] {
        &self.data[index]
    }

    pub fn channel_count(&self) -> usize {
        self.data.len()
    }

    pub fn sample_count(&self) -> usize {
        self.data.first().map_or(0, Vec::len)
    }
}

/// Captures fixed-size sample blocks and measures the true elapsed time per
/// sample.
pub struct SampleAcquirer {
    sample_count: usize,
}

impl SampleAcquirer {
    pub fn new(sample_count: usize) -> Self {
        Self { sample_count }
    }

    /// Captures `sample_count` samples for every channel, scanning the
    /// channels in order within each row the way the input multiplexer is
    /// scanned, and derives the per-sample interval from total elapsed
    /// time. No signal-presence validation happens here, just capture.
    pub fn acquire(
        &self,
        channels: &[ChannelConfig],
        source: &mut dyn SampleSource,
        clock: &dyn MonotonicClock,
    ) -> AppResult<SampleBuffer> {
        let mut data = vec![vec![0.0; self.sample_count]; channels.len()];
        let started = clock.now_micros();
        for i in 0..self.sample_count {
            for (row, channel) in data.iter_mut().zip(channels) {
                row[i] = source.read_raw(channel.input)?;
            }
        }
        let elapsed = clock.now_micros().saturating_sub(started);
        let sample_interval_us = elapsed as f64 / self.sample_count as f64;
        debug!(
            samples = self.sample_count,
            elapsed_us = elapsed,
            interval_us = sample_interval_us,
            "capture complete"
        );
        Ok(SampleBuffer {
            data,
            sample_interval_us,
        })
    }

    /// Captures a short window from a single input, for the status-only
    /// poll. No timing is derived; the activity check is amplitude-only.
    pub fn acquire_window(
        &self,
        input: usize,
        len: usize,
        source: &mut dyn SampleSource,
    ) -> AppResult<Vec<f64>> {
        let mut window = Vec::with_capacity(len);
        for _ in 0..len {
            window.push(source.read_raw(input)?);
        }
        Ok(window)
    }
}
