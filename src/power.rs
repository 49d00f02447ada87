//! Approximate real power from RMS magnitudes and phase offsets.
//!
//! True power-factor measurement would integrate instantaneous V×I, which
//! this model never sees. Instead each line is approximated as
//! `V_rms · I_rms · cos(Δφ)`, with `Δφ` taken from the fitted phase
//! offsets after reducing both modulo one quarter cycle to strip
//! multi-cycle ambiguity.

use crate::channel::ChannelFit;
use std::f64::consts::PI;
use tracing::debug;

pub struct PowerEstimator {
    /// Phase units per full cycle.
    phase_unit: i64,
    /// Quarter-cycle differences in `(-snap_window, 0)` count as jitter
    /// around true alignment and snap to zero.
    snap_window: i64,
}

impl PowerEstimator {
    pub fn new(phase_unit: i64, snap_window: i64) -> Self {
        Self {
            phase_unit,
            snap_window,
        }
    }

    /// Reduced, unwrapped phase difference between a current channel and
    /// the voltage reference, in phase units.
    ///
    /// Both phases are reduced modulo a quarter cycle. A slightly negative
    /// difference inside the snap window is jitter and becomes zero; a
    /// difference below the window is a wrap artifact and gets a quarter
    /// cycle added back.
    pub fn phase_difference(&self, current_phase: i64, voltage_phase: i64) -> i64 {
        let quarter = self.phase_unit / 4;
        let mut current = current_phase % quarter;
        let voltage = voltage_phase % quarter;
        let diff = current - voltage;
        if diff > -self.snap_window && diff < 0 {
            current = voltage;
        } else if diff < -self.snap_window {
            current += quarter;
        }
        current - voltage
    }

    /// Total real power across the current channels.
    ///
    /// `None` when the voltage reference or any current channel is
    /// ignored; power cannot be assembled from partial phase data, and
    /// the caller maps that to the invalid placeholder.
    pub fn total_power(&self, voltage: &ChannelFit, currents: &[&ChannelFit]) -> Option<f64> {
        if voltage.ignored {
            return None;
        }
        let mut total = 0.0;
        for (line, current) in currents.iter().enumerate() {
            if current.ignored {
                return None;
            }
            let diff = self.phase_difference(current.phase, voltage.phase);
            let angle = 2.0 * PI * diff as f64 / self.phase_unit as f64;
            let line_power = voltage.rms * current.rms * angle.cos();
            debug!(line = line + 1, power = line_power, "line power");
            total += line_power;
        }
        Some(total)
    }
}
