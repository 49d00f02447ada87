//! Source activity detection and edge-triggered status tracking.

use crate::core::{ActivitySink, ActivityTransition};
use crate::error::AppResult;
use chrono::Utc;
use tracing::debug;

/// Cheap presence check on the reference channel.
///
/// The source counts as active when any sample in a short window rises
/// above the noise ceiling: the configured threshold on top of the
/// reference channel's zero point. One pass, early exit on the first hit.
#[derive(Debug, Clone, Copy)]
pub struct ActivityDetector {
    threshold: f64,
    reference_offset: f64,
}

impl ActivityDetector {
    pub fn new(threshold: f64, reference_offset: f64) -> Self {
        Self {
            threshold,
            reference_offset,
        }
    }

    pub fn is_active(&self, window: &[f64]) -> bool {
        let ceiling = self.threshold + self.reference_offset;
        window.iter().any(|&sample| sample > ceiling)
    }
}

/// Tracks the last observed activity state and reports transitions only.
///
/// The very first observation counts as a transition, so a sink always
/// learns the initial state.
pub struct ActivityMonitor {
    detector: ActivityDetector,
    last: Option<bool>,
}

impl ActivityMonitor {
    pub fn new(detector: ActivityDetector) -> Self {
        Self {
            detector,
            last: None,
        }
    }

    /// Evaluates `window` and forwards a transition to `sink` when the
    /// state differs from the previous observation. Returns the current
    /// state either way.
    pub fn poll(&mut self, window: &[f64], sink: &mut dyn ActivitySink) -> AppResult<bool> {
        let active = self.detector.is_active(window);
        if self.last != Some(active) {
            debug!(active, "activity state changed");
            sink.activity_changed(&ActivityTransition {
                timestamp: Utc::now(),
                active,
            })?;
            self.last = Some(active);
        }
        Ok(active)
    }
}
