//! The measurement cycle state machine.
//!
//! `Idle → Sampling → (activity gate) → Fitting | Zeroed → Validating →
//! Done(valid) | Retry | Done(invalid)`. The bounded attempt budget is the
//! only runtime ceiling; a cycle that exhausts it degrades to placeholder
//! outputs instead of failing the caller. A quiet source short-circuits to
//! a zeroed result: zero means "confirmed no signal", the placeholder
//! means "could not determine".

use crate::acquire::{SampleAcquirer, SampleBuffer};
use crate::activity::ActivityDetector;
use crate::calibrate::CalibrationMapper;
use crate::channel::ChannelFit;
use crate::config::Settings;
use crate::core::{MeasurementResult, MonotonicClock, SampleSource};
use crate::error::AppResult;
use crate::fit::{SignalModelFitter, Smoothing};
use crate::power::PowerEstimator;
use chrono::Utc;
use tracing::{debug, info, warn};

/// Everything a finished cycle produced: the compressed result plus the
/// per-channel fits and raw buffer for diagnostics.
pub struct MeasurementCycle {
    pub result: MeasurementResult,
    pub fits: Vec<ChannelFit>,
    pub buffer: Option<SampleBuffer>,
}

pub struct MeasurementOrchestrator<'a> {
    settings: &'a Settings,
}

impl<'a> MeasurementOrchestrator<'a> {
    pub fn new(settings: &'a Settings) -> Self {
        Self { settings }
    }

    /// Runs one complete measurement cycle: capture, gate, fit, calibrate,
    /// validate, retrying up to the attempt budget. Never fails on fit
    /// quality; only source or sink faults surface as errors.
    pub fn run_cycle(
        &self,
        source: &mut dyn SampleSource,
        clock: &dyn MonotonicClock,
    ) -> AppResult<MeasurementCycle> {
        let engine = &self.settings.engine;
        let channels = &self.settings.channels;
        let acquirer = SampleAcquirer::new(engine.sample_count);
        // The reference channel's zero point anchors the activity ceiling
        // even when that channel is excluded from fitting.
        let detector = ActivityDetector::new(engine.activity_threshold, channels[0].y_offset);
        let fitter = SignalModelFitter::new(
            &self.settings.search,
            engine.period_policy,
            Smoothing::new(engine.smoothing_window),
            engine.invalid_placeholder,
        );
        let mapper = CalibrationMapper::new(self.settings.search.min_period_for_frequency);
        let estimator =
            PowerEstimator::new(self.settings.search.phase.max, self.settings.power.snap_window);

        for attempt in 1..=engine.max_attempts {
            debug!(attempt, "measurement attempt");
            let buffer = acquirer.acquire(channels, source, clock)?;

            let status_len = engine.status_samples.min(buffer.sample_count());
            if !detector.is_active(&buffer.channel(0)[..status_len]) {
                info!("source inactive; zeroing measurements");
                return Ok(self.zeroed_cycle(buffer));
            }

            let fits: Vec<ChannelFit> = fitter
                .fit(&buffer, channels)
                .into_iter()
                .zip(channels)
                .map(|(fit, channel)| mapper.apply(fit, channel))
                .collect();

            if self.fits_valid(&fits) {
                let total =
                    estimator.total_power(&fits[0], &[&fits[1], &fits[2], &fits[3]]);
                info!(attempt, "measurement valid");
                let result = self.compress(&fits, total);
                return Ok(MeasurementCycle {
                    result,
                    fits,
                    buffer: Some(buffer),
                });
            }
            warn!(attempt, "fit exceeded error budget");
        }

        info!(
            attempts = engine.max_attempts,
            "attempt budget exhausted; reporting placeholders"
        );
        Ok(self.invalid_cycle())
    }

    /// A cycle is valid only when every fitted channel stayed within its
    /// error budget; the boundary itself passes.
    fn fits_valid(&self, fits: &[ChannelFit]) -> bool {
        fits.iter()
            .zip(&self.settings.channels)
            .all(|(fit, channel)| channel.ignore || fit.error <= channel.max_error)
    }

    fn compress(&self, fits: &[ChannelFit], total_power: Option<f64>) -> MeasurementResult {
        let engine = &self.settings.engine;
        let multiplier = engine.compression_multiplier;
        let placeholder = engine.invalid_placeholder;
        let field = |fit: &ChannelFit, value: f64| {
            if fit.ignored {
                placeholder
            } else {
                compress_value(value, multiplier)
            }
        };
        // Frequency follows the authoritative period: the first channel
        // that actually fitted one.
        let frequency = fits
            .iter()
            .find(|fit| !fit.ignored)
            .map_or(placeholder, |fit| compress_value(fit.frequency, multiplier));
        MeasurementResult {
            timestamp: Utc::now(),
            generator_active: true,
            valid: true,
            voltage: field(&fits[0], fits[0].rms),
            frequency,
            currents: [
                field(&fits[1], fits[1].rms),
                field(&fits[2], fits[2].rms),
                field(&fits[3], fits[3].rms),
            ],
            power: total_power.map_or(placeholder, |p| compress_value(p, multiplier)),
        }
    }

    /// Confirmed-quiet outcome: genuine zeros on every fitted channel,
    /// placeholders on ignored ones.
    fn zeroed_cycle(&self, buffer: SampleBuffer) -> MeasurementCycle {
        let placeholder = self.settings.engine.invalid_placeholder;
        let fits: Vec<ChannelFit> = self
            .settings
            .channels
            .iter()
            .map(|channel| {
                if channel.ignore {
                    ChannelFit::placeholder(placeholder)
                } else {
                    ChannelFit::zeroed()
                }
            })
            .collect();
        let zero_or = |fit: &ChannelFit| if fit.ignored { placeholder } else { 0 };
        let result = MeasurementResult {
            timestamp: Utc::now(),
            generator_active: false,
            valid: true,
            voltage: zero_or(&fits[0]),
            frequency: 0,
            currents: [zero_or(&fits[1]), zero_or(&fits[2]), zero_or(&fits[3])],
            power: if fits.iter().any(|f| f.ignored) {
                placeholder
            } else {
                0
            },
        };
        MeasurementCycle {
            result,
            fits,
            buffer: Some(buffer),
        }
    }

    /// Exhausted-budget outcome: placeholders everywhere, explicitly not
    /// zeros.
    fn invalid_cycle(&self) -> MeasurementCycle {
        let placeholder = self.settings.engine.invalid_placeholder;
        let result = MeasurementResult {
            timestamp: Utc::now(),
            generator_active: true,
            valid: false,
            voltage: placeholder,
            frequency: placeholder,
            currents: [placeholder; 3],
            power: placeholder,
        };
        MeasurementCycle {
            result,
            fits: self
                .settings
                .channels
                .iter()
                .map(|_| ChannelFit::placeholder(placeholder))
                .collect(),
            buffer: None,
        }
    }
}

/// Fixed-point compression: scale, round, saturate into the output type.
pub fn compress_value(value: f64, multiplier: f64) -> u32 {
    (value * multiplier).round() as u32
}
