//! Configuration management.
//!
//! Settings load from TOML through the `config` crate and are validated
//! before the engine sees them. Every numeric constant the estimation
//! engine depends on (thresholds, search brackets, terminal step sizes,
//! the phase snap window) lives here as a named field with documented
//! units; nothing is inlined in algorithm code.

use crate::channel::{ChannelConfig, CHANNEL_COUNT};
use crate::error::{AppResult, SenseError};
use config::Config;
use serde::{Deserialize, Serialize};

/// How the fitted period is shared across channels.
///
/// Field installations disagree on whether the mains period should be
/// estimated once or per line; both behaviors are supported behind this
/// switch rather than as parallel code paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PeriodPolicy {
    /// The first non-ignored channel fits the period; the rest reuse it
    /// and fit phase only.
    ReferenceShared,
    /// Every channel fits its own period. The reference channel's period
    /// stays authoritative for the frequency output.
    PerChannel,
}

/// Inclusive-min, exclusive-max bracket for one search parameter.
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct SearchRange {
    pub min: i64,
    pub max: i64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub engine: EngineSettings,
    #[serde(default)]
    pub search: SearchSettings,
    #[serde(default)]
    pub power: PowerSettings,
    pub channels: Vec<ChannelConfig>,
    pub source: SourceConfig,
}

fn default_log_level() -> String {
    "info".to_owned()
}

/// Sample source selection; the typed payload is parsed by the chosen
/// implementation.
#[derive(Debug, Deserialize, Clone)]
pub struct SourceConfig {
    pub r#type: String,
    #[serde(flatten)]
    pub config: toml::Value,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EngineSettings {
    /// Samples captured per channel for a full measurement.
    pub sample_count: usize,
    /// Window length for the cheap activity check.
    pub status_samples: usize,
    /// Boxcar width for the preliminary amplitude estimate.
    pub smoothing_window: usize,
    /// Measurement attempts before a cycle degrades to placeholders.
    pub max_attempts: u32,
    /// Raw counts above the reference channel zero point that count as
    /// "signal present" rather than noise at rest.
    pub activity_threshold: f64,
    /// Fixed-point scale applied to calibrated values before storage.
    pub compression_multiplier: f64,
    /// Reserved integer meaning "no valid measurement"; never a genuine
    /// reading.
    pub invalid_placeholder: u32,
    pub period_policy: PeriodPolicy,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            sample_count: 2000,
            status_samples: 600,
            smoothing_window: 5,
            max_attempts: 10,
            activity_threshold: 100.0,
            compression_multiplier: 100.0,
            invalid_placeholder: 9999,
            period_policy: PeriodPolicy::ReferenceShared,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SearchSettings {
    /// Grid points evaluated per bracket pass. Must be at least 3 so the
    /// bracket strictly shrinks and the search terminates.
    pub fan_out: i64,
    /// Period search bounds, microseconds.
    pub period: SearchRange,
    /// Phase search bounds; `phase.max` is one full cycle in phase units.
    pub phase: SearchRange,
    /// Amplitude search bounds, hundredths of a raw count.
    pub amplitude: SearchRange,
    /// Terminal step for period and phase passes.
    pub fine_step: i64,
    /// Terminal step for amplitude passes; coarser because the residual
    /// flattens near the amplitude optimum.
    pub amplitude_step: i64,
    /// Fitted periods below this produce frequency 0 instead of
    /// `1e6 / period`.
    pub min_period_for_frequency: i64,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            fan_out: 10,
            period: SearchRange {
                min: 15_000,
                max: 25_000,
            },
            phase: SearchRange { min: 0, max: 10_000 },
            amplitude: SearchRange {
                min: 1,
                max: 409_500,
            },
            fine_step: 1,
            amplitude_step: 100,
            min_period_for_frequency: 15_002,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PowerSettings {
    /// Quarter-cycle phase differences in `(-snap_window, 0)` are treated
    /// as jitter around true alignment and snapped to zero, in phase
    /// units.
    pub snap_window: i64,
}

impl Default for PowerSettings {
    fn default() -> Self {
        Self { snap_window: 20 }
    }
}

impl Settings {
    /// Loads and validates settings from a TOML file (extension omitted),
    /// defaulting to `config/default`.
    pub fn new(config_name: Option<&str>) -> AppResult<Self> {
        let config_path = config_name.unwrap_or("config/default");
        let s = Config::builder()
            .add_source(config::File::with_name(config_path))
            .build()
            .map_err(SenseError::Config)?;

        let settings: Settings = s.try_deserialize().map_err(SenseError::Config)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Semantic validation beyond what deserialization can express.
    pub fn validate(&self) -> AppResult<()> {
        fn invalid(msg: String) -> AppResult<()> {
            Err(SenseError::Configuration(msg))
        }

        if self.channels.len() != CHANNEL_COUNT {
            return invalid(format!(
                "expected {CHANNEL_COUNT} channels (voltage + three currents), got {}",
                self.channels.len()
            ));
        }
        if self.channels.iter().all(|c| c.ignore) {
            return invalid("every channel is ignored; nothing to measure".into());
        }
        for (index, channel) in self.channels.iter().enumerate() {
            if channel.wave_min >= channel.wave_max {
                return invalid(format!(
                    "channel {index}: wave_min must be below wave_max"
                ));
            }
            for (name, poly) in [("rms_poly", &channel.rms_poly), ("freq_poly", &channel.freq_poly)]
            {
                if !(2..=4).contains(&poly.len()) {
                    return invalid(format!(
                        "channel {index}: {name} must have 2 to 4 coefficients (linear through cubic), got {}",
                        poly.len()
                    ));
                }
            }
            if !channel.max_error.is_finite() || channel.max_error <= 0.0 {
                return invalid(format!(
                    "channel {index}: max_error must be positive and finite"
                ));
            }
        }

        let engine = &self.engine;
        if engine.sample_count == 0 {
            return invalid("engine.sample_count must be greater than 0".into());
        }
        if engine.status_samples == 0 || engine.status_samples > engine.sample_count {
            return invalid("engine.status_samples must be in 1..=sample_count".into());
        }
        if engine.smoothing_window == 0 || engine.smoothing_window > engine.sample_count {
            return invalid("engine.smoothing_window must be in 1..=sample_count".into());
        }
        if engine.max_attempts == 0 {
            return invalid("engine.max_attempts must be at least 1".into());
        }
        if !engine.compression_multiplier.is_finite() || engine.compression_multiplier <= 0.0 {
            return invalid("engine.compression_multiplier must be positive and finite".into());
        }

        let search = &self.search;
        if search.fan_out < 3 {
            return invalid("search.fan_out must be at least 3 so brackets shrink".into());
        }
        for (name, range) in [
            ("period", search.period),
            ("phase", search.phase),
            ("amplitude", search.amplitude),
        ] {
            if range.min >= range.max {
                return invalid(format!("search.{name}: min must be below max"));
            }
        }
        if search.fine_step < 1 || search.amplitude_step < 1 {
            return invalid("search step granularities must be at least 1".into());
        }
        if self.power.snap_window < 0 {
            return invalid("power.snap_window must not be negative".into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_channel() -> ChannelConfig {
        ChannelConfig {
            input: 0,
            rectified: false,
            ignore: false,
            y_offset: 1975.0,
            wave_min: -1.0,
            wave_max: 4096.0,
            rms_poly: vec![0.0, 1.0],
            freq_poly: vec![0.0, 1.0],
            max_error: 5000.0,
        }
    }

    fn test_settings() -> Settings {
        Settings {
            log_level: "info".to_owned(),
            engine: EngineSettings::default(),
            search: SearchSettings::default(),
            power: PowerSettings::default(),
            channels: (0..CHANNEL_COUNT)
                .map(|input| ChannelConfig {
                    input,
                    ..test_channel()
                })
                .collect(),
            source: SourceConfig {
                r#type: "mock".to_owned(),
                config: toml::Value::Table(toml::map::Map::new()),
            },
        }
    }

    #[test]
    fn test_default_settings_are_valid() {
        assert!(test_settings().validate().is_ok());
    }

    #[test]
    fn test_wrong_channel_count_rejected() {
        let mut settings = test_settings();
        settings.channels.pop();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_all_channels_ignored_rejected() {
        let mut settings = test_settings();
        for channel in &mut settings.channels {
            channel.ignore = true;
        }
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_narrow_fan_out_rejected() {
        let mut settings = test_settings();
        settings.search.fan_out = 2;
        let err = settings.validate().unwrap_err().to_string();
        assert!(err.contains("fan_out"));
    }

    #[test]
    fn test_constant_polynomial_rejected() {
        let mut settings = test_settings();
        settings.channels[1].rms_poly = vec![1.0];
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_quartic_polynomial_rejected() {
        let mut settings = test_settings();
        settings.channels[1].rms_poly = vec![0.0, 1.0, 0.0, 0.0, 0.1];
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_inverted_wave_window_rejected() {
        let mut settings = test_settings();
        settings.channels[0].wave_min = 5000.0;
        settings.channels[0].wave_max = 550.0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_status_window_longer_than_capture_rejected() {
        let mut settings = test_settings();
        settings.engine.status_samples = settings.engine.sample_count + 1;
        assert!(settings.validate().is_err());
    }
}
