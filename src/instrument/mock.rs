//! A synthetic sample source for development and tests.
//!
//! Generates the configured waveforms against a simulated clock that
//! advances a fixed number of microseconds per reading, so an entire
//! measurement cycle runs deterministically with no hardware attached.
//! The acquirer still measures a truthful sample interval, because the
//! same clock that times the capture also drives the waves.

use crate::channel::ChannelConfig;
use crate::core::{MonotonicClock, SampleSource};
use crate::error::{AppResult, SenseError};
use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Configuration for the mock sample source.
///
/// # Examples
///
/// ```toml
/// [source]
/// type = "mock"
/// active = true
/// period_us = 20000.0
/// advance_us = 40
/// noise = 2.0
/// waves = [
///     { phase = 2500, amplitude = 330000 },
///     { phase = 2600, amplitude = 120000 },
///     { phase = 2700, amplitude = 120000 },
///     { phase = 2800, amplitude = 120000 },
/// ]
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MockSourceConfig {
    /// Whether the simulated generator is producing at all.
    #[serde(default = "default_active")]
    pub active: bool,
    /// Cycle length of the simulated waves, microseconds.
    pub period_us: f64,
    /// Simulated clock advance per reading, microseconds.
    pub advance_us: u64,
    /// Peak uniform noise added to every reading, raw counts.
    #[serde(default)]
    pub noise: f64,
    /// RNG seed, so noisy runs are reproducible.
    #[serde(default)]
    pub seed: u64,
    /// One generated wave per configured channel, in channel order.
    pub waves: Vec<MockWave>,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct MockWave {
    /// Phase offset in phase units.
    pub phase: i64,
    /// Amplitude in hundredths of a raw count.
    pub amplitude: i64,
}

impl MockSourceConfig {
    /// Creates a configuration from a TOML value.
    pub fn from_toml(config: &toml::Value) -> Result<Self> {
        toml::from_str(&toml::to_string(config)?)
            .context("Failed to parse mock source configuration")
    }

    /// Validates the configuration parameters.
    pub fn validate(&self) -> Result<()> {
        if !self.period_us.is_finite() || self.period_us <= 0.0 {
            anyhow::bail!("period_us must be positive and finite, got {}", self.period_us);
        }
        if self.advance_us == 0 {
            anyhow::bail!("advance_us must be greater than 0");
        }
        if !self.noise.is_finite() || self.noise < 0.0 {
            anyhow::bail!("noise must be non-negative and finite, got {}", self.noise);
        }
        Ok(())
    }

    /// Creates a validated configuration from TOML in one call.
    pub fn from_toml_validated(config: &toml::Value) -> Result<Self> {
        let config = Self::from_toml(config)?;
        config.validate()?;
        Ok(config)
    }
}

/// Deterministic microsecond clock advanced by the mock source.
#[derive(Clone, Default)]
pub struct SimClock {
    now: Arc<AtomicU64>,
}

impl SimClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves simulated time forward and returns the new now.
    pub fn advance(&self, micros: u64) -> u64 {
        self.now.fetch_add(micros, Ordering::Relaxed) + micros
    }
}

impl MonotonicClock for SimClock {
    fn now_micros(&self) -> u64 {
        self.now.load(Ordering::Relaxed)
    }
}

struct SimChannel {
    input: usize,
    y_offset: f64,
    rectified: bool,
    wave: MockWave,
}

pub struct MockSampleSource {
    config: MockSourceConfig,
    channels: Vec<SimChannel>,
    clock: SimClock,
    rng: StdRng,
    phase_unit: i64,
}

impl MockSampleSource {
    /// Pairs each configured channel with its generated wave. `phase_unit`
    /// is the phase-range maximum the engine searches against, so the
    /// generated offsets mean the same thing the fitter recovers.
    pub fn new(
        config: MockSourceConfig,
        channels: &[ChannelConfig],
        phase_unit: i64,
    ) -> AppResult<Self> {
        if config.waves.len() != channels.len() {
            return Err(SenseError::Configuration(format!(
                "mock source defines {} waves for {} channels",
                config.waves.len(),
                channels.len()
            )));
        }
        let channels = channels
            .iter()
            .zip(&config.waves)
            .map(|(channel, &wave)| SimChannel {
                input: channel.input,
                y_offset: channel.y_offset,
                rectified: channel.rectified,
                wave,
            })
            .collect();
        let rng = StdRng::seed_from_u64(config.seed);
        Ok(Self {
            config,
            channels,
            clock: SimClock::new(),
            rng,
            phase_unit,
        })
    }

    /// The simulated clock, to hand to the acquirer in place of a real
    /// one.
    pub fn clock(&self) -> SimClock {
        self.clock.clone()
    }
}

impl SampleSource for MockSampleSource {
    fn read_raw(&mut self, input: usize) -> AppResult<f64> {
        let t = self.clock.advance(self.config.advance_us) as f64;
        let channel = self
            .channels
            .iter()
            .find(|c| c.input == input)
            .ok_or(SenseError::UnknownInput(input))?;
        let value = if self.config.active {
            let cycles =
                channel.wave.phase as f64 / self.phase_unit as f64 + t / self.config.period_us;
            let wave = (2.0 * PI * cycles).cos();
            let wave = if channel.rectified { wave.abs() } else { wave };
            channel.y_offset + channel.wave.amplitude as f64 / 100.0 * wave
        } else {
            channel.y_offset
        };
        let noise = if self.config.noise > 0.0 {
            self.rng.gen_range(-self.config.noise..=self.config.noise)
        } else {
            0.0
        };
        Ok(value + noise)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_channels() -> Vec<ChannelConfig> {
        (0..2)
            .map(|input| ChannelConfig {
                input,
                rectified: false,
                ignore: false,
                y_offset: 1975.0,
                wave_min: -1.0,
                wave_max: 4096.0,
                rms_poly: vec![0.0, 1.0],
                freq_poly: vec![0.0, 1.0],
                max_error: 5000.0,
            })
            .collect()
    }

    fn test_config(active: bool) -> MockSourceConfig {
        MockSourceConfig {
            active,
            period_us: 20_000.0,
            advance_us: 40,
            noise: 0.0,
            seed: 0,
            waves: vec![
                MockWave {
                    phase: 0,
                    amplitude: 120_000,
                },
                MockWave {
                    phase: 2_500,
                    amplitude: 120_000,
                },
            ],
        }
    }

    #[test]
    fn test_clock_advances_per_read() {
        let mut source = MockSampleSource::new(test_config(true), &test_channels(), 10_000).unwrap();
        let clock = source.clock();
        assert_eq!(clock.now_micros(), 0);
        source.read_raw(0).unwrap();
        source.read_raw(1).unwrap();
        assert_eq!(clock.now_micros(), 80);
    }

    #[test]
    fn test_inactive_source_sits_at_zero_point() {
        let mut source = MockSampleSource::new(test_config(false), &test_channels(), 10_000).unwrap();
        for _ in 0..100 {
            assert_eq!(source.read_raw(0).unwrap(), 1975.0);
        }
    }

    #[test]
    fn test_unknown_input_is_an_error() {
        let mut source = MockSampleSource::new(test_config(true), &test_channels(), 10_000).unwrap();
        assert!(source.read_raw(7).is_err());
    }

    #[test]
    fn test_wave_count_must_match_channel_count() {
        let mut config = test_config(true);
        config.waves.pop();
        assert!(MockSampleSource::new(config, &test_channels(), 10_000).is_err());
    }

    #[test]
    fn test_from_toml_round_trip() {
        let toml_str = r#"
            period_us = 20000.0
            advance_us = 40
            noise = 2.0
            waves = [{ phase = 0, amplitude = 100000 }]
        "#;
        let value: toml::Value = toml::from_str(toml_str).unwrap();
        let config = MockSourceConfig::from_toml_validated(&value).unwrap();
        assert!(config.active);
        assert_eq!(config.advance_us, 40);
        assert_eq!(config.waves.len(), 1);
    }

    #[test]
    fn test_zero_advance_rejected() {
        let mut config = test_config(true);
        config.advance_us = 0;
        assert!(config.validate().is_err());
    }
}
