//! Boxcar smoothing for the preliminary amplitude estimate.
//!
//! The sliding mean exists only long enough to find its extremes; the
//! peak-to-trough swing, scaled into model units, seeds the amplitude
//! search. Model amplitude is in hundredths of a raw count: a rectified
//! wave swings `amplitude / 100` peak to trough while a raw cosine swings
//! twice that, hence the two scale factors.

/// Swing-to-amplitude scale for a rectified (`|cos|`) channel.
const RECTIFIED_SWING_SCALE: f64 = 100.0;
/// Swing-to-amplitude scale for a plain cosine channel.
const COSINE_SWING_SCALE: f64 = 50.0;

#[derive(Debug, Clone, Copy)]
pub struct Smoothing {
    window: usize,
}

impl Smoothing {
    pub fn new(window: usize) -> Self {
        Self { window }
    }

    /// Minimum and maximum of the sliding mean, maintained with an
    /// incremental running sum (subtract the oldest sample, add the
    /// newest), so the cost is O(n) regardless of window size.
    pub fn smoothed_extremes(&self, samples: &[f64]) -> (f64, f64) {
        if samples.is_empty() {
            return (0.0, 0.0);
        }
        let window = self.window.clamp(1, samples.len());
        let mut sum: f64 = samples[..window].iter().sum();
        let mut min = sum / window as f64;
        let mut max = min;
        for i in 0..samples.len() - window {
            sum -= samples[i];
            sum += samples[i + window];
            let mean = sum / window as f64;
            if mean > max {
                max = mean;
            } else if mean < min {
                min = mean;
            }
        }
        (min, max)
    }

    /// Initial amplitude for the fitter, from the smoothed swing. Only a
    /// seed; the amplitude search keeps it solely when it cannot do
    /// better.
    pub fn amplitude_seed(&self, samples: &[f64], rectified: bool) -> i64 {
        let (min, max) = self.smoothed_extremes(samples);
        let scale = if rectified {
            RECTIFIED_SWING_SCALE
        } else {
            COSINE_SWING_SCALE
        };
        (scale * (max - min)) as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Reference implementation: recompute every window mean from scratch.
    fn naive_extremes(samples: &[f64], window: usize) -> (f64, f64) {
        let means: Vec<f64> = samples
            .windows(window)
            .map(|w| w.iter().sum::<f64>() / window as f64)
            .collect();
        let min = means.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = means.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        (min, max)
    }

    #[test]
    fn test_running_sum_matches_naive_windows() {
        let samples: Vec<f64> = (0..200)
            .map(|i| 2000.0 + 500.0 * (i as f64 * 0.13).sin() + (i % 7) as f64)
            .collect();
        let smoothing = Smoothing::new(5);
        let (min, max) = smoothing.smoothed_extremes(&samples);
        let (naive_min, naive_max) = naive_extremes(&samples, 5);
        assert!((min - naive_min).abs() < 1e-9);
        assert!((max - naive_max).abs() < 1e-9);
    }

    #[test]
    fn test_seed_scale_doubles_for_rectified() {
        // Square-ish wave with swing exactly 10 after smoothing window 1.
        let samples = vec![100.0, 110.0, 100.0, 110.0];
        let smoothing = Smoothing::new(1);
        assert_eq!(smoothing.amplitude_seed(&samples, true), 1000);
        assert_eq!(smoothing.amplitude_seed(&samples, false), 500);
    }

    #[test]
    fn test_flat_signal_seeds_zero() {
        let samples = vec![1975.0; 100];
        let smoothing = Smoothing::new(5);
        assert_eq!(smoothing.amplitude_seed(&samples, false), 0);
    }

    #[test]
    fn test_window_wider_than_series_degrades_to_whole_mean() {
        let samples = vec![1.0, 2.0, 3.0];
        let smoothing = Smoothing::new(10);
        let (min, max) = smoothing.smoothed_extremes(&samples);
        assert_eq!(min, max);
        assert!((min - 2.0).abs() < 1e-9);
    }
}
