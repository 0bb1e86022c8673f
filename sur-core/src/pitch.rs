//! # Pitch Estimation Module
//!
//! Implements the difference-based autocorrelation estimator used by the
//! tuner. The signal is compared against lagged copies of itself; the lag
//! with the strongest similarity gives the period of the fundamental.
//!
//! ## Features
//! - RMS noise gate to reject silence before the expensive scan
//! - Ascending-peak lock to avoid octave jitter from flat correlation regions
//! - `None` as the universal "no pitch" outcome (never an error)

/// Minimum RMS amplitude for a window to be considered signal rather than
/// noise floor. Samples are normalized to [-1, 1].
pub const SILENCE_THRESHOLD: f32 = 0.01;

/// A lag is only considered a candidate once its correlation score clears
/// this gate. This is the filter that actually rejects weak periodicity.
const CORRELATION_THRESHOLD: f32 = 0.9;

/// Floor applied to the best score after the scan. Deliberately permissive;
/// the 0.9 gate above does the real work.
const MIN_BEST_CORRELATION: f32 = 0.01;

/// Estimates the fundamental frequency of `window` via autocorrelation.
///
/// The correlation score at each lag is `1 - mean(|x[i] - x[i + lag]|)` over
/// the first half of the window, so an exact repeat scores near 1. A lag is
/// accepted as the new best only when its score exceeds the gate, the
/// previous lag's score, and the best seen so far; requiring an ascending
/// approach keeps the estimator locked onto a genuine local peak.
///
/// # Arguments
/// * `window` - Time-domain samples, normalized to [-1, 1]
/// * `sample_rate` - Sample rate in Hz
/// * `silence_threshold` - Minimum RMS amplitude for pitch detection
///
/// # Returns
/// * `Some(frequency)` - Detected fundamental in Hz
/// * `None` - No pitch: silence, weak correlation, or a fundamental whose
///   period does not fit within half the window (a resolution limit of the
///   window size, not a failure)
pub fn detect_pitch(window: &[f32], sample_rate: u32, silence_threshold: f32) -> Option<f32> {
    let size = window.len();
    let max_lag = size / 2;
    // A window shorter than 2 samples has no candidate lag at all.
    if max_lag < 1 {
        return None;
    }

    // Noise gate: skip the O(n^2) scan entirely on silence.
    let rms = (window.iter().map(|&s| s * s).sum::<f32>() / size as f32).sqrt();
    if rms < silence_threshold {
        return None;
    }

    let mut best_lag: Option<usize> = None;
    let mut best_correlation = 0.0_f32;
    // Starts at 1.0 so a monotonically decaying curve (e.g. a near-constant
    // signal) never presents an ascending edge.
    let mut last_correlation = 1.0_f32;

    for lag in 1..max_lag {
        let mut diff = 0.0_f32;
        for i in 0..max_lag {
            diff += (window[i] - window[i + lag]).abs();
        }
        let correlation = 1.0 - diff / max_lag as f32;

        if correlation > CORRELATION_THRESHOLD
            && correlation > last_correlation
            && correlation > best_correlation
        {
            best_correlation = correlation;
            best_lag = Some(lag);
        }

        last_correlation = correlation;
    }

    match best_lag {
        Some(lag) if best_correlation > MIN_BEST_CORRELATION => {
            Some(sample_rate as f32 / lag as f32)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Builds a window by tiling one exact period of a sine, so the signal
    /// repeats bitwise at multiples of `period` and the winning lag is
    /// unambiguous.
    fn tiled_sine(period: usize, amplitude: f32, len: usize) -> Vec<f32> {
        let table: Vec<f32> = (0..period)
            .map(|j| amplitude * (2.0 * std::f32::consts::PI * j as f32 / period as f32).sin())
            .collect();
        (0..len).map(|i| table[i % period]).collect()
    }

    #[test]
    fn detects_sine_period() {
        // 44100 / 100 = 441 Hz, period fits easily within half the window.
        let window = tiled_sine(100, 0.8, 4096);
        let freq = detect_pitch(&window, 44100, SILENCE_THRESHOLD).expect("pitch expected");
        assert!((freq - 441.0).abs() < 441.0 * 0.02, "estimate {freq} too far from 441 Hz");
    }

    #[test]
    fn detects_lower_sine_period() {
        // 44100 / 150 = 294 Hz.
        let window = tiled_sine(150, 0.5, 4096);
        let freq = detect_pitch(&window, 44100, SILENCE_THRESHOLD).expect("pitch expected");
        assert!((freq - 294.0).abs() < 294.0 * 0.02, "estimate {freq} too far from 294 Hz");
    }

    #[test]
    fn silence_yields_no_pitch() {
        let window = vec![0.0_f32; 4096];
        assert_eq!(detect_pitch(&window, 44100, SILENCE_THRESHOLD), None);
    }

    #[test]
    fn low_amplitude_signal_is_gated() {
        // Below the 0.01 RMS gate even though it is periodic.
        let window = tiled_sine(100, 0.005, 4096);
        assert_eq!(detect_pitch(&window, 44100, SILENCE_THRESHOLD), None);
    }

    #[test]
    fn sub_resolution_fundamental_yields_no_pitch() {
        // 10 Hz at 44.1 kHz has a 4410-sample period, longer than half the
        // window; undetectable by design.
        let table: Vec<f32> = (0..4410)
            .map(|j| 0.8 * (2.0 * std::f32::consts::PI * j as f32 / 4410.0).sin())
            .collect();
        let window: Vec<f32> = (0..4096).map(|i| table[i]).collect();
        assert_eq!(detect_pitch(&window, 44100, SILENCE_THRESHOLD), None);
    }

    #[test]
    fn tiny_window_yields_no_pitch() {
        assert_eq!(detect_pitch(&[0.5], 44100, SILENCE_THRESHOLD), None);
        assert_eq!(detect_pitch(&[], 44100, SILENCE_THRESHOLD), None);
    }

    #[test]
    fn constant_signal_yields_no_pitch() {
        // Loud DC offset: passes the RMS gate but has no ascending peak.
        let window = vec![0.5_f32; 4096];
        assert_eq!(detect_pitch(&window, 44100, SILENCE_THRESHOLD), None);
    }
}
