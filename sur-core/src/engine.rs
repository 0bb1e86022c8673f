//! # Pitch Engine Module
//!
//! The session state machine that ties capture to estimation. An engine is
//! either idle or holds one live capture session; an external display loop
//! polls it once per refresh and renders the result.
//!
//! Scheduling is cooperative: `poll()` runs the full correlation scan before
//! returning, so callers wanting low per-frame cost should keep the window
//! size bounded. The default of 4096 samples balances pitch resolution
//! against scan cost.

use crossbeam_channel::Receiver;

use crate::audio;
use crate::error::{TunerError, TunerResult};
use crate::pitch;
use crate::tuning::{self, NoteMatch, Tuning};

/// Default analysis window size in samples (power of two).
pub const DEFAULT_WINDOW_SIZE: usize = 4096;

/// A live capture session: the device handle, the sample feed, and the
/// rolling analysis window.
///
/// Dropping the session drops the stream, which releases the input device.
struct CaptureSession {
    /// Held only for its Drop; `None` in tests, which have no device.
    _stream: Option<cpal::Stream>,
    frames: Receiver<Vec<f32>>,
    sample_rate: u32,
    /// Fixed-length window, refreshed in place and never resized.
    window: Vec<f32>,
}

impl CaptureSession {
    /// Drains every pending chunk into the rolling window so the next
    /// estimate sees the latest samples. Stale or partial data right after
    /// session start settles within a few polls.
    fn refresh_window(&mut self) {
        while let Ok(chunk) = self.frames.try_recv() {
            push_samples(&mut self.window, &chunk);
        }
    }
}

/// Shifts `chunk` into the tail of `window`, discarding the oldest samples.
fn push_samples(window: &mut [f32], chunk: &[f32]) {
    let len = window.len();
    if chunk.len() >= len {
        window.copy_from_slice(&chunk[chunk.len() - len..]);
    } else {
        window.copy_within(chunk.len().., 0);
        window[len - chunk.len()..].copy_from_slice(chunk);
    }
}

/// Owns a rolling audio buffer and runs the autocorrelation estimator on
/// demand.
///
/// Lifecycle: `Idle -> Capturing -> Idle`. [`PitchEngine::start`] opens the
/// microphone and enters `Capturing`; [`PitchEngine::stop`] releases it and
/// is a no-op when already idle. [`PitchEngine::poll`] is valid only while
/// capturing and fails fast with `InvalidState` otherwise, so a
/// mis-sequenced caller cannot mistake its own bug for silence.
///
/// One session per engine instance; instances are fully independent.
pub struct PitchEngine {
    window_size: usize,
    silence_threshold: f32,
    /// `None` = idle, `Some` = capturing.
    session: Option<CaptureSession>,
}

impl PitchEngine {
    /// Creates an idle engine with the default window size.
    pub fn new() -> Self {
        Self {
            window_size: DEFAULT_WINDOW_SIZE,
            silence_threshold: pitch::SILENCE_THRESHOLD,
            session: None,
        }
    }

    /// Creates an idle engine with a custom analysis window size.
    ///
    /// # Errors
    /// `InvalidArgument` unless `window_size` is a power of two of at least
    /// two samples.
    pub fn with_window_size(window_size: usize) -> TunerResult<Self> {
        if window_size < 2 || !window_size.is_power_of_two() {
            return Err(TunerError::InvalidArgument {
                message: format!("window size must be a power of two >= 2, got {window_size}"),
            });
        }
        Ok(Self {
            window_size,
            silence_threshold: pitch::SILENCE_THRESHOLD,
            session: None,
        })
    }

    /// Whether a capture session is live.
    pub fn is_capturing(&self) -> bool {
        self.session.is_some()
    }

    /// Sample rate of the live session, if capturing.
    pub fn sample_rate(&self) -> Option<u32> {
        self.session.as_ref().map(|s| s.sample_rate)
    }

    /// Opens the default input device and begins capturing.
    ///
    /// On failure the engine stays idle and any partially acquired device
    /// handle is dropped; the caller may retry.
    ///
    /// # Errors
    /// * `InvalidState` if a session is already live
    /// * `PermissionDenied` / `DeviceUnavailable` from device acquisition
    pub fn start(&mut self) -> TunerResult<()> {
        if self.session.is_some() {
            return Err(TunerError::InvalidState {
                message: "start() called while already capturing".into(),
            });
        }

        let (sender, frames) = crossbeam_channel::bounded(32);
        let (stream, sample_rate) = audio::start_capture(sender)?;
        self.session = Some(CaptureSession {
            _stream: Some(stream),
            frames,
            sample_rate,
            window: vec![0.0; self.window_size],
        });
        eprintln!("[ENGINE] capture started at {sample_rate} Hz");
        Ok(())
    }

    /// Stops capturing, releasing the input device and discarding buffered
    /// samples. Idempotent: stopping an idle engine is a no-op.
    pub fn stop(&mut self) {
        if self.session.take().is_some() {
            eprintln!("[ENGINE] capture stopped");
        }
    }

    /// Reads the latest window and runs the estimator.
    ///
    /// `Ok(None)` means "no pitch detected" and is a normal per-tick
    /// outcome, not an error.
    ///
    /// # Errors
    /// `InvalidState` when the engine is not capturing.
    pub fn poll(&mut self) -> TunerResult<Option<f32>> {
        let session = self.session.as_mut().ok_or_else(|| TunerError::InvalidState {
            message: "poll() requires an active capture session".into(),
        })?;
        session.refresh_window();
        Ok(pitch::detect_pitch(
            &session.window,
            session.sample_rate,
            self.silence_threshold,
        ))
    }

    /// Polls and, when a pitch is present, matches it against `tuning`.
    pub fn poll_match(&mut self, tuning: &Tuning) -> TunerResult<Option<NoteMatch>> {
        match self.poll()? {
            Some(frequency) => Ok(Some(tuning::find_closest_note(frequency, tuning)?)),
            None => Ok(None),
        }
    }
}

impl Default for PitchEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::Sender;

    /// Engine with an injected session fed by the returned sender instead of
    /// a real device.
    fn capturing_engine(window_size: usize, sample_rate: u32) -> (PitchEngine, Sender<Vec<f32>>) {
        let (sender, frames) = crossbeam_channel::bounded(32);
        let mut engine = PitchEngine::with_window_size(window_size).unwrap();
        engine.session = Some(CaptureSession {
            _stream: None,
            frames,
            sample_rate,
            window: vec![0.0; window_size],
        });
        (engine, sender)
    }

    fn tiled_sine(period: usize, len: usize) -> Vec<f32> {
        let table: Vec<f32> = (0..period)
            .map(|j| 0.8 * (2.0 * std::f32::consts::PI * j as f32 / period as f32).sin())
            .collect();
        (0..len).map(|i| table[i % period]).collect()
    }

    #[test]
    fn poll_before_start_is_invalid_state() {
        let mut engine = PitchEngine::new();
        assert!(matches!(
            engine.poll(),
            Err(TunerError::InvalidState { .. })
        ));
    }

    #[test]
    fn stop_on_idle_engine_is_a_noop() {
        let mut engine = PitchEngine::new();
        engine.stop();
        engine.stop();
        assert!(!engine.is_capturing());
    }

    #[test]
    fn start_while_capturing_is_invalid_state() {
        let (mut engine, _sender) = capturing_engine(4096, 44_100);
        assert!(matches!(
            engine.start(),
            Err(TunerError::InvalidState { .. })
        ));
        // The live session survives the failed start.
        assert!(engine.is_capturing());
    }

    #[test]
    fn stop_releases_the_session() {
        let (mut engine, _sender) = capturing_engine(4096, 44_100);
        assert!(engine.is_capturing());
        engine.stop();
        assert!(!engine.is_capturing());
        assert!(matches!(
            engine.poll(),
            Err(TunerError::InvalidState { .. })
        ));
    }

    #[test]
    fn poll_estimates_from_the_latest_window() {
        let (mut engine, sender) = capturing_engine(4096, 44_100);
        // Nothing captured yet: the zeroed window reads as silence.
        assert_eq!(engine.poll().unwrap(), None);

        // 44100 / 100 = 441 Hz.
        sender.send(tiled_sine(100, 4096)).unwrap();
        let freq = engine.poll().unwrap().expect("pitch expected");
        assert!((freq - 441.0).abs() < 441.0 * 0.02);
    }

    #[test]
    fn poll_match_pairs_the_estimate_with_a_target() {
        let (mut engine, sender) = capturing_engine(4096, 44_100);
        sender.send(tiled_sine(100, 4096)).unwrap();

        let tuning = tuning::preset("guitar").unwrap();
        let matched = engine.poll_match(tuning).unwrap().expect("match expected");
        // 441 Hz is nearest the high E string and reads slightly sharp.
        assert_eq!(matched.note.name, "E4");
        assert!(matched.cents > 0.0);
    }

    #[test]
    fn newer_chunks_overwrite_older_samples() {
        let mut window = vec![0.0_f32; 8];
        push_samples(&mut window, &[1.0, 2.0, 3.0]);
        assert_eq!(window, [0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 2.0, 3.0]);

        push_samples(&mut window, &[4.0; 10]);
        assert_eq!(window, [4.0; 8]);
    }

    #[test]
    fn window_size_must_be_a_power_of_two() {
        assert!(matches!(
            PitchEngine::with_window_size(3000),
            Err(TunerError::InvalidArgument { .. })
        ));
        assert!(matches!(
            PitchEngine::with_window_size(1),
            Err(TunerError::InvalidArgument { .. })
        ));
        assert!(PitchEngine::with_window_size(2048).is_ok());
    }
}
