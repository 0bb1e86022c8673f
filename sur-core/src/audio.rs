//! # Audio Capture Module
//!
//! Real-time microphone capture using CPAL (Cross-Platform Audio Library).
//! Selects an input device, opens a mono float stream near 44.1 kHz, and
//! hands sample chunks to the engine over a bounded channel.
//!
//! ## Features
//! - Automatic input device and configuration selection
//! - Permission and device failures mapped to the tuner error taxonomy
//! - Scoped device ownership: dropping the returned stream releases capture

use cpal::SupportedStreamConfigRange;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::Sender;

use crate::error::{TunerError, TunerResult};

/// Preferred capture sample rate in Hz.
const TARGET_SAMPLE_RATE: u32 = 44_100;

/// Starts audio capture from the default input device.
///
/// The stream's callback forwards every chunk of samples to `sender` with
/// `try_send`, dropping chunks when the consumer lags; the engine only ever
/// wants the latest window, so backpressure is unnecessary.
///
/// # Returns
/// * `Ok((stream, sample_rate))` - Live stream handle and its sample rate.
///   The handle owns the device; dropping it stops capture and releases the
///   device on every path.
/// * `Err(PermissionDenied)` - The environment refused microphone access
/// * `Err(DeviceUnavailable)` - No compatible input device or format
pub fn start_capture(sender: Sender<Vec<f32>>) -> TunerResult<(cpal::Stream, u32)> {
    let host = cpal::default_host();
    let device = host.default_input_device().ok_or_else(|| TunerError::DeviceUnavailable {
        reason: "no input device available".into(),
    })?;

    let device_name = device.name().unwrap_or_else(|_| "<unknown>".into());
    eprintln!("[AUDIO] using input device: {device_name}");

    let configs = device
        .supported_input_configs()
        .map_err(classify_configs_error)?
        .collect::<Vec<_>>();
    let supported_config =
        find_supported_config(configs, TARGET_SAMPLE_RATE).ok_or_else(|| {
            TunerError::DeviceUnavailable {
                reason: format!("device '{device_name}' has no mono f32 input format"),
            }
        })?;

    // Clamp into the supported range; with_sample_rate panics outside it.
    let rate = TARGET_SAMPLE_RATE.clamp(
        supported_config.min_sample_rate().0,
        supported_config.max_sample_rate().0,
    );
    let config = supported_config.with_sample_rate(cpal::SampleRate(rate));

    let sample_rate = config.sample_rate().0;
    let config: cpal::StreamConfig = config.into();

    eprintln!("[AUDIO] selected sample rate: {sample_rate} Hz");

    let err_fn = |err| eprintln!("[AUDIO] stream error: {err}");

    let stream = device
        .build_input_stream(
            &config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                // Drop the chunk if the engine is behind; the next poll only
                // needs the freshest samples.
                let _ = sender.try_send(data.to_vec());
            },
            err_fn,
            None,
        )
        .map_err(classify_build_error)?;

    stream.play().map_err(classify_play_error)?;

    Ok((stream, sample_rate))
}

/// Finds the best supported input configuration for the target sample rate:
/// mono, 32-bit float, range closest to the target.
fn find_supported_config(
    configs: Vec<SupportedStreamConfigRange>,
    target_rate: u32,
) -> Option<SupportedStreamConfigRange> {
    configs
        .into_iter()
        .filter(|c| c.channels() == 1 && c.sample_format() == cpal::SampleFormat::F32)
        .min_by_key(|c| {
            let min_diff = (c.min_sample_rate().0 as i32 - target_rate as i32).abs();
            let max_diff = (c.max_sample_rate().0 as i32 - target_rate as i32).abs();
            min_diff.min(max_diff)
        })
}

/// Backends report permission refusals as free-form descriptions; match the
/// usual phrasings so the caller can show the "allow microphone access" hint.
fn looks_like_permission_denial(description: &str) -> bool {
    let description = description.to_ascii_lowercase();
    description.contains("permission")
        || description.contains("denied")
        || description.contains("not authorized")
        || description.contains("access")
}

fn classify_configs_error(err: cpal::SupportedStreamConfigsError) -> TunerError {
    match err {
        cpal::SupportedStreamConfigsError::DeviceNotAvailable => TunerError::DeviceUnavailable {
            reason: "input device disappeared while querying formats".into(),
        },
        cpal::SupportedStreamConfigsError::BackendSpecific { err }
            if looks_like_permission_denial(&err.description) =>
        {
            TunerError::PermissionDenied { reason: err.description }
        }
        other => TunerError::DeviceUnavailable { reason: other.to_string() },
    }
}

fn classify_build_error(err: cpal::BuildStreamError) -> TunerError {
    match err {
        cpal::BuildStreamError::DeviceNotAvailable => TunerError::DeviceUnavailable {
            reason: "input device disappeared before the stream could open".into(),
        },
        cpal::BuildStreamError::BackendSpecific { err }
            if looks_like_permission_denial(&err.description) =>
        {
            TunerError::PermissionDenied { reason: err.description }
        }
        other => TunerError::DeviceUnavailable { reason: other.to_string() },
    }
}

fn classify_play_error(err: cpal::PlayStreamError) -> TunerError {
    match err {
        cpal::PlayStreamError::DeviceNotAvailable => TunerError::DeviceUnavailable {
            reason: "input device disappeared before capture could start".into(),
        },
        cpal::PlayStreamError::BackendSpecific { err }
            if looks_like_permission_denial(&err.description) =>
        {
            TunerError::PermissionDenied { reason: err.description }
        }
        other => TunerError::DeviceUnavailable { reason: other.to_string() },
    }
}
