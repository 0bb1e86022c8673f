//! # Musical Tuning Module
//!
//! Target tunings and note arithmetic for the tuner. Handles equal-tempered
//! note naming, cents deviation, and closest-target search against a named
//! tuning (guitar, sitar, violin, or caller-supplied).
//!
//! ## Features
//! - Equal temperament mapping with A4 = 440 Hz
//! - Cents deviation calculations for tuning feedback
//! - Built-in tuning presets matching the instrument catalog
//! - Tuning construction from the parallel-array configuration shape

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use serde::Deserialize;

use crate::error::{TunerError, TunerResult};

/// Reference pitch: A4 in Hz.
pub const A4_FREQUENCY: f32 = 440.0;

/// Chromatic note names, one octave starting at C.
const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// A single target of a tuning: a label and the frequency it should sound at.
///
/// Labels are free-form; sargam names like "S" and "P" are as valid as
/// scientific names like "E2". Duplicate labels within a tuning are allowed.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetNote {
    /// Display label (e.g. "E2", "A4", "S").
    pub name: String,
    /// Target frequency in Hz, always positive.
    pub frequency: f32,
}

/// A named ordered set of target notes an instrument is checked against.
///
/// Never empty: construction rejects an empty note list, so closest-note
/// search always has a candidate.
#[derive(Debug, Clone)]
pub struct Tuning {
    name: String,
    notes: Vec<TargetNote>,
}

impl Tuning {
    /// Builds a tuning, validating that it has at least one note and that
    /// every target frequency is positive and finite.
    pub fn new(name: impl Into<String>, notes: Vec<TargetNote>) -> TunerResult<Self> {
        if notes.is_empty() {
            return Err(TunerError::InvalidArgument {
                message: "a tuning must contain at least one target note".into(),
            });
        }
        for note in &notes {
            if !(note.frequency.is_finite() && note.frequency > 0.0) {
                return Err(TunerError::InvalidArgument {
                    message: format!(
                        "target note '{}' has non-positive frequency {}",
                        note.name, note.frequency
                    ),
                });
            }
        }
        Ok(Self { name: name.into(), notes })
    }

    /// Builds a tuning from the parallel-array shape used by the catalog's
    /// tuner configuration (`notes[i]` labels `frequencies[i]`).
    pub fn from_parallel(
        name: impl Into<String>,
        notes: &[&str],
        frequencies: &[f32],
    ) -> TunerResult<Self> {
        if notes.len() != frequencies.len() {
            return Err(TunerError::InvalidArgument {
                message: format!(
                    "notes and frequencies must be parallel: {} labels vs {} frequencies",
                    notes.len(),
                    frequencies.len()
                ),
            });
        }
        let notes = notes
            .iter()
            .zip(frequencies)
            .map(|(&name, &frequency)| TargetNote { name: name.to_string(), frequency })
            .collect();
        Self::new(name, notes)
    }

    /// Display name of the tuning (e.g. "Guitar Standard").
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Target notes in tuning order.
    pub fn notes(&self) -> &[TargetNote] {
        &self.notes
    }
}

/// Wire shape of a tuning configuration: `notes` and `frequencies` are
/// parallel arrays of equal length.
#[derive(Debug, Clone, Deserialize)]
pub struct TuningConfig {
    /// Display name of the tuning.
    pub name: String,
    /// Note labels, parallel to `frequencies`.
    pub notes: Vec<String>,
    /// Target frequencies in Hz, parallel to `notes`.
    pub frequencies: Vec<f32>,
}

impl TryFrom<TuningConfig> for Tuning {
    type Error = TunerError;

    fn try_from(config: TuningConfig) -> TunerResult<Self> {
        let labels: Vec<&str> = config.notes.iter().map(String::as_str).collect();
        Tuning::from_parallel(config.name, &labels, &config.frequencies)
    }
}

/// Built-in tuning presets referenced by the instrument catalog.
static PRESETS: Lazy<BTreeMap<&'static str, Tuning>> = Lazy::new(|| {
    let mut presets = BTreeMap::new();
    // expect is safe here: the preset tables are compile-time data with
    // matching lengths and positive frequencies.
    presets.insert(
        "guitar",
        Tuning::from_parallel(
            "Guitar Standard",
            &["E2", "A2", "D3", "G3", "B3", "E4"],
            &[82.41, 110.00, 146.83, 196.00, 246.94, 329.63],
        )
        .expect("guitar preset is valid"),
    );
    presets.insert(
        "sitar",
        Tuning::from_parallel(
            "Sitar Standard",
            &["S", "P", "S", "P", "S"],
            &[110.00, 196.00, 220.00, 392.00, 440.00],
        )
        .expect("sitar preset is valid"),
    );
    presets.insert(
        "violin",
        Tuning::from_parallel(
            "Violin Standard",
            &["G3", "D4", "A4", "E5"],
            &[196.00, 293.66, 440.00, 659.25],
        )
        .expect("violin preset is valid"),
    );
    presets
});

/// Looks up a built-in tuning preset by key ("guitar", "sitar", "violin").
pub fn preset(key: &str) -> Option<&'static Tuning> {
    PRESETS.get(key)
}

/// Iterates the built-in presets in key order.
pub fn presets() -> impl Iterator<Item = (&'static str, &'static Tuning)> {
    PRESETS.iter().map(|(&key, tuning)| (key, tuning))
}

/// An absolute frequency resolved to the nearest equal-tempered note.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectedNote {
    /// Chromatic pitch class ("C" through "B").
    pub pitch_class: &'static str,
    /// Octave number in scientific pitch notation (A4 = 440 Hz).
    pub octave: i32,
    /// Deviation from the named note in cents (positive = sharp).
    pub cents: f32,
}

impl DetectedNote {
    /// Scientific pitch name, e.g. "A4" or "C#3".
    pub fn name(&self) -> String {
        format!("{}{}", self.pitch_class, self.octave)
    }
}

/// The target of a tuning closest to a measured frequency.
#[derive(Debug, Clone, PartialEq)]
pub struct NoteMatch {
    /// The matched target note.
    pub note: TargetNote,
    /// Absolute frequency difference |measured - target| in Hz.
    pub difference: f32,
    /// Deviation from the matched target in cents (positive = sharp).
    ///
    /// This is measured against the target's own frequency, not against
    /// equal temperament; do not conflate it with [`DetectedNote::cents`].
    pub cents: f32,
}

/// Calculates the deviation of `freq` from `target_freq` in cents.
///
/// 100 cents = 1 semitone, 1200 cents = 1 octave. Positive values indicate
/// sharpness, negative values flatness.
pub fn cents_deviation(freq: f32, target_freq: f32) -> f32 {
    1200.0 * (freq / target_freq).log2()
}

/// Maps an absolute frequency to the nearest equal-tempered note.
///
/// Uses A4 = 440 Hz, anchored at C0 = 440 * 2^(-4.75). The note is the
/// nearest semitone; `cents` is the remainder, so it always lies in
/// [-50, 50].
///
/// # Errors
/// `InvalidArgument` for non-positive or non-finite frequencies.
pub fn frequency_to_note(frequency: f32) -> TunerResult<DetectedNote> {
    if !(frequency.is_finite() && frequency > 0.0) {
        return Err(TunerError::InvalidArgument {
            message: format!("frequency must be positive, got {frequency}"),
        });
    }

    let c0 = A4_FREQUENCY * 2.0_f32.powf(-4.75);
    let half_steps = 12.0 * (frequency / c0).log2();
    // Round to the nearest semitone first, then split into octave and pitch
    // class; splitting before rounding misnames frequencies just below an
    // octave boundary (e.g. a sharp B).
    let nearest = half_steps.round();
    let semitone = nearest as i32;

    Ok(DetectedNote {
        pitch_class: NOTE_NAMES[semitone.rem_euclid(12) as usize],
        octave: semitone.div_euclid(12),
        cents: (half_steps - nearest) * 100.0,
    })
}

/// Finds the target note of `tuning` closest in frequency to `frequency`.
///
/// Linear scan in tuning order with a strict running minimum, so when two
/// targets are exactly equidistant the FIRST one in tuning order wins. The
/// returned cents are relative to the matched target's frequency.
///
/// # Errors
/// `InvalidArgument` for non-positive or non-finite frequencies.
pub fn find_closest_note(frequency: f32, tuning: &Tuning) -> TunerResult<NoteMatch> {
    if !(frequency.is_finite() && frequency > 0.0) {
        return Err(TunerError::InvalidArgument {
            message: format!("frequency must be positive, got {frequency}"),
        });
    }

    let mut best: Option<&TargetNote> = None;
    let mut min_difference = f32::INFINITY;
    for note in tuning.notes() {
        let difference = (frequency - note.frequency).abs();
        if difference < min_difference {
            min_difference = difference;
            best = Some(note);
        }
    }

    // Tuning construction guarantees at least one note.
    let note = best.expect("tuning is never empty");
    Ok(NoteMatch {
        note: note.clone(),
        difference: min_difference,
        cents: cents_deviation(frequency, note.frequency),
    })
}
