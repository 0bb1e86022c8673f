// sur-core/src/lib.rs

//! The core logic for the instrument tuner used by the heritage-instrument
//! catalog. This crate is responsible for audio capture, pitch estimation,
//! and tuning calculations. It is completely headless and contains no UI
//! code.

pub mod audio;
pub mod engine;
pub mod error;
pub mod pitch;
pub mod tuning;

pub use engine::PitchEngine;
pub use error::{TunerError, TunerResult};
pub use tuning::{NoteMatch, TargetNote, Tuning};
