//! # Sur - Terminal Instrument Tuner
//!
//! Thin display surface over `sur-core`: picks a tuning, starts the engine,
//! and polls it at display cadence, rendering frequency / note / cents on a
//! single status line. Pressing Enter stops the session and releases the
//! microphone.
//!
//! What counts as "in tune" (|cents| < 5) lives here, not in the engine;
//! it is a presentation policy.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use crossbeam_channel::{Receiver, bounded};
use sur_core::TunerError;
use sur_core::engine::{DEFAULT_WINDOW_SIZE, PitchEngine};
use sur_core::tuning::{self, NoteMatch, Tuning, TuningConfig};

/// Poll cadence, roughly one display refresh.
const POLL_INTERVAL: Duration = Duration::from_millis(16);

/// Presentation policy for the "in tune" badge.
const IN_TUNE_CENTS: f32 = 5.0;

#[derive(Parser, Debug)]
#[command(
    name = "sur",
    about = "Real-time instrument tuner for the heritage-instrument catalog",
    version
)]
struct Args {
    /// Built-in tuning preset to tune against
    #[arg(long, default_value = "guitar", conflicts_with = "tuning_file")]
    tuning: String,

    /// Load a tuning from a JSON file ({"name", "notes", "frequencies"})
    #[arg(long)]
    tuning_file: Option<PathBuf>,

    /// Analysis window size in samples (power of two)
    #[arg(long, default_value_t = DEFAULT_WINDOW_SIZE)]
    window_size: usize,

    /// List the built-in tuning presets and exit
    #[arg(long)]
    list_tunings: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    if args.list_tunings {
        for (key, tuning) in tuning::presets() {
            let labels: Vec<&str> = tuning.notes().iter().map(|n| n.name.as_str()).collect();
            println!("{key:<8} {} [{}]", tuning.name(), labels.join(" "));
        }
        return Ok(());
    }

    let tuning = load_tuning(&args)?;
    eprintln!(
        "[MAIN] tuning against '{}' ({} targets)",
        tuning.name(),
        tuning.notes().len()
    );

    let mut engine = PitchEngine::with_window_size(args.window_size)?;
    if let Err(err) = engine.start() {
        if matches!(err, TunerError::PermissionDenied { .. }) {
            eprintln!("[MAIN] please allow microphone access to use the tuner");
        }
        return Err(err.into());
    }

    let stop = stdin_watcher();
    println!("Listening... press Enter to stop.");

    loop {
        if stop.try_recv().is_ok() {
            break;
        }
        match engine.poll()? {
            Some(frequency) => {
                let matched = tuning::find_closest_note(frequency, &tuning)?;
                render(frequency, &matched);
            }
            None => render_waiting(),
        }
        thread::sleep(POLL_INTERVAL);
    }

    engine.stop();
    println!();
    Ok(())
}

/// Resolves the tuning to use: a JSON file if given, otherwise a preset.
fn load_tuning(args: &Args) -> Result<Tuning> {
    if let Some(path) = &args.tuning_file {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading tuning file {}", path.display()))?;
        let config: TuningConfig = serde_json::from_str(&raw)
            .with_context(|| format!("parsing tuning file {}", path.display()))?;
        return Tuning::try_from(config)
            .with_context(|| format!("invalid tuning in {}", path.display()));
    }

    tuning::preset(&args.tuning).cloned().with_context(|| {
        let keys: Vec<&str> = tuning::presets().map(|(key, _)| key).collect();
        format!(
            "unknown tuning preset '{}' (available: {})",
            args.tuning,
            keys.join(", ")
        )
    })
}

/// Watches stdin from a helper thread; a single message means "stop".
fn stdin_watcher() -> Receiver<()> {
    let (sender, receiver) = bounded(1);
    thread::spawn(move || {
        let mut line = String::new();
        let _ = io::stdin().lock().read_line(&mut line);
        let _ = sender.try_send(());
    });
    receiver
}

/// Rewrites the status line with the current estimate and match.
fn render(frequency: f32, matched: &NoteMatch) {
    let status = if matched.cents.abs() < IN_TUNE_CENTS {
        "in tune"
    } else if matched.cents > 0.0 {
        "too sharp"
    } else {
        "too flat"
    };
    print!(
        "\r{frequency:7.1} Hz  {:>4}  {:+7.1} cents  {status:<12}",
        matched.note.name, matched.cents
    );
    let _ = io::stdout().flush();
}

/// Status line while nothing is sounding.
fn render_waiting() {
    print!("\r     --  Hz                         listening... ");
    let _ = io::stdout().flush();
}
