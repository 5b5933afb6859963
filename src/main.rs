use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use clap::{Parser, Subcommand};
use crossbeam_channel::{Receiver, RecvTimeoutError};
use thiserror::Error;
use tracing_subscriber::EnvFilter;

use sythm::audio::{Clock, OfflineOutput};
use sythm::config::SythmConfig;
use sythm::dsl::{parse_source, to_source, ParseError, Program};
use sythm::engine::AudioEngine;
use sythm::error::{Located, RuntimeError};
use sythm::instrument::available_instruments;
use sythm::interpreter::{ExecutionOutcome, Interpreter, InterpreterOptions, PlaybackEvent};

#[derive(Parser)]
#[command(name = "sythm", version, about = "Compile and play Sythm music programs")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play a program through the default audio device
    Play {
        file: PathBuf,
        /// Starting tempo, overriding the config
        #[arg(long)]
        bpm: Option<f64>,
    },
    /// Parse a program and report the first error
    Check {
        file: PathBuf,
        /// Also run it against an offline output to catch runtime errors
        #[arg(long)]
        simulate: bool,
    },
    /// Print a program in canonical form
    Fmt { file: PathBuf },
    /// List the available instruments
    Instruments,
}

#[derive(Debug, Error)]
enum CliError {
    #[error("{}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: ParseError,
    },
    #[error("{}: {source}", path.display())]
    Runtime {
        path: PathBuf,
        #[source]
        source: Located<RuntimeError>,
    },
    #[error("{}: {count} runtime error(s)", path.display())]
    Reported { path: PathBuf, count: usize },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Play { file, bpm } => play(&file, bpm),
        Commands::Check { file, simulate } => check(&file, simulate),
        Commands::Fmt { file } => fmt(&file),
        Commands::Instruments => {
            for (name, description) in available_instruments() {
                println!("{name:<10} {description}");
            }
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        process::exit(1);
    }
}

fn load_config() -> SythmConfig {
    SythmConfig::load().unwrap_or_else(|e| {
        tracing::warn!("{e}; using defaults");
        SythmConfig::default()
    })
}

fn load_program(path: &Path) -> Result<Program, CliError> {
    let source = std::fs::read_to_string(path).map_err(|source| CliError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_source(&source).map_err(|source| CliError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn play(path: &Path, bpm: Option<f64>) -> Result<(), CliError> {
    let program = load_program(path)?;
    let config = load_config();

    let mut engine = AudioEngine::new()
        .seed(config.seed)
        .sample_rate(config.sample_rate);
    engine.set_master_volume(config.master_volume);
    let mut options = InterpreterOptions::from(&config);
    if let Some(bpm) = bpm {
        options.bpm = bpm;
    }

    let interp = Arc::new(Interpreter::new(engine, options));
    let handler = Arc::clone(&interp);
    if let Err(e) = ctrlc::set_handler(move || handler.stop()) {
        tracing::warn!("could not install Ctrl-C handler: {e}");
    }

    let events = interp.subscribe();
    let runner = Arc::clone(&interp);
    let handle = thread::spawn(move || runner.execute(&program));
    let reported = print_events(&events, || handle.is_finished());
    let result = handle
        .join()
        .unwrap_or_else(|panic| std::panic::resume_unwind(panic));
    interp.dispose();

    finish(path, result, &reported)
}

/// Print events until `done` turns true and the channel is drained. Error
/// events are collected instead of printed.
fn print_events(
    events: &Receiver<PlaybackEvent>,
    done: impl Fn() -> bool,
) -> Vec<PlaybackEvent> {
    let mut reported = Vec::new();
    let mut handle = |event: PlaybackEvent| match event {
        PlaybackEvent::Error { .. } => reported.push(event),
        event => println!("{event}"),
    };
    loop {
        match events.recv_timeout(Duration::from_millis(50)) {
            Ok(event) => handle(event),
            Err(RecvTimeoutError::Timeout) if done() => break,
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    for event in events.try_iter() {
        handle(event);
    }
    reported
}

/// Turn a finished run into the command result. A fatal error is both
/// returned and emitted, so reported events only matter on success.
fn finish(
    path: &Path,
    result: Result<ExecutionOutcome, Located<RuntimeError>>,
    reported: &[PlaybackEvent],
) -> Result<(), CliError> {
    match result {
        Err(source) => Err(CliError::Runtime {
            path: path.to_path_buf(),
            source,
        }),
        Ok(_) if !reported.is_empty() => {
            for event in reported {
                eprintln!("{event}");
            }
            Err(CliError::Reported {
                path: path.to_path_buf(),
                count: reported.len(),
            })
        }
        Ok(ExecutionOutcome::Stopped) => {
            eprintln!("stopped");
            Ok(())
        }
        Ok(ExecutionOutcome::Completed) => Ok(()),
    }
}

fn check(path: &Path, simulate: bool) -> Result<(), CliError> {
    let program = load_program(path)?;
    if !simulate {
        println!("{}: ok", path.display());
        return Ok(());
    }

    let config = load_config();
    let output = OfflineOutput::new(config.sample_rate.unwrap_or(44_100));
    let mut engine = AudioEngine::with_output(Box::new(output.clone())).seed(config.seed);
    engine.set_master_volume(config.master_volume);
    let interp = Interpreter::new(engine, InterpreterOptions::from(&config));
    let events = interp.subscribe();

    let result = interp.execute(&program);
    let reported: Vec<PlaybackEvent> = events
        .try_iter()
        .filter(|e| matches!(e, PlaybackEvent::Error { .. }))
        .collect();
    let ok = result.is_ok() && reported.is_empty();
    finish(path, result, &reported)?;
    if ok {
        println!(
            "{}: ok, {} sounds over {:.2}s",
            path.display(),
            output.scheduled().len(),
            output.manual_clock().now()
        );
    }
    Ok(())
}

fn fmt(path: &Path) -> Result<(), CliError> {
    let program = load_program(path)?;
    print!("{}", to_source(&program));
    Ok(())
}
