pub mod config;
pub mod context;
pub mod layers;

pub use context::{detect_context, ExecutionContext};
pub use layers::console::ConsoleOutput;

use crate::cli::Command;
use crate::logging::config::{LoggingConfig, LoggingSection};
use crate::logging::layers::{console, file, opentelemetry, BoxLayer};
use crate::Result;
use anyhow::{anyhow, Context};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::registry::Registry;

static LOGGER_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Guards that keep logging sinks active for the lifetime of the process.
pub struct LoggingGuard {
    _file_guard: Option<tracing_appender::non_blocking::WorkerGuard>,
    _otel_guard: Option<opentelemetry::OpenTelemetryGuard>,
    console_output: ConsoleOutput,
    log_file_path: Option<PathBuf>,
}

impl LoggingGuard {
    /// Returns the console output configuration used during initialization.
    pub fn console_output(&self) -> ConsoleOutput {
        self.console_output
    }

    /// Returns the log file path backed by the file sink, when enabled.
    pub fn log_file_path(&self) -> Option<&Path> {
        self.log_file_path.as_deref()
    }
}

/// Initialize the logging framework for the provided CLI command.
///
/// `RUST_LOG` takes precedence over `logging.default_level`. Errors when
/// invoked more than once per process.
pub fn init(command: &Command, section: Option<&LoggingSection>) -> Result<LoggingGuard> {
    if LOGGER_INITIALIZED
        .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
        .is_err()
    {
        return Err(anyhow!("logging already initialized"));
    }

    let context = detect_context(command);
    let config = LoggingConfig::load(section)?;

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.default_level))
        .context("failed to configure tracing level")?;

    let mut layers: Vec<BoxLayer<Registry>> = Vec::new();

    let console_output = console::select_console_output(context, config.console_output);
    layers.push(console::console_layer(console_output));

    let (file_guard, log_file_path) = if config.enable_file {
        let path = file::log_file_path(&config)?;
        let (layer, guard) = file::file_layer(&path)?;
        layers.push(layer);
        (Some(guard), Some(path))
    } else {
        (None, None)
    };

    let mut otel_warning = None;
    let otel_guard = if config.opentelemetry.enabled {
        match opentelemetry::build_opentelemetry_layer(&config.opentelemetry) {
            Ok((layer, guard)) => {
                layers.push(layer);
                Some(guard)
            }
            Err(err) => {
                otel_warning = Some(err);
                None
            }
        }
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(layers)
        .with(env_filter)
        .try_init()
        .context("failed to install tracing subscriber")?;

    if let Some(err) = otel_warning {
        tracing::warn!("OpenTelemetry disabled: {}", err);
    }

    Ok(LoggingGuard {
        _file_guard: file_guard,
        _otel_guard: otel_guard,
        console_output,
        log_file_path,
    })
}
