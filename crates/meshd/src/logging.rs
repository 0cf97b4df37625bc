//! Logging setup for meshd.
//!
//! Console output is filtered by `RUST_LOG` (default `info`). On top of that
//! the daemon keeps a debug log file, truncated at every start. The file
//! only receives ERROR lines (plus the startup lines) unless debug logging
//! is enabled, in which case it gets everything from DEBUG up for the
//! daemon's own targets.
//!
//! `DebugLog` is built once in `main`, installed as the global subscriber
//! and then handed to the server so the health route can report it.

use crate::config::LoggingConfig;
use serde::Serialize;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::level_filters::LevelFilter;
use tracing::{info, warn, Subscriber};
use tracing_subscriber::filter::Targets;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{fmt, EnvFilter, Layer};

/// Used when the configured path cannot be created, relative to the
/// working directory.
pub const FALLBACK_LOG_PATH: &str = "logs/app-debug.log";

/// Target of the startup lines, admitted by the file filter at any setting
pub const STARTUP_TARGET: &str = "meshd::startup";

/// Snapshot reported by the health endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DebugLogState {
    pub path: Option<PathBuf>,
    pub enabled: bool,
    pub writable: bool,
}

/// Debug log file sink
pub struct DebugLog {
    file: Option<Arc<File>>,
    path: Option<PathBuf>,
    enabled: bool,
    /// Primary path and the reason it was skipped
    fell_back_from: Option<(PathBuf, String)>,
}

impl DebugLog {
    /// Open the configured log file, falling back to [`FALLBACK_LOG_PATH`]
    pub fn open(config: &LoggingConfig) -> Self {
        Self::open_with_fallback(config, Path::new(FALLBACK_LOG_PATH))
    }

    pub fn open_with_fallback(config: &LoggingConfig, fallback: &Path) -> Self {
        let primary = config.debug_log_path.as_path();

        let primary_err = match create_truncated(primary) {
            Ok(file) => return Self::with_file(file, primary, config.debug_enabled, None),
            Err(e) => e,
        };
        eprintln!(
            "meshd: could not initialize debug log at {}: {}",
            primary.display(),
            primary_err
        );

        if fallback != primary {
            match create_truncated(fallback) {
                Ok(file) => {
                    let reason = Some((primary.to_path_buf(), primary_err.to_string()));
                    return Self::with_file(file, fallback, config.debug_enabled, reason);
                }
                Err(e) => eprintln!(
                    "meshd: could not initialize debug log at {}: {}",
                    fallback.display(),
                    e
                ),
            }
        }

        Self {
            file: None,
            path: None,
            enabled: config.debug_enabled,
            fell_back_from: None,
        }
    }

    /// No file sink at all (tests, or when logging is set up elsewhere)
    pub fn disabled() -> Self {
        Self {
            file: None,
            path: None,
            enabled: false,
            fell_back_from: None,
        }
    }

    fn with_file(file: File, path: &Path, enabled: bool, fell_back_from: Option<(PathBuf, String)>) -> Self {
        Self {
            file: Some(Arc::new(file)),
            path: Some(path.to_path_buf()),
            enabled,
            fell_back_from,
        }
    }

    pub fn state(&self) -> DebugLogState {
        DebugLogState {
            path: self.path.clone(),
            enabled: self.enabled,
            writable: self.file.is_some(),
        }
    }

    /// Per-target filter for the file layer
    fn file_filter(&self) -> Targets {
        if self.enabled {
            Targets::new()
                .with_target("meshd", LevelFilter::DEBUG)
                .with_target("mesh_shared", LevelFilter::DEBUG)
                .with_target("tower_http", LevelFilter::DEBUG)
                .with_default(LevelFilter::WARN)
        } else {
            Targets::new()
                .with_target(STARTUP_TARGET, LevelFilter::INFO)
                .with_default(LevelFilter::ERROR)
        }
    }

    /// File sink layer, `None` when no file could be opened
    pub fn file_layer<S>(&self) -> Option<Box<dyn Layer<S> + Send + Sync + 'static>>
    where
        S: Subscriber + for<'a> LookupSpan<'a>,
    {
        let file = self.file.as_ref()?;
        let layer = fmt::layer()
            .with_ansi(false)
            .with_writer(Arc::clone(file))
            .with_filter(self.file_filter());
        Some(layer.boxed())
    }

    /// Install the global subscriber: console plus the file sink.
    pub fn install(&self) -> Result<(), TryInitError> {
        let console_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        let console = fmt::layer().with_target(true).with_filter(console_filter);

        tracing_subscriber::registry()
            .with(console)
            .with(self.file_layer())
            .try_init()?;

        self.log_startup();
        Ok(())
    }

    /// Lines that mark a new run in the file, written even when the file
    /// only takes errors.
    fn log_startup(&self) {
        let state = self.state();
        match &state.path {
            Some(path) => info!(
                target: STARTUP_TARGET,
                log_path = %path.display(),
                debug_enabled = state.enabled,
                "Debug logger initialized"
            ),
            None => warn!("Debug log file unavailable, logging to console only"),
        }
        if let Some((primary, reason)) = &self.fell_back_from {
            warn!(
                target: STARTUP_TARGET,
                primary_path = %primary.display(),
                reason = %reason,
                "Primary debug log path unavailable; using fallback path"
            );
        }
        if !state.enabled {
            info!(target: STARTUP_TARGET, "APP_DEBUG_ENABLED is false, debug log will remain minimal");
        }
    }
}

fn create_truncated(path: &Path) -> io::Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    File::create(path)
}
