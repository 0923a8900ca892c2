//! Logging system configuration and initialization
//!
//! Sets up:
//! - Console output
//! - A per-run log file `logs/{prefix}_{YYYYmmdd_HHMMSS}.log`
//! - Optional JSON formatting for the file layer
//! - Start-up cleanup that keeps only the newest `max_files` logs

use anyhow::{Result, anyhow};
use once_cell::sync::Lazy;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{info, warn};
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{EnvFilter, Registry, fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub use crate::infrastructure::config::LoggingConfig;

/// Keeps the non-blocking writers alive for the process lifetime
static LOG_GUARDS: Lazy<Mutex<Vec<tracing_appender::non_blocking::WorkerGuard>>> =
    Lazy::new(|| Mutex::new(Vec::new()));

/// Dependency targets damped unless trace logging is requested
const NOISY_TARGETS: &[&str] = &[
    "reqwest=info",
    "hyper=warn",
    "hyper_util=warn",
    "h2=warn",
    "html5ever=warn",
    "selectors=warn",
    "teloxide=info",
    "axum=info",
    "tower_http=info",
];

/// `{prefix}_{YYYYmmdd_HHMMSS}.log` for the current local time
pub fn log_file_name(prefix: &str) -> String {
    let now = chrono::Local::now();
    format!("{}_{}.log", prefix, now.format("%Y%m%d_%H%M%S"))
}

/// Filter from `RUST_LOG` when set, otherwise from the configured level
pub fn build_env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let mut filter = EnvFilter::new(level);
        if !level.to_lowercase().contains("trace") {
            for directive in NOISY_TARGETS {
                match directive.parse() {
                    Ok(parsed) => filter = filter.add_directive(parsed),
                    Err(e) => eprintln!("Invalid log directive {directive}: {e}"),
                }
            }
        }
        filter
    })
}

/// Initialize logging with custom configuration
pub fn init_logging_with_config(config: &LoggingConfig) -> Result<()> {
    let log_dir = config.directory.clone();

    if config.file_output {
        std::fs::create_dir_all(&log_dir)
            .map_err(|e| anyhow!("Failed to create log directory {:?}: {}", log_dir, e))?;
    }

    let registry = Registry::default().with(build_env_filter(&config.level));
    let file_name = log_file_name(&config.file_prefix);

    match (config.file_output, config.console_output) {
        (true, console) => {
            let file_appender = rolling::never(&log_dir, &file_name);
            let (file_writer, file_guard) = non_blocking(file_appender);
            LOG_GUARDS
                .lock()
                .map_err(|_| anyhow!("Log guard registry poisoned"))?
                .push(file_guard);

            if config.json_format {
                let file_layer = fmt::Layer::new()
                    .json()
                    .with_writer(file_writer)
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_file(true)
                    .with_line_number(true)
                    .with_ansi(false);
                registry
                    .with(file_layer)
                    .with(console.then(|| fmt::Layer::new().with_writer(std::io::stdout).with_target(false)))
                    .try_init()
                    .map_err(|e| anyhow!("Failed to install subscriber: {}", e))?;
            } else {
                let file_layer = fmt::Layer::new()
                    .with_writer(file_writer)
                    .with_target(true)
                    .with_ansi(false);
                registry
                    .with(file_layer)
                    .with(console.then(|| fmt::Layer::new().with_writer(std::io::stdout).with_target(false)))
                    .try_init()
                    .map_err(|e| anyhow!("Failed to install subscriber: {}", e))?;
            }
        }
        (false, true) => {
            let console_layer = fmt::Layer::new().with_writer(std::io::stdout).with_target(false);
            registry
                .with(console_layer)
                .try_init()
                .map_err(|e| anyhow!("Failed to install subscriber: {}", e))?;
        }
        (false, false) => {
            return Err(anyhow!("No logging output configured"));
        }
    }

    if config.file_output {
        let removed = cleanup_old_logs(&log_dir, config.max_files);
        if removed > 0 {
            info!("Removed {} old log files (keeping {})", removed, config.max_files);
        }
    }

    info!("Logging system initialized");
    info!("Log directory: {:?}", log_dir);
    info!("Log file: {}", file_name);
    info!("Log level: {}", config.level);
    info!("JSON format: {}", config.json_format);
    Ok(())
}

/// Log system information for diagnostics
pub fn log_system_info() {
    info!("=== ReelScout System Information ===");
    info!("Application version: {}", env!("CARGO_PKG_VERSION"));
    info!("Operating system: {}", std::env::consts::OS);
    info!("Architecture: {}", std::env::consts::ARCH);
    if let Ok(current_dir) = std::env::current_dir() {
        info!("Working directory: {:?}", current_dir);
    }
    info!("====================================");
}

/// Delete all but the newest `max_files` `.log` files; returns how many were removed
pub fn cleanup_old_logs(log_dir: &Path, max_files: u32) -> usize {
    let Ok(entries) = std::fs::read_dir(log_dir) else {
        return 0;
    };

    let mut log_files: Vec<(PathBuf, std::time::SystemTime)> = entries
        .filter_map(std::result::Result::ok)
        .filter_map(|entry| {
            let path = entry.path();
            let is_log = path.is_file() && path.extension().is_some_and(|ext| ext == "log");
            let modified = entry.metadata().and_then(|m| m.modified()).ok()?;
            is_log.then_some((path, modified))
        })
        .collect();

    // Newest first
    log_files.sort_by(|a, b| b.1.cmp(&a.1));

    let mut removed = 0;
    for (path, _) in log_files.iter().skip(max_files as usize) {
        match std::fs::remove_file(path) {
            Ok(()) => removed += 1,
            Err(e) => warn!("Failed to remove old log file {:?}: {}", path, e),
        }
    }
    removed
}
