use crate::Environment;
use std::fs::{self, File};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};
use tracing_subscriber::{EnvFilter, prelude::*};

/// Install color-eyre with a project-standard configuration.
///
/// Call this early in main() before any fallible operations to ensure
/// colored error output. Safe to call multiple times.
///
/// Configuration:
/// - Shows file:line where errors occur
/// - Hides environment variables (they carry SMTP and API credentials)
pub fn install_color_eyre() {
    let _ = color_eyre::config::HookBuilder::default()
        .display_location_section(true)
        .display_env_section(false)
        .install();
}

/// Initialize tracing with environment-aware configuration and error span capture.
///
/// - **Production** (`APP_ENV=production`):
///   - JSON format (for unattended/scheduled runs shipped to a log collector)
///   - Default filter `warn`
///
/// - **Development** (default):
///   - Pretty-printed format
///   - Default filter `info`
///
/// When `log_dir` is given, every run additionally writes a plain-text log to
/// `<log_dir>/campaign_<YYYYmmdd_HHMMSS>.log`. If the file cannot be created the
/// run continues with console logging only.
///
/// `RUST_LOG` overrides the default filter in both modes.
///
/// # Multiple Calls
///
/// Safe to call multiple times; later calls are ignored (common in tests).
pub fn init_tracing(environment: &Environment, log_dir: Option<&Path>) {
    let is_production = environment.is_production();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if is_production {
            EnvFilter::new("warn")
        } else {
            EnvFilter::new("info")
        }
    });

    let (log_file, file_error) = match log_dir.map(open_run_log) {
        Some(Ok(file)) => (Some(file), None),
        Some(Err(e)) => (None, Some(e)),
        None => (None, None),
    };
    let file_layer = log_file.map(|file| {
        tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_target(false)
            .with_writer(Arc::new(file))
    });

    let result = if is_production {
        tracing_subscriber::registry()
            .with(file_layer)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(false)
                    .flatten_event(true),
            )
            .with(tracing_error::ErrorLayer::default())
            .with(filter)
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(file_layer)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_file(false)
                    .with_line_number(false)
                    .pretty(),
            )
            .with(tracing_error::ErrorLayer::default())
            .with(filter)
            .try_init()
    };

    match result {
        Ok(_) => {
            info!("Tracing initialized. Environment: {:?}", environment);
            if let Some(e) = file_error {
                warn!(error = %e, "Run log file unavailable, logging to console only");
            }
        }
        Err(_) => {
            debug!("Tracing already initialized, skipping re-initialization");
        }
    }
}

fn open_run_log(dir: &Path) -> std::io::Result<File> {
    fs::create_dir_all(dir)?;
    let name = format!(
        "campaign_{}.log",
        chrono::Local::now().format("%Y%m%d_%H%M%S")
    );
    File::create(dir.join(name))
}
