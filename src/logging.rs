//! Tracing setup for the gather binary.
//!
//! Two sinks: compact stderr output filtered by `RUST_LOG` (default
//! `info`), and a per-run log file so deployment logs survive the session.
//! In automation mode the file lands in the engine's log directory
//! (`_SMSLogLocation`), otherwise next to the executable.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Local;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the subscriber. A log directory that cannot be written only
/// costs the file sink; stderr logging always comes up.
pub fn init(log_dir: Option<&Path>) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let file_layer = log_dir.and_then(|dir| match File::create(log_file_path(dir)) {
        Ok(file) => Some(fmt::layer().with_ansi(false).with_writer(Arc::new(file))),
        Err(err) => {
            eprintln!("log file unavailable in {}: {err}", dir.display());
            None
        }
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .with(file_layer)
        .init();
}

/// Timestamped per-run log filename, matching the deployment log layout.
pub fn log_file_path(dir: &Path) -> PathBuf {
    let stamp = Local::now().format("%Y-%m-%d-%H-%M");
    dir.join(format!("jgui-gather-{stamp}.log"))
}
