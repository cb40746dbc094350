//! Desktop-session resolution and cross-session relaunch.
//!
//! The process must live in the same OS session as a reference process:
//! the engine's progress UI in automation mode, the desktop shell
//! otherwise. Session lookups shell out to `tasklist`; relaunching spawns
//! a fresh copy of the executable with no session token and relies on the
//! platform's default placement of the new process (an environment
//! convention, not a guaranteed primitive).

use std::env;
use std::path::Path;
use std::process::Command;

use anyhow::{Context, Result, anyhow};
use tracing::{debug, info, warn};

use crate::io::command::{PROBE_TIMEOUT, run_with_timeout};

/// Name of the engine's progress UI process.
pub const PROGRESS_UI_PROCESS: &str = "TSProgressUI";
/// Name of the desktop shell process.
pub const SHELL_PROCESS: &str = "explorer";

/// Platform capability for session lookup and self-relaunch.
pub trait SessionProbe {
    /// Session id of the first process matching `name` (extension optional,
    /// matching is case-insensitive). `None` when no such process exists.
    fn find_session_of(&self, name: &str) -> Result<Option<u32>>;
    fn current_session(&self) -> Result<u32>;
    /// Launch a fresh instance of `exe`. Failure here is an unrecoverable
    /// startup condition and is never retried.
    fn relaunch(&self, exe: &Path) -> Result<()>;
}

/// Outcome of the startup session check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionCheck {
    /// Already in the reference session; proceed with the workflow.
    Matched,
    /// A fresh instance was launched; this instance must exit now.
    Relaunched,
}

/// The process whose session the current instance must match.
pub fn reference_process(automation: bool) -> &'static str {
    if automation {
        PROGRESS_UI_PROCESS
    } else {
        SHELL_PROCESS
    }
}

/// Compare our session against the reference process's session and relaunch
/// if they differ. A missing reference process counts as a mismatch: wrong
/// session is assumed rather than proceeding unchecked.
pub fn ensure_session(probe: &dyn SessionProbe, automation: bool) -> Result<SessionCheck> {
    let reference = reference_process(automation);
    let target = probe.find_session_of(reference)?;
    let current = probe.current_session()?;
    debug!(reference, ?target, current, "session check");

    match target {
        Some(session) if session == current => Ok(SessionCheck::Matched),
        _ => {
            let exe = env::current_exe().context("locate own executable")?;
            info!(reference, exe = %exe.display(), "session mismatch, relaunching");
            probe
                .relaunch(&exe)
                .with_context(|| format!("relaunch into session of {reference}"))?;
            Ok(SessionCheck::Relaunched)
        }
    }
}

/// Close the engine's progress UI so the form is not buried behind it.
/// Best-effort; a failure only warns.
pub fn kill_progress_ui() {
    let mut cmd = Command::new("taskkill");
    cmd.args(["/F", "/IM", &image_name(PROGRESS_UI_PROCESS)]);
    match run_with_timeout(cmd, PROBE_TIMEOUT) {
        Ok(probe) if probe.success => info!("progress UI closed"),
        Ok(probe) => warn!(stderr = %probe.stderr.trim(), "progress UI kill failed"),
        Err(err) => warn!(err = %err, "progress UI kill failed"),
    }
}

/// `tasklist`-backed probe.
pub struct TasklistProbe;

impl SessionProbe for TasklistProbe {
    fn find_session_of(&self, name: &str) -> Result<Option<u32>> {
        let image = image_name(name);
        let mut cmd = Command::new("tasklist");
        cmd.args(["/FO", "CSV", "/NH", "/FI", &format!("IMAGENAME eq {image}")]);
        let probe = run_with_timeout(cmd, PROBE_TIMEOUT)
            .with_context(|| format!("look up session of {image}"))?;
        Ok(parse_session_id(&probe.stdout))
    }

    fn current_session(&self) -> Result<u32> {
        let pid = std::process::id();
        let mut cmd = Command::new("tasklist");
        cmd.args(["/FO", "CSV", "/NH", "/FI", &format!("PID eq {pid}")]);
        let probe = run_with_timeout(cmd, PROBE_TIMEOUT).context("look up own session")?;
        parse_session_id(&probe.stdout)
            .ok_or_else(|| anyhow!("own process {pid} missing from tasklist output"))
    }

    fn relaunch(&self, exe: &Path) -> Result<()> {
        Command::new(exe)
            .spawn()
            .with_context(|| format!("spawn {}", exe.display()))?;
        Ok(())
    }
}

/// Append `.exe` unless the name already carries an extension.
fn image_name(name: &str) -> String {
    if name.contains('.') {
        name.to_string()
    } else {
        format!("{name}.exe")
    }
}

/// Extract the Session# column from the first CSV record of `tasklist /FO
/// CSV /NH` output. Filter misses produce an `INFO:` line instead of CSV,
/// which parses to `None`.
fn parse_session_id(output: &str) -> Option<u32> {
    let record = output.lines().find(|line| line.starts_with('"'))?;
    let fields = split_csv_record(record);
    fields.get(3)?.parse().ok()
}

/// Split one all-quoted CSV record as emitted by `tasklist /FO CSV`.
fn split_csv_record(record: &str) -> Vec<String> {
    record
        .trim()
        .strip_prefix('"')
        .and_then(|r| r.strip_suffix('"'))
        .map(|inner| inner.split("\",\"").map(str::to_string).collect())
        .unwrap_or_default()
}
