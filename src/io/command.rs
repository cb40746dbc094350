//! Bounded runner for the short-lived platform probes.
//!
//! Every external lookup (PowerShell COM bridge, CIM queries, tasklist)
//! goes through [`run_with_timeout`] so a wedged child can never hang the
//! deployment sequence.

use std::process::{Command, Stdio};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use tracing::{debug, warn};
use wait_timeout::ChildExt;

/// Default budget for a single probe invocation.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(30);

/// Captured output of a completed probe.
#[derive(Debug)]
pub struct ProbeOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

impl ProbeOutput {
    /// Stdout lines, trimmed, with empties dropped.
    pub fn lines(&self) -> Vec<String> {
        self.stdout
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// Run a probe command, killing it once `timeout` elapses.
pub fn run_with_timeout(mut cmd: Command, timeout: Duration) -> Result<ProbeOutput> {
    let program = cmd.get_program().to_string_lossy().into_owned();
    debug!(program, "spawning probe");

    let mut child = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .with_context(|| format!("spawn {program}"))?;

    let status = match child
        .wait_timeout(timeout)
        .with_context(|| format!("wait for {program}"))?
    {
        Some(status) => status,
        None => {
            warn!(program, timeout_secs = timeout.as_secs(), "probe timed out, killing");
            child.kill().with_context(|| format!("kill {program}"))?;
            child.wait().with_context(|| format!("wait {program} after kill"))?;
            return Err(anyhow!("{program} timed out after {}s", timeout.as_secs()));
        }
    };

    let output = child
        .wait_with_output()
        .with_context(|| format!("collect {program} output"))?;
    let probe = ProbeOutput {
        success: status.success(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    };
    debug!(program, success = probe.success, "probe finished");
    Ok(probe)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probe_output_lines_trim_and_drop_empties() {
        let probe = ProbeOutput {
            success: true,
            stdout: "  first \n\n second\r\n".to_string(),
            stderr: String::new(),
        };
        assert_eq!(probe.lines(), vec!["first".to_string(), "second".to_string()]);
    }
}
