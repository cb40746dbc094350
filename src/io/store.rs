//! Uniform access to the deployment engine's named string variables.
//!
//! In automation mode reads and writes go to the engine's COM-exposed
//! environment through a PowerShell bridge; standalone runs get the no-op
//! stand-in behavior (every variable absent, writes discarded).

use std::process::Command;

use anyhow::{Context, Result, anyhow};
use tracing::{debug, warn};

use crate::core::config::StoreValues;
use crate::io::command::{PROBE_TIMEOUT, run_with_timeout};

/// Variable names recognized at the store boundary.
pub mod vars {
    pub const REGEX: &str = "JGUI-regex";
    pub const TIMEOUT: &str = "JGUI-timeout";
    pub const BUILD_TYPES: &str = "JGUI-buildtypes";

    pub const CHASSIS: &str = "Chassis";
    pub const MODEL: &str = "Model";
    pub const MAKE: &str = "Make";
    pub const BUILD_TYPE: &str = "Buildtype";
    pub const COMPUTER_NAME: &str = "OSDComputerName";
    pub const OVERRIDE: &str = "Override";

    pub const MACHINE_NAME: &str = "_SMSTSMachineName";
    pub const LOG_LOCATION: &str = "_SMSLogLocation";
}

/// Read/write access to named string variables plus automation detection.
pub trait VariableStore {
    /// True when the process runs embedded in the deployment engine.
    fn is_automation(&self) -> bool;
    fn get(&self, name: &str) -> Result<Option<String>>;
    fn set(&self, name: &str, value: &str) -> Result<()>;
}

/// Engine-backed store bridged over PowerShell's COM access to the task
/// sequence environment. Detection happens once at construction.
pub struct TsEnvStore {
    automation: bool,
}

const TS_COM_PROGID: &str = "Microsoft.SMS.TSEnvironment";

impl TsEnvStore {
    /// Probe for the engine environment. A missing COM class, a missing
    /// PowerShell, or a probe failure all mean standalone operation.
    pub fn detect() -> Self {
        let script = format!(
            "try {{ New-Object -ComObject {TS_COM_PROGID} -ErrorAction Stop | Out-Null; exit 0 }} catch {{ exit 1 }}"
        );
        let automation = match run_with_timeout(powershell(&script), PROBE_TIMEOUT) {
            Ok(probe) => probe.success,
            Err(err) => {
                warn!(err = %err, "automation environment probe failed, assuming standalone");
                false
            }
        };
        debug!(automation, "variable store initialized");
        Self { automation }
    }
}

impl VariableStore for TsEnvStore {
    fn is_automation(&self) -> bool {
        self.automation
    }

    fn get(&self, name: &str) -> Result<Option<String>> {
        if !self.automation {
            return Ok(None);
        }
        let script = format!(
            "$ts = New-Object -ComObject {TS_COM_PROGID} -ErrorAction Stop; [Console]::Out.Write($ts.Value('{}'))",
            quote(name)
        );
        let probe = run_with_timeout(powershell(&script), PROBE_TIMEOUT)
            .with_context(|| format!("read variable {name}"))?;
        if !probe.success {
            return Err(anyhow!("read variable {name}: {}", probe.stderr.trim()));
        }
        let value = probe.stdout;
        debug!(name, present = !value.is_empty(), "variable read");
        if value.is_empty() {
            Ok(None)
        } else {
            Ok(Some(value))
        }
    }

    fn set(&self, name: &str, value: &str) -> Result<()> {
        if !self.automation {
            return Ok(());
        }
        let script = format!(
            "$ts = New-Object -ComObject {TS_COM_PROGID} -ErrorAction Stop; $ts.Value('{}') = '{}'",
            quote(name),
            quote(value)
        );
        let probe = run_with_timeout(powershell(&script), PROBE_TIMEOUT)
            .with_context(|| format!("write variable {name}"))?;
        if !probe.success {
            return Err(anyhow!("write variable {name}: {}", probe.stderr.trim()));
        }
        debug!(name, value, "variable written");
        Ok(())
    }
}

/// Read the three gather inputs in one place so the resolver sees a single
/// consistent snapshot.
pub fn read_config_values(store: &dyn VariableStore) -> Result<StoreValues> {
    Ok(StoreValues {
        regex: store.get(vars::REGEX)?,
        timeout: store.get(vars::TIMEOUT)?,
        build_types: store.get(vars::BUILD_TYPES)?,
    })
}

fn powershell(script: &str) -> Command {
    let mut cmd = Command::new("powershell.exe");
    cmd.args(["-NoProfile", "-NonInteractive", "-Command", script]);
    cmd
}

/// Escape for single-quoted PowerShell string literals.
fn quote(raw: &str) -> String {
    raw.replace('\'', "''")
}
