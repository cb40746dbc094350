//! Hardware facts provider and machine-identity derivation.
//!
//! The provider is an opaque `Query(class, property)` surface over CIM; the
//! derivation combines it with variable-store lookups into one immutable
//! [`MachineFacts`] value per run.

use std::process::Command;

use anyhow::{Context, Result, anyhow};
use tracing::{debug, info, warn};

use crate::core::chassis::{classify, enclosure_label};
use crate::core::types::{ChassisClass, MachineFacts};
use crate::io::command::{PROBE_TIMEOUT, run_with_timeout};
use crate::io::store::{VariableStore, vars};

/// Opaque hardware inventory lookup. Multi-valued properties come back as
/// one entry per value.
pub trait FactsProvider {
    fn query(&self, class: &str, property: &str) -> Result<Vec<String>>;
}

/// CIM-backed provider shelling out to PowerShell.
pub struct CimFactsProvider;

impl FactsProvider for CimFactsProvider {
    fn query(&self, class: &str, property: &str) -> Result<Vec<String>> {
        let script = format!(
            "(Get-CimInstance -ClassName {class} -ErrorAction Stop).{property}"
        );
        let mut cmd = Command::new("powershell.exe");
        cmd.args(["-NoProfile", "-NonInteractive", "-Command", &script]);
        let probe = run_with_timeout(cmd, PROBE_TIMEOUT)
            .with_context(|| format!("query {class}.{property}"))?;
        if !probe.success {
            return Err(anyhow!(
                "query {class}.{property}: {}",
                probe.stderr.trim()
            ));
        }
        debug!(class, property, values = probe.lines().len(), "hardware query");
        Ok(probe.lines())
    }
}

/// Derive the machine identity once per run.
pub fn gather_facts(
    provider: &dyn FactsProvider,
    store: &dyn VariableStore,
) -> Result<MachineFacts> {
    let mut model = single_value(provider, "Win32_ComputerSystem", "Model")?;
    let manufacturer = single_value(provider, "Win32_ComputerSystem", "Manufacturer")?;
    info!(manufacturer, model, "hardware identity");

    let is_virtual_machine;
    if manufacturer.contains("Microsoft") || model.contains("Virtual") {
        warn!("detected Hyper-V virtual machine");
        model = "Hyper-V VM".to_string();
        is_virtual_machine = true;
    } else if manufacturer.contains("VMware") {
        warn!("detected VMware virtual machine");
        model = "VMware VM".to_string();
        is_virtual_machine = true;
    } else if model.contains("VirtualBox") {
        warn!("detected VirtualBox virtual machine");
        model = "VirtualBox VM".to_string();
        is_virtual_machine = true;
    } else {
        is_virtual_machine = false;
    }

    // VM name precedence: engine-provided machine name, else the name the
    // OS reports. Physical machines offer the SMBIOS asset tag instead.
    let hostname_candidate = if is_virtual_machine {
        match store.get(vars::MACHINE_NAME)? {
            Some(name) => name,
            None => single_value(provider, "Win32_ComputerSystem", "Name")?,
        }
    } else {
        single_value(provider, "Win32_SystemEnclosure", "SMBIOSAssetTag")?
    };
    info!(hostname_candidate, "hostname candidate");

    let codes = provider.query("Win32_SystemEnclosure", "ChassisTypes")?;
    let mut enclosure = String::new();
    for raw in &codes {
        match raw.parse::<u16>() {
            Ok(code) => enclosure = enclosure_label(code).to_string(),
            Err(_) => warn!(raw, "unparseable chassis type code"),
        }
    }

    let chassis_class = classify(&enclosure, is_virtual_machine);
    if chassis_class == ChassisClass::Vm {
        enclosure = "Virtual Machine".to_string();
    }
    debug!(%chassis_class, enclosure, "chassis classified");

    Ok(MachineFacts {
        manufacturer,
        model,
        enclosure_label: enclosure,
        chassis_class,
        is_virtual_machine,
        hostname_candidate,
    })
}

/// First value of a single-valued property; empty (with a warning) when the
/// inventory has nothing to report.
fn single_value(provider: &dyn FactsProvider, class: &str, property: &str) -> Result<String> {
    let values = provider.query(class, property)?;
    match values.into_iter().next() {
        Some(value) => Ok(value),
        None => {
            warn!(class, property, "no value reported");
            Ok(String::new())
        }
    }
}
