//! Shared deterministic types for the gather core.
//!
//! These types define stable contracts between core components. They should
//! not depend on external state or I/O and must remain deterministic across
//! runs.

use std::fmt;

/// Coarse machine category derived from enclosure codes and VM detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChassisClass {
    Desktop,
    Mobile,
    Vm,
    Unknown,
}

impl fmt::Display for ChassisClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ChassisClass::Desktop => "Desktop",
            ChassisClass::Mobile => "Mobile",
            ChassisClass::Vm => "VM",
            ChassisClass::Unknown => "Unknown",
        };
        f.write_str(label)
    }
}

/// Machine identity derived once from the hardware facts provider plus
/// variable-store lookups. Immutable after creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MachineFacts {
    pub manufacturer: String,
    pub model: String,
    /// Human-readable enclosure label (e.g. `Desktop - Tower`).
    pub enclosure_label: String,
    pub chassis_class: ChassisClass,
    pub is_virtual_machine: bool,
    /// Initial hostname offered to the operator: the SMBIOS asset tag on
    /// physical hardware, the engine- or OS-reported name on VMs.
    pub hostname_candidate: String,
}

/// Keyboard-modifier state sampled while a submission is finalized.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModifierSample {
    /// Left-Ctrl + left-Shift chord: request the downstream override flag.
    pub override_chord: bool,
    /// Escape: force the whole run to fail out.
    pub escape: bool,
}

/// Editable form state the workflow operates on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormFields {
    pub hostname: String,
    pub build_type: Option<String>,
}

/// Final decision of an accepted validation workflow. Produced at most once
/// per run and consumed exactly once by the result submitter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionResult {
    /// Committed hostname, already upper-cased.
    pub hostname: Option<String>,
    pub build_type: Option<String>,
    pub override_requested: bool,
    /// Always false on the accepted path; the escape abort exits the
    /// process without producing a result at all.
    pub aborted: bool,
}
