//! Deterministic classification of SMBIOS enclosure types.

use crate::core::types::ChassisClass;

/// Convert an SMBIOS chassis type code into a readable enclosure label.
///
/// Codes outside the known desktop/mobile sets return `"Unknown"`.
pub fn enclosure_label(chassis_type: u16) -> &'static str {
    match chassis_type {
        3 => "Desktop - Desktop",
        4 => "Desktop - Low Profile",
        5 => "Desktop - Pizza Box",
        6 => "Desktop - Mini Tower",
        7 => "Desktop - Tower",
        15 => "Desktop - Space-saving",
        16 => "Desktop - Lunch Box",
        8 => "Mobile - Portable",
        9 => "Mobile - Laptop",
        10 => "Mobile - Notebook",
        11 => "Mobile - Hand-Held",
        12 => "Mobile - Docking Station",
        14 => "Mobile - Sub Notebook",
        18 => "Mobile - Expansion Chassis",
        21 => "Mobile - Peripheral Chassis",
        30 => "Mobile - Tablet",
        31 => "Mobile - Convertible",
        32 => "Mobile - Detachable",
        _ => "Unknown",
    }
}

/// Classify an enclosure label into a chassis class.
///
/// The desktop/mobile markers in the label take precedence; the VM flag only
/// decides the class when the label matches neither.
pub fn classify(enclosure: &str, is_virtual_machine: bool) -> ChassisClass {
    if enclosure.contains("Desktop") {
        ChassisClass::Desktop
    } else if enclosure.contains("Mobile") {
        ChassisClass::Mobile
    } else if is_virtual_machine {
        ChassisClass::Vm
    } else {
        ChassisClass::Unknown
    }
}
