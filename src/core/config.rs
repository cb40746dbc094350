//! Effective-configuration resolution.
//!
//! Exactly one source is consulted per run: the engine's variable store in
//! automation mode, or operator-entered test values in manual mode. Fields
//! never merge across sources; [`ConfigSource`] encodes that in the type.

use anyhow::{Result, anyhow};
use regex::Regex;
use tracing::{debug, warn};

use crate::core::types::MachineFacts;

/// Raw variable values read from the engine store (automation mode).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreValues {
    /// `JGUI-regex`
    pub regex: Option<String>,
    /// `JGUI-timeout`
    pub timeout: Option<String>,
    /// `JGUI-buildtypes`
    pub build_types: Option<String>,
}

/// Operator-entered test values (manual mode). Blank fields stay unset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManualInputs {
    pub regex: Option<String>,
    pub timeout_secs: Option<u32>,
    pub build_types: Option<Vec<String>>,
}

/// Which source supplies the configuration for this run.
#[derive(Debug)]
pub enum ConfigSource<'a> {
    Automation(StoreValues),
    Manual(&'a ManualInputs),
}

/// Effective configuration for one run. Created once, immutable thereafter.
#[derive(Debug, Clone)]
pub struct EffectiveConfig {
    /// Pattern text as supplied, kept for logging and display.
    pub pattern: Option<String>,
    /// Compiled pattern; present only while `regex_active` is true.
    pub hostname_regex: Option<Regex>,
    pub regex_active: bool,
    pub timeout_secs: Option<u32>,
    pub timeout_active: bool,
    /// Allowed build types in supplied order, no trimming, no deduplication.
    pub build_types: Option<Vec<String>>,
    pub buildtype_active: bool,
}

impl EffectiveConfig {
    /// True when the hostname satisfies the active pattern. Always true
    /// while no pattern is active.
    pub fn hostname_matches(&self, hostname: &str) -> bool {
        match &self.hostname_regex {
            Some(re) => re.is_match(hostname),
            None => true,
        }
    }
}

/// Build the effective configuration from exactly one source.
///
/// Fatal conditions (unparseable timeout, malformed pattern on physical
/// hardware) surface as errors; the caller exits with the invalid-argument
/// code without any partial submission.
pub fn resolve(source: ConfigSource<'_>, facts: &MachineFacts) -> Result<EffectiveConfig> {
    let cfg = match source {
        ConfigSource::Automation(values) => resolve_from_store(values, facts)?,
        ConfigSource::Manual(inputs) => resolve_from_manual(inputs, facts)?,
    };
    debug!(
        pattern = cfg.pattern.as_deref(),
        regex_active = cfg.regex_active,
        timeout_secs = cfg.timeout_secs,
        timeout_active = cfg.timeout_active,
        build_types = ?cfg.build_types,
        "configuration resolved"
    );
    Ok(cfg)
}

fn resolve_from_store(values: StoreValues, facts: &MachineFacts) -> Result<EffectiveConfig> {
    let (pattern, hostname_regex, regex_active) = match non_blank(values.regex) {
        Some(pattern) => {
            let (compiled, active) = validate_pattern(&pattern, facts)?;
            (Some(pattern), compiled, active)
        }
        None => (None, None, false),
    };

    let (timeout_secs, timeout_active) = match non_blank(values.timeout) {
        Some(raw) => {
            let secs = parse_timeout(&raw)?;
            (Some(secs), secs != 0)
        }
        None => (None, false),
    };

    let build_types = non_blank(values.build_types).map(split_build_types);
    let buildtype_active = build_types_usable(build_types.as_deref());

    Ok(EffectiveConfig {
        pattern,
        hostname_regex,
        regex_active,
        timeout_secs,
        timeout_active,
        build_types,
        buildtype_active,
    })
}

fn resolve_from_manual(inputs: &ManualInputs, facts: &MachineFacts) -> Result<EffectiveConfig> {
    let (pattern, hostname_regex, regex_active) = match non_blank(inputs.regex.clone()) {
        Some(pattern) => {
            let (compiled, active) = validate_pattern(&pattern, facts)?;
            (Some(pattern), compiled, active)
        }
        None => (None, None, false),
    };

    let timeout_secs = inputs.timeout_secs;
    let timeout_active = matches!(timeout_secs, Some(secs) if secs != 0);

    let build_types = inputs.build_types.clone();
    let buildtype_active = build_types_usable(build_types.as_deref());

    Ok(EffectiveConfig {
        pattern,
        hostname_regex,
        regex_active,
        timeout_secs,
        timeout_active,
        build_types,
        buildtype_active,
    })
}

/// Validate a supplied pattern and decide whether enforcement is active.
///
/// Virtual machines always bypass hostname-pattern enforcement, regardless
/// of how the pattern looks. On physical hardware the pattern must be
/// anchored (`^...$`) and must compile.
fn validate_pattern(pattern: &str, facts: &MachineFacts) -> Result<(Option<Regex>, bool)> {
    if facts.is_virtual_machine {
        warn!(pattern, "hostname pattern disabled for virtual machine");
        return Ok((None, false));
    }
    if !pattern.starts_with('^') || !pattern.ends_with('$') {
        return Err(anyhow!(
            "invalid hostname pattern '{pattern}': must start with '^' and end with '$'"
        ));
    }
    let compiled = Regex::new(pattern)
        .map_err(|err| anyhow!("invalid hostname pattern '{pattern}': {err}"))?;
    Ok((Some(compiled), true))
}

fn parse_timeout(raw: &str) -> Result<u32> {
    raw.trim()
        .parse::<u32>()
        .map_err(|_| anyhow!("timeout variable '{raw}' is not a number"))
}

/// Comma split in supplied order, no trimming, no deduplication.
fn split_build_types(raw: String) -> Vec<String> {
    raw.split(',').map(str::to_string).collect()
}

/// A build-type list drives the form only when its first entry is non-empty.
fn build_types_usable(build_types: Option<&[String]>) -> bool {
    matches!(build_types, Some([first, ..]) if !first.is_empty())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{physical_desktop_facts, vm_facts};

    fn automation(regex: Option<&str>, timeout: Option<&str>, builds: Option<&str>) -> StoreValues {
        StoreValues {
            regex: regex.map(str::to_string),
            timeout: timeout.map(str::to_string),
            build_types: builds.map(str::to_string),
        }
    }

    #[test]
    fn empty_store_resolves_everything_inactive() {
        let facts = physical_desktop_facts();
        let cfg = resolve(ConfigSource::Automation(StoreValues::default()), &facts)
            .expect("resolve");
        assert!(!cfg.regex_active);
        assert!(!cfg.timeout_active);
        assert!(!cfg.buildtype_active);
        assert_eq!(cfg.timeout_secs, None);
    }

    #[test]
    fn anchored_pattern_activates_on_physical_hardware() {
        let facts = physical_desktop_facts();
        let source = ConfigSource::Automation(automation(Some("^PC-[0-9]{4}$"), None, None));
        let cfg = resolve(source, &facts).expect("resolve");
        assert!(cfg.regex_active);
        assert!(cfg.hostname_matches("PC-1234"));
        assert!(!cfg.hostname_matches("LAB-1234"));
    }

    #[test]
    fn unanchored_pattern_is_fatal_on_physical_hardware() {
        let facts = physical_desktop_facts();
        for pattern in ["PC-[0-9]{4}$", "^PC-[0-9]{4}", "PC-[0-9]{4}"] {
            let source = ConfigSource::Automation(automation(Some(pattern), None, None));
            let err = resolve(source, &facts).expect_err("should be fatal");
            assert!(err.to_string().contains("invalid hostname pattern"));
        }
    }

    #[test]
    fn uncompilable_pattern_is_fatal_on_physical_hardware() {
        let facts = physical_desktop_facts();
        let source = ConfigSource::Automation(automation(Some("^PC-[0-9$"), None, None));
        resolve(source, &facts).expect_err("should be fatal");
    }

    #[test]
    fn virtual_machine_always_bypasses_pattern_enforcement() {
        let facts = vm_facts();
        // Even a malformed pattern is not fatal on a VM, it is just disabled.
        for pattern in ["^PC-[0-9]{4}$", "no-anchors-at-all", "^broken[$"] {
            let source = ConfigSource::Automation(automation(Some(pattern), None, None));
            let cfg = resolve(source, &facts).expect("resolve");
            assert!(!cfg.regex_active, "pattern '{pattern}' must stay inactive");
            assert!(cfg.hostname_regex.is_none());
        }
    }

    #[test]
    fn timeout_zero_is_explicit_no_timeout() {
        let facts = physical_desktop_facts();
        let source = ConfigSource::Automation(automation(None, Some("0"), None));
        let cfg = resolve(source, &facts).expect("resolve");
        assert_eq!(cfg.timeout_secs, Some(0));
        assert!(!cfg.timeout_active);
    }

    #[test]
    fn nonzero_timeout_activates_countdown() {
        let facts = physical_desktop_facts();
        let source = ConfigSource::Automation(automation(None, Some("45"), None));
        let cfg = resolve(source, &facts).expect("resolve");
        assert_eq!(cfg.timeout_secs, Some(45));
        assert!(cfg.timeout_active);
    }

    #[test]
    fn unparseable_timeout_is_fatal() {
        let facts = physical_desktop_facts();
        let source = ConfigSource::Automation(automation(None, Some("abc"), None));
        let err = resolve(source, &facts).expect_err("should be fatal");
        assert!(err.to_string().contains("is not a number"));
    }

    #[test]
    fn build_types_split_preserves_order_and_duplicates() {
        let facts = physical_desktop_facts();
        let source =
            ConfigSource::Automation(automation(None, None, Some("Laptop, Desktop,Laptop")));
        let cfg = resolve(source, &facts).expect("resolve");
        assert_eq!(
            cfg.build_types.as_deref(),
            Some(&["Laptop".to_string(), " Desktop".to_string(), "Laptop".to_string()][..])
        );
        assert!(cfg.buildtype_active);
    }

    #[test]
    fn build_types_with_empty_first_entry_stay_inactive() {
        let facts = physical_desktop_facts();
        let source = ConfigSource::Automation(automation(None, None, Some(",Laptop")));
        let cfg = resolve(source, &facts).expect("resolve");
        assert!(!cfg.buildtype_active);
    }

    #[test]
    fn manual_inputs_follow_the_same_rules() {
        let facts = physical_desktop_facts();
        let inputs = ManualInputs {
            regex: Some("^LAB-[0-9]+$".to_string()),
            timeout_secs: Some(0),
            build_types: Some(vec!["Kiosk".to_string()]),
        };
        let cfg = resolve(ConfigSource::Manual(&inputs), &facts).expect("resolve");
        assert!(cfg.regex_active);
        assert!(!cfg.timeout_active, "zero timeout is inactive in manual mode too");
        assert!(cfg.buildtype_active);
    }

    #[test]
    fn manual_unanchored_pattern_is_fatal_on_physical_hardware() {
        let facts = physical_desktop_facts();
        let inputs = ManualInputs {
            regex: Some("LAB-[0-9]+".to_string()),
            ..ManualInputs::default()
        };
        resolve(ConfigSource::Manual(&inputs), &facts).expect_err("should be fatal");
    }
}
