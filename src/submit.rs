//! Result Submitter: persist the run's decision back to the variable store.
//!
//! Always the last action on the accepted path, executed exactly once. In
//! automation mode the machine-identity trio is always written; hostname
//! and build type join it unless the run was silent. Standalone runs
//! persist nothing and surface a summary instead.

use anyhow::Result;
use tracing::info;

use crate::core::types::{MachineFacts, SubmissionResult};
use crate::io::console::Frontend;
use crate::io::store::{VariableStore, vars};

/// Write the collected values, or render them for a standalone run.
/// `result` is `None` on a silent (no-interaction) submission.
pub fn submit(
    store: &dyn VariableStore,
    frontend: &mut dyn Frontend,
    facts: &MachineFacts,
    result: Option<&SubmissionResult>,
) -> Result<()> {
    if store.is_automation() {
        info!(
            chassis = %facts.chassis_class,
            model = facts.model,
            make = facts.manufacturer,
            "submitting machine identity"
        );
        store.set(vars::CHASSIS, &facts.chassis_class.to_string())?;
        store.set(vars::MODEL, &facts.model)?;
        store.set(vars::MAKE, &facts.manufacturer)?;

        if let Some(result) = result {
            if let Some(build_type) = result.build_type.as_deref() {
                store.set(vars::BUILD_TYPE, build_type)?;
            }
            if let Some(hostname) = result.hostname.as_deref() {
                store.set(vars::COMPUTER_NAME, hostname)?;
            }
            if result.override_requested {
                info!("override requested, persisting");
                store.set(vars::OVERRIDE, "true")?;
            }
        }
        return Ok(());
    }

    // Standalone: the override gesture is informational only.
    if let Some(result) = result
        && result.override_requested
    {
        frontend.notify("Supported model overridden.")?;
    }
    info!("standalone run, displaying submission summary");
    frontend.show_summary(facts, result)
}
