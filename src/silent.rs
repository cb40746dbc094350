//! Headless resolve-and-submit flow for `--silent`.
//!
//! Gathers the machine identity and submits it without ever entering the
//! validation workflow; only chassis, model and make reach the store. The
//! gather configuration is still resolved and discarded, so malformed
//! variables are fatal in every mode.

use anyhow::{Context, Result};

use crate::core::config::{ConfigSource, resolve};
use crate::io::console::Frontend;
use crate::io::facts::{FactsProvider, gather_facts};
use crate::io::store::{VariableStore, read_config_values};
use crate::submit::submit;

pub fn run_silent(
    store: &dyn VariableStore,
    provider: &dyn FactsProvider,
    frontend: &mut dyn Frontend,
) -> Result<()> {
    let facts = gather_facts(provider, store)?;
    let values = read_config_values(store).context("read gather variables")?;
    resolve(ConfigSource::Automation(values), &facts)?;
    submit(store, frontend, &facts, None)
}
