//! Orchestration for the interactive gather flow.
//!
//! Resolves the effective configuration from exactly one source, arms the
//! validation workflow, pumps it with operator input plus the countdown
//! tick source, and hands the accepted result to the submitter. The
//! workflow context is single-threaded: the timer thread and the input
//! reader only enqueue events onto one channel, and the loop below is the
//! sole consumer.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use tracing::{debug, info};

use crate::core::config::{ConfigSource, EffectiveConfig, resolve};
use crate::core::types::MachineFacts;
use crate::core::workflow::{Phase, Reaction, Workflow, WorkflowEvent};
use crate::io::console::{FormView, Frontend, InputSource};
use crate::io::facts::{FactsProvider, gather_facts};
use crate::io::store::{VariableStore, read_config_values, vars};
use crate::submit::submit;

/// Terminal outcome of the interactive flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatherOutcome {
    /// The accepted result was handed to the submitter.
    Submitted,
    /// Escape was held at submit: exit with the forced-failure code. Only
    /// the override chord sampled in the same gesture was acted on.
    ForcedFail,
}

/// Run the full interactive flow: facts, configuration, workflow,
/// submission. `testing` selects the operator test-input source instead of
/// the engine store.
pub fn run_gather(
    store: &dyn VariableStore,
    provider: &dyn FactsProvider,
    frontend: &mut dyn Frontend,
    input: &mut dyn InputSource,
    testing: bool,
) -> Result<GatherOutcome> {
    let facts = gather_facts(provider, store).context("gather machine facts")?;

    let config = if testing {
        let manual = frontend.read_manual_inputs().context("read test inputs")?;
        resolve(ConfigSource::Manual(&manual), &facts)?
    } else {
        let values = read_config_values(store).context("read gather variables")?;
        resolve(ConfigSource::Automation(values), &facts)?
    };

    let previous_build_type = store.get(vars::BUILD_TYPE)?;

    match drive_workflow(&config, &facts, previous_build_type.as_deref(), frontend, input)? {
        Decision::Accepted(result) => {
            submit(store, frontend, &facts, Some(&result))?;
            Ok(GatherOutcome::Submitted)
        }
        Decision::ForcedFail { override_requested } => {
            // The chord is acted on before the failout; the rest of the
            // submission never happens.
            if override_requested {
                if store.is_automation() {
                    info!("override requested, persisting before failout");
                    store.set(vars::OVERRIDE, "true")?;
                } else {
                    frontend.notify("Supported model overridden.")?;
                }
            }
            Ok(GatherOutcome::ForcedFail)
        }
    }
}

/// Workflow verdict before submission.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Decision {
    Accepted(crate::core::types::SubmissionResult),
    ForcedFail { override_requested: bool },
}

/// Pump the workflow until it accepts or fails out.
///
/// One timer thread is the only tick producer; it is stopped (and any
/// stale tick ignored by the workflow) before a finalized submission is
/// acted on.
fn drive_workflow(
    config: &EffectiveConfig,
    facts: &MachineFacts,
    previous_build_type: Option<&str>,
    frontend: &mut dyn Frontend,
    input: &mut dyn InputSource,
) -> Result<Decision> {
    let mut workflow = Workflow::new(config, facts, previous_build_type);
    frontend.show_form(&FormView {
        facts,
        config,
        fields: workflow.fields(),
        timer_suspended: workflow.phase() == Phase::TimerSuspended,
    })?;

    let (tx, rx) = mpsc::channel();
    let timer_stop = Arc::new(AtomicBool::new(false));

    if workflow.countdown_armed() {
        frontend.show_clock(&workflow.clock())?;
        spawn_timer(tx.clone(), Arc::clone(&timer_stop));
    }
    input.start(tx);

    loop {
        let event = rx
            .recv()
            .map_err(|_| anyhow!("input ended without a submission"))?;
        if matches!(event, WorkflowEvent::Submit(_)) {
            // Stop the countdown before finalization begins.
            timer_stop.store(true, Ordering::Relaxed);
        }
        match workflow.handle(event) {
            Reaction::None => {}
            Reaction::Redisplay { clock } => frontend.show_clock(&clock)?,
            Reaction::Rejected { message } => frontend.show_error(&message)?,
            Reaction::ForcedFail { override_requested } => {
                timer_stop.store(true, Ordering::Relaxed);
                return Ok(Decision::ForcedFail { override_requested });
            }
            Reaction::Accepted(result) => {
                timer_stop.store(true, Ordering::Relaxed);
                debug!(?result, "workflow accepted");
                return Ok(Decision::Accepted(result));
            }
        }
    }
}

/// One-second tick source. The workflow treats ticks arriving after it
/// left the countdown phase as stale, so a racing final tick is harmless.
fn spawn_timer(tx: mpsc::Sender<WorkflowEvent>, stop: Arc<AtomicBool>) {
    thread::spawn(move || {
        loop {
            thread::sleep(Duration::from_secs(1));
            if stop.load(Ordering::Relaxed) {
                break;
            }
            if tx.send(WorkflowEvent::Tick).is_err() {
                break;
            }
        }
        info!("countdown timer stopped");
    });
}
