//! Console frontend for the confirmation form.
//!
//! Dialog rendering is deliberately out of the core: the workflow only sees
//! the [`Frontend`] output surface and a stream of [`WorkflowEvent`]s from
//! an [`InputSource`]. The console implementation maps the original form
//! gestures onto input lines:
//!
//! ```text
//! host <name>         edit the hostname field
//! type <build type>   pick one of the allowed build types
//! submit              confirm the form (empty line works too)
//! submit +override    confirm with the override chord held
//! submit +fail        confirm with escape held (forced failure)
//! ```

use std::io::{BufRead, Write};
use std::sync::mpsc::Sender;
use std::thread;

use anyhow::{Context, Result, anyhow};
use tracing::debug;

use crate::core::config::{EffectiveConfig, ManualInputs};
use crate::core::types::{FormFields, MachineFacts, ModifierSample, SubmissionResult};
use crate::core::workflow::WorkflowEvent;

/// Everything the frontend needs to render the confirmation form.
#[derive(Debug)]
pub struct FormView<'a> {
    pub facts: &'a MachineFacts,
    pub config: &'a EffectiveConfig,
    pub fields: &'a FormFields,
    /// True when a countdown was configured but could not start.
    pub timer_suspended: bool,
}

/// Output surface of the interaction, kept behind a trait so tests can
/// script it.
pub trait Frontend {
    fn show_form(&mut self, view: &FormView<'_>) -> Result<()>;
    fn show_clock(&mut self, clock: &str) -> Result<()>;
    fn show_error(&mut self, message: &str) -> Result<()>;
    fn notify(&mut self, message: &str) -> Result<()>;
    /// Human-readable summary for standalone runs; `result` is `None` on a
    /// silent run.
    fn show_summary(
        &mut self,
        facts: &MachineFacts,
        result: Option<&SubmissionResult>,
    ) -> Result<()>;
    /// Capture operator test values for manual mode. Blank fields stay
    /// unset; a non-numeric timeout is a fatal input error.
    fn read_manual_inputs(&mut self) -> Result<ManualInputs>;
}

/// Producer of operator events feeding the workflow queue.
pub trait InputSource {
    /// Start delivering events into `tx`. Returns once delivery is set up;
    /// the source stops when the receiver goes away.
    fn start(&mut self, tx: Sender<WorkflowEvent>);
}

/// Stdin/stdout implementation used by the real binary.
pub struct Console;

impl Frontend for Console {
    fn show_form(&mut self, view: &FormView<'_>) -> Result<()> {
        let mut out = std::io::stdout().lock();
        writeln!(out, "Machine identity")?;
        writeln!(out, "  Hostname:  {}", view.fields.hostname)?;
        writeln!(out, "  Model:     {}", view.facts.model)?;
        writeln!(out, "  Make:      {}", view.facts.manufacturer)?;
        writeln!(out, "  Enclosure: {}", view.facts.enclosure_label)?;
        if view.config.buildtype_active
            && let Some(types) = view.config.build_types.as_deref()
        {
            writeln!(out, "  Build types: {}", types.join(", "))?;
            if let Some(selected) = view.fields.build_type.as_deref() {
                writeln!(out, "  Selected:    {selected}")?;
            }
        }
        if view.timer_suspended {
            writeln!(out, "Hostname Invalid.\nTimer Suspended.")?;
        }
        writeln!(
            out,
            "Commands: host <name> | type <build type> | submit [+override] [+fail]"
        )?;
        out.flush().context("flush form")
    }

    fn show_clock(&mut self, clock: &str) -> Result<()> {
        let mut out = std::io::stdout().lock();
        write!(out, "\r{clock}")?;
        out.flush().context("flush clock")
    }

    fn show_error(&mut self, message: &str) -> Result<()> {
        let mut out = std::io::stdout().lock();
        writeln!(out, "\nInvalid: {message}")?;
        out.flush().context("flush error")
    }

    fn notify(&mut self, message: &str) -> Result<()> {
        let mut out = std::io::stdout().lock();
        writeln!(out, "{message}")?;
        out.flush().context("flush notice")
    }

    fn show_summary(
        &mut self,
        facts: &MachineFacts,
        result: Option<&SubmissionResult>,
    ) -> Result<()> {
        let mut out = std::io::stdout().lock();
        writeln!(out, "Submission successful")?;
        if let Some(result) = result
            && let Some(hostname) = result.hostname.as_deref()
        {
            writeln!(out, "  Hostname:  {hostname}")?;
        }
        writeln!(out, "  Model:     {}", facts.model)?;
        writeln!(out, "  Make:      {}", facts.manufacturer)?;
        writeln!(
            out,
            "  Enclosure: {}/{}",
            facts.enclosure_label, facts.chassis_class
        )?;
        if let Some(result) = result
            && let Some(build_type) = result.build_type.as_deref()
        {
            writeln!(out, "  Build type: {build_type}")?;
        }
        out.flush().context("flush summary")
    }

    fn read_manual_inputs(&mut self) -> Result<ManualInputs> {
        let stdin = std::io::stdin();
        let mut lines = stdin.lock().lines();
        let mut prompt = |label: &str| -> Result<Option<String>> {
            print!("{label}: ");
            std::io::stdout().flush().context("flush prompt")?;
            let line = lines
                .next()
                .transpose()
                .context("read test input")?
                .unwrap_or_default();
            let trimmed = line.trim();
            if trimmed.is_empty() {
                Ok(None)
            } else {
                Ok(Some(trimmed.to_string()))
            }
        };

        let regex = prompt("Hostname pattern (blank for none)")?;
        let timeout_secs = prompt("Timeout seconds (blank for none)")?
            .map(|raw| {
                raw.parse::<u32>()
                    .map_err(|_| anyhow!("timeout '{raw}' is not a number"))
            })
            .transpose()?;
        let build_types = prompt("Build types, comma separated (blank for none)")?
            .map(|raw| raw.split(',').map(str::to_string).collect());

        Ok(ManualInputs {
            regex,
            timeout_secs,
            build_types,
        })
    }
}

/// Stdin reader thread minting workflow events.
pub struct ConsoleInput;

impl InputSource for ConsoleInput {
    fn start(&mut self, tx: Sender<WorkflowEvent>) {
        thread::spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                let Ok(line) = line else { break };
                match parse_input_line(&line) {
                    Some(event) => {
                        debug!(?event, "operator input");
                        if tx.send(event).is_err() {
                            break;
                        }
                    }
                    None => println!(
                        "Unrecognized input. Commands: host <name> | type <build type> | submit"
                    ),
                }
            }
        });
    }
}

/// Map one console line onto a workflow event. `None` means the line was
/// not understood.
pub fn parse_input_line(line: &str) -> Option<WorkflowEvent> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Some(WorkflowEvent::Submit(ModifierSample::default()));
    }

    let (verb, rest) = match trimmed.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (trimmed, ""),
    };

    match verb {
        "submit" => {
            let mut modifiers = ModifierSample::default();
            for token in rest.split_whitespace() {
                match token {
                    "+override" => modifiers.override_chord = true,
                    "+fail" => modifiers.escape = true,
                    _ => return None,
                }
            }
            Some(WorkflowEvent::Submit(modifiers))
        }
        "host" | "hostname" if !rest.is_empty() => {
            Some(WorkflowEvent::SetHostname(rest.to_string()))
        }
        "type" | "buildtype" if !rest.is_empty() => {
            Some(WorkflowEvent::SelectBuildType(rest.to_string()))
        }
        _ => None,
    }
}
