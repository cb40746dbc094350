//! Timed, cancellable confirmation workflow.
//!
//! A pure state machine: the driver owns the event queue (operator input
//! plus one countdown tick source) and feeds events in serially; every
//! transition comes back as a [`Reaction`] for the driver to act on. No
//! second timer is ever armed, and a tick arriving after the machine has
//! left [`Phase::Countdown`] is ignored, so stopping the timer before
//! finalization completes is safe on every path.

use tracing::{debug, info};

use crate::core::config::EffectiveConfig;
use crate::core::countdown::format_clock;
use crate::core::types::{FormFields, MachineFacts, ModifierSample, SubmissionResult};

/// Workflow phase. `Accepted` is terminal; the forced-failure escape path
/// terminates the process instead of transitioning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Waiting for an explicit submission; no countdown configured.
    Idle,
    /// A countdown was configured but the hostname is invalid, so the
    /// timer never started (or was stopped by a rejected submission).
    TimerSuspended,
    /// Countdown running; expiry auto-submits the current field values.
    Countdown,
    Accepted,
}

/// Input consumed by the workflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowEvent {
    /// One-second countdown tick.
    Tick,
    SetHostname(String),
    SelectBuildType(String),
    /// Explicit operator submission with the sampled modifier state.
    Submit(ModifierSample),
}

/// What the driver must do after an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reaction {
    None,
    /// Re-render the countdown display.
    Redisplay { clock: String },
    /// Recoverable validation failure; the workflow stays active.
    Rejected { message: String },
    /// Escape was held during finalization: terminate with the forced
    /// failure code, bypassing result submission. The override chord is
    /// sampled in the same gesture and still takes effect first.
    ForcedFail { override_requested: bool },
    /// Terminal acceptance; the only path that produces a result.
    Accepted(SubmissionResult),
}

/// Validation workflow over one immutable configuration and fact set.
#[derive(Debug)]
pub struct Workflow<'a> {
    config: &'a EffectiveConfig,
    facts: &'a MachineFacts,
    fields: FormFields,
    phase: Phase,
    remaining_secs: i64,
}

impl<'a> Workflow<'a> {
    /// Set up the workflow with the hostname candidate and build-type
    /// preselection (the store's previous choice when still allowed, else
    /// the first entry).
    pub fn new(
        config: &'a EffectiveConfig,
        facts: &'a MachineFacts,
        previous_build_type: Option<&str>,
    ) -> Self {
        let hostname = facts.hostname_candidate.clone();
        let build_type = preselect_build_type(config, previous_build_type);
        let remaining_secs = i64::from(config.timeout_secs.unwrap_or(0));

        let phase = if !config.timeout_active {
            Phase::Idle
        } else if config.regex_active && !config.hostname_matches(&hostname) {
            Phase::TimerSuspended
        } else {
            Phase::Countdown
        };
        debug!(?phase, hostname, remaining_secs, "workflow armed");

        Self {
            config,
            facts,
            fields: FormFields {
                hostname,
                build_type,
            },
            phase,
            remaining_secs,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn fields(&self) -> &FormFields {
        &self.fields
    }

    /// True while the driver must keep the one-second tick source running.
    pub fn countdown_armed(&self) -> bool {
        self.phase == Phase::Countdown
    }

    /// Initial clock text for the armed countdown.
    pub fn clock(&self) -> String {
        format_clock(self.remaining_secs)
    }

    /// Feed one event through the machine.
    pub fn handle(&mut self, event: WorkflowEvent) -> Reaction {
        match event {
            WorkflowEvent::Tick => self.on_tick(),
            WorkflowEvent::SetHostname(hostname) => {
                if self.phase != Phase::Accepted {
                    self.fields.hostname = hostname;
                }
                Reaction::None
            }
            WorkflowEvent::SelectBuildType(choice) => self.on_select_build_type(choice),
            WorkflowEvent::Submit(modifiers) => {
                if self.phase == Phase::Accepted {
                    Reaction::None
                } else {
                    self.finalize(modifiers)
                }
            }
        }
    }

    fn on_tick(&mut self) -> Reaction {
        if self.phase != Phase::Countdown {
            // Stale tick from a stopped timer.
            return Reaction::None;
        }
        self.remaining_secs -= 1;
        if self.remaining_secs < 0 {
            info!("countdown expired, auto-submitting current values");
            self.finalize(ModifierSample::default())
        } else {
            Reaction::Redisplay {
                clock: format_clock(self.remaining_secs),
            }
        }
    }

    fn on_select_build_type(&mut self, choice: String) -> Reaction {
        if self.phase == Phase::Accepted {
            return Reaction::None;
        }
        let allowed = self
            .config
            .build_types
            .as_deref()
            .is_some_and(|types| types.iter().any(|t| t == &choice));
        if !allowed {
            return Reaction::Rejected {
                message: format!("'{choice}' is not one of the allowed build types"),
            };
        }
        self.fields.build_type = Some(choice);
        Reaction::None
    }

    /// Finalize a submission. Any pending countdown is already out of play:
    /// the phase leaves `Countdown` on every branch below, so later ticks
    /// are ignored while the driver shuts the timer down.
    fn finalize(&mut self, modifiers: ModifierSample) -> Reaction {
        let hostname_ok = self.config.hostname_matches(&self.fields.hostname);
        if self.config.regex_active && !hostname_ok && !self.facts.is_virtual_machine {
            self.phase = if self.config.timeout_active {
                Phase::TimerSuspended
            } else {
                Phase::Idle
            };
            debug!(hostname = %self.fields.hostname, "hostname rejected at submit");
            return Reaction::Rejected {
                message: "Hostname does not meet standards".to_string(),
            };
        }

        if modifiers.escape {
            info!(
                override_requested = modifiers.override_chord,
                "escape held at submit, forcing failure"
            );
            return Reaction::ForcedFail {
                override_requested: modifiers.override_chord,
            };
        }

        let hostname = self.fields.hostname.to_uppercase();
        info!(
            hostname,
            build_type = self.fields.build_type.as_deref(),
            override_requested = modifiers.override_chord,
            "submission accepted"
        );
        self.phase = Phase::Accepted;
        Reaction::Accepted(SubmissionResult {
            hostname: Some(hostname),
            build_type: self.fields.build_type.clone(),
            override_requested: modifiers.override_chord,
            aborted: false,
        })
    }
}

fn preselect_build_type(
    config: &EffectiveConfig,
    previous: Option<&str>,
) -> Option<String> {
    if !config.buildtype_active {
        return None;
    }
    let types = config.build_types.as_deref()?;
    if let Some(previous) = previous
        && types.iter().any(|t| t == previous)
    {
        return Some(previous.to_string());
    }
    types.first().cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::{ConfigSource, StoreValues, resolve};
    use crate::test_support::{physical_desktop_facts, vm_facts};

    fn config_for(
        facts: &MachineFacts,
        regex: Option<&str>,
        timeout: Option<&str>,
        builds: Option<&str>,
    ) -> EffectiveConfig {
        resolve(
            ConfigSource::Automation(StoreValues {
                regex: regex.map(str::to_string),
                timeout: timeout.map(str::to_string),
                build_types: builds.map(str::to_string),
            }),
            facts,
        )
        .expect("resolve")
    }

    fn submit() -> WorkflowEvent {
        WorkflowEvent::Submit(ModifierSample::default())
    }

    #[test]
    fn no_timeout_starts_idle_and_waits_for_submission() {
        let facts = physical_desktop_facts();
        let cfg = config_for(&facts, Some("^PC-[0-9]{4}$"), Some("0"), None);
        let wf = Workflow::new(&cfg, &facts, None);
        assert_eq!(wf.phase(), Phase::Idle);
        assert!(!wf.countdown_armed());
    }

    #[test]
    fn valid_hostname_with_timeout_starts_countdown() {
        let facts = physical_desktop_facts();
        let cfg = config_for(&facts, Some("^PC-[0-9]{4}$"), Some("45"), None);
        let wf = Workflow::new(&cfg, &facts, None);
        assert_eq!(wf.phase(), Phase::Countdown);
        assert_eq!(wf.clock(), "00:00:45");
    }

    #[test]
    fn invalid_hostname_with_timeout_suspends_the_timer() {
        let facts = MachineFacts {
            hostname_candidate: "UNTAGGED".to_string(),
            ..physical_desktop_facts()
        };
        let cfg = config_for(&facts, Some("^PC-[0-9]{4}$"), Some("45"), None);
        let wf = Workflow::new(&cfg, &facts, None);
        assert_eq!(wf.phase(), Phase::TimerSuspended);
    }

    #[test]
    fn timeout_without_regex_counts_down_unconditionally() {
        let facts = MachineFacts {
            hostname_candidate: "anything at all".to_string(),
            ..physical_desktop_facts()
        };
        let cfg = config_for(&facts, None, Some("10"), None);
        let wf = Workflow::new(&cfg, &facts, None);
        assert_eq!(wf.phase(), Phase::Countdown);
    }

    #[test]
    fn ticks_decrement_and_clamp_the_display() {
        let facts = physical_desktop_facts();
        let cfg = config_for(&facts, None, Some("2"), None);
        let mut wf = Workflow::new(&cfg, &facts, None);

        assert_eq!(
            wf.handle(WorkflowEvent::Tick),
            Reaction::Redisplay {
                clock: "00:00:01".to_string()
            }
        );
        assert_eq!(
            wf.handle(WorkflowEvent::Tick),
            Reaction::Redisplay {
                clock: "00:00:00".to_string()
            }
        );
    }

    #[test]
    fn tick_past_zero_auto_submits_the_current_hostname() {
        let facts = physical_desktop_facts();
        let cfg = config_for(&facts, None, Some("1"), None);
        let mut wf = Workflow::new(&cfg, &facts, None);

        wf.handle(WorkflowEvent::SetHostname("pc-9999".to_string()));
        assert_eq!(
            wf.handle(WorkflowEvent::Tick),
            Reaction::Redisplay {
                clock: "00:00:00".to_string()
            }
        );
        let reaction = wf.handle(WorkflowEvent::Tick);
        match reaction {
            Reaction::Accepted(result) => {
                assert_eq!(result.hostname.as_deref(), Some("PC-9999"));
                assert!(!result.override_requested);
            }
            other => panic!("expected auto-submit, got {other:?}"),
        }
        assert_eq!(wf.phase(), Phase::Accepted);
    }

    #[test]
    fn stale_tick_after_acceptance_is_ignored() {
        let facts = physical_desktop_facts();
        let cfg = config_for(&facts, None, Some("1"), None);
        let mut wf = Workflow::new(&cfg, &facts, None);
        wf.handle(WorkflowEvent::Tick);
        wf.handle(WorkflowEvent::Tick);
        assert_eq!(wf.phase(), Phase::Accepted);
        assert_eq!(wf.handle(WorkflowEvent::Tick), Reaction::None);
    }

    #[test]
    fn rejected_submission_keeps_the_workflow_active() {
        let facts = MachineFacts {
            hostname_candidate: "UNTAGGED".to_string(),
            ..physical_desktop_facts()
        };
        let cfg = config_for(&facts, Some("^PC-[0-9]{4}$"), Some("30"), None);
        let mut wf = Workflow::new(&cfg, &facts, None);
        assert_eq!(wf.phase(), Phase::TimerSuspended);

        let reaction = wf.handle(submit());
        assert!(matches!(reaction, Reaction::Rejected { .. }));
        assert_eq!(wf.phase(), Phase::TimerSuspended);

        // Correct the hostname and the same workflow accepts.
        wf.handle(WorkflowEvent::SetHostname("PC-0042".to_string()));
        match wf.handle(submit()) {
            Reaction::Accepted(result) => {
                assert_eq!(result.hostname.as_deref(), Some("PC-0042"));
            }
            other => panic!("expected acceptance, got {other:?}"),
        }
    }

    #[test]
    fn validation_checks_the_raw_field_not_the_committed_casing() {
        // Matching is case-sensitive on the field as entered; upper-casing
        // happens only on the committed value and never feeds back into
        // validation.
        let facts = physical_desktop_facts();
        let cfg = config_for(&facts, Some("^PC-[0-9]{4}$"), None, None);
        let mut wf = Workflow::new(&cfg, &facts, None);
        wf.handle(WorkflowEvent::SetHostname("pc-1234".to_string()));
        assert!(matches!(wf.handle(submit()), Reaction::Rejected { .. }));

        wf.handle(WorkflowEvent::SetHostname("PC-1234".to_string()));
        assert!(matches!(wf.handle(submit()), Reaction::Accepted(_)));
    }

    #[test]
    fn rejection_without_timeout_reverts_to_idle() {
        let facts = MachineFacts {
            hostname_candidate: "UNTAGGED".to_string(),
            ..physical_desktop_facts()
        };
        let cfg = config_for(&facts, Some("^PC-[0-9]{4}$"), None, None);
        let mut wf = Workflow::new(&cfg, &facts, None);
        assert!(matches!(wf.handle(submit()), Reaction::Rejected { .. }));
        assert_eq!(wf.phase(), Phase::Idle);
    }

    #[test]
    fn failing_hostname_on_a_vm_is_still_accepted() {
        // Pattern enforcement is VM-exempt even if a pattern somehow stayed
        // active; the workflow re-checks the VM flag at finalization.
        let facts = vm_facts();
        let physical = physical_desktop_facts();
        let cfg = config_for(&physical, Some("^PC-[0-9]{4}$"), None, None);
        assert!(cfg.regex_active);
        let mut wf = Workflow::new(&cfg, &facts, None);
        wf.handle(WorkflowEvent::SetHostname("vm-lab-01".to_string()));
        match wf.handle(submit()) {
            Reaction::Accepted(result) => {
                assert_eq!(result.hostname.as_deref(), Some("VM-LAB-01"));
            }
            other => panic!("expected acceptance, got {other:?}"),
        }
    }

    #[test]
    fn escape_forces_failure_and_produces_no_result() {
        let facts = physical_desktop_facts();
        let cfg = config_for(&facts, Some("^PC-[0-9]{4}$"), None, None);
        let mut wf = Workflow::new(&cfg, &facts, None);
        let reaction = wf.handle(WorkflowEvent::Submit(ModifierSample {
            escape: true,
            override_chord: false,
        }));
        assert_eq!(
            reaction,
            Reaction::ForcedFail {
                override_requested: false
            }
        );
        assert_ne!(wf.phase(), Phase::Accepted);
    }

    #[test]
    fn escape_with_the_chord_carries_the_override_into_the_failout() {
        let facts = physical_desktop_facts();
        let cfg = config_for(&facts, None, None, None);
        let mut wf = Workflow::new(&cfg, &facts, None);
        let reaction = wf.handle(WorkflowEvent::Submit(ModifierSample {
            escape: true,
            override_chord: true,
        }));
        assert_eq!(
            reaction,
            Reaction::ForcedFail {
                override_requested: true
            }
        );
    }

    #[test]
    fn override_chord_is_recorded_on_the_result() {
        let facts = physical_desktop_facts();
        let cfg = config_for(&facts, None, None, None);
        let mut wf = Workflow::new(&cfg, &facts, None);
        match wf.handle(WorkflowEvent::Submit(ModifierSample {
            override_chord: true,
            escape: false,
        })) {
            Reaction::Accepted(result) => assert!(result.override_requested),
            other => panic!("expected acceptance, got {other:?}"),
        }
    }

    #[test]
    fn build_type_preselection_prefers_the_previous_choice() {
        let facts = physical_desktop_facts();
        let cfg = config_for(&facts, None, None, Some("Laptop,Desktop,Kiosk"));

        let wf = Workflow::new(&cfg, &facts, Some("Desktop"));
        assert_eq!(wf.fields().build_type.as_deref(), Some("Desktop"));

        let wf = Workflow::new(&cfg, &facts, Some("Tablet"));
        assert_eq!(wf.fields().build_type.as_deref(), Some("Laptop"));

        let wf = Workflow::new(&cfg, &facts, None);
        assert_eq!(wf.fields().build_type.as_deref(), Some("Laptop"));
    }

    #[test]
    fn selecting_an_unknown_build_type_is_rejected() {
        let facts = physical_desktop_facts();
        let cfg = config_for(&facts, None, None, Some("Laptop,Desktop"));
        let mut wf = Workflow::new(&cfg, &facts, None);

        let reaction = wf.handle(WorkflowEvent::SelectBuildType("Tablet".to_string()));
        assert!(matches!(reaction, Reaction::Rejected { .. }));
        assert_eq!(wf.fields().build_type.as_deref(), Some("Laptop"));

        wf.handle(WorkflowEvent::SelectBuildType("Desktop".to_string()));
        assert_eq!(wf.fields().build_type.as_deref(), Some("Desktop"));
    }
}
