//! Test-only fakes for the store, facts provider, session probe, frontend,
//! and input source.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::Sender;

use anyhow::{Result, anyhow};

use crate::core::config::ManualInputs;
use crate::core::types::{ChassisClass, MachineFacts, SubmissionResult};
use crate::core::workflow::WorkflowEvent;
use crate::io::console::{FormView, Frontend, InputSource};
use crate::io::facts::FactsProvider;
use crate::io::session::SessionProbe;
use crate::io::store::VariableStore;

/// Facts for a physical desktop with a valid asset tag.
pub fn physical_desktop_facts() -> MachineFacts {
    MachineFacts {
        manufacturer: "Dell Inc.".to_string(),
        model: "OptiPlex 7080".to_string(),
        enclosure_label: "Desktop - Tower".to_string(),
        chassis_class: ChassisClass::Desktop,
        is_virtual_machine: false,
        hostname_candidate: "PC-1234".to_string(),
    }
}

/// Facts for a Hyper-V guest.
pub fn vm_facts() -> MachineFacts {
    MachineFacts {
        manufacturer: "Microsoft Corporation".to_string(),
        model: "Hyper-V VM".to_string(),
        enclosure_label: "Virtual Machine".to_string(),
        chassis_class: ChassisClass::Vm,
        is_virtual_machine: true,
        hostname_candidate: "WIN-TEMP01".to_string(),
    }
}

/// In-memory variable store: the local stand-in for the engine store.
pub struct MemoryStore {
    automation: bool,
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn automation() -> Self {
        Self {
            automation: true,
            values: Mutex::new(HashMap::new()),
        }
    }

    pub fn standalone() -> Self {
        Self {
            automation: false,
            values: Mutex::new(HashMap::new()),
        }
    }

    pub fn seed(&self, name: &str, value: &str) {
        self.values
            .lock()
            .expect("store lock")
            .insert(name.to_string(), value.to_string());
    }

    pub fn value(&self, name: &str) -> Option<String> {
        self.values.lock().expect("store lock").get(name).cloned()
    }

    pub fn is_empty(&self) -> bool {
        self.values.lock().expect("store lock").is_empty()
    }
}

impl VariableStore for MemoryStore {
    fn is_automation(&self) -> bool {
        self.automation
    }

    fn get(&self, name: &str) -> Result<Option<String>> {
        Ok(self.value(name))
    }

    fn set(&self, name: &str, value: &str) -> Result<()> {
        self.seed(name, value);
        Ok(())
    }
}

/// Scripted hardware inventory.
pub struct FakeFacts {
    values: Mutex<HashMap<(String, String), Vec<String>>>,
}

impl FakeFacts {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self {
            values: Mutex::new(HashMap::new()),
        }
    }

    pub fn set(&self, class: &str, property: &str, values: &[&str]) {
        self.values.lock().expect("facts lock").insert(
            (class.to_string(), property.to_string()),
            values.iter().map(|v| v.to_string()).collect(),
        );
    }
}

impl FactsProvider for FakeFacts {
    fn query(&self, class: &str, property: &str) -> Result<Vec<String>> {
        Ok(self
            .values
            .lock()
            .expect("facts lock")
            .get(&(class.to_string(), property.to_string()))
            .cloned()
            .unwrap_or_default())
    }
}

/// Scripted session probe.
pub struct FakeProbe {
    current: u32,
    processes: HashMap<String, u32>,
    fail_relaunch: bool,
    relaunches: AtomicUsize,
}

impl FakeProbe {
    pub fn new(current: u32) -> Self {
        Self {
            current,
            processes: HashMap::new(),
            fail_relaunch: false,
            relaunches: AtomicUsize::new(0),
        }
    }

    pub fn with_process(mut self, name: &str, session: u32) -> Self {
        self.processes.insert(name.to_string(), session);
        self
    }

    pub fn failing_relaunch(mut self) -> Self {
        self.fail_relaunch = true;
        self
    }

    pub fn relaunches(&self) -> usize {
        self.relaunches.load(Ordering::Relaxed)
    }
}

impl SessionProbe for FakeProbe {
    fn find_session_of(&self, name: &str) -> Result<Option<u32>> {
        Ok(self.processes.get(name).copied())
    }

    fn current_session(&self) -> Result<u32> {
        Ok(self.current)
    }

    fn relaunch(&self, _exe: &Path) -> Result<()> {
        if self.fail_relaunch {
            return Err(anyhow!("process creation failed"));
        }
        self.relaunches.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

/// Frontend that records everything it is asked to render.
#[derive(Default)]
pub struct RecordingFrontend {
    pub clocks: Vec<String>,
    pub errors: Vec<String>,
    pub notices: Vec<String>,
    pub forms_shown: usize,
    pub summaries: Vec<(MachineFacts, Option<SubmissionResult>)>,
    /// Returned from `read_manual_inputs`.
    pub manual_inputs: ManualInputs,
}

impl Frontend for RecordingFrontend {
    fn show_form(&mut self, _view: &FormView<'_>) -> Result<()> {
        self.forms_shown += 1;
        Ok(())
    }

    fn show_clock(&mut self, clock: &str) -> Result<()> {
        self.clocks.push(clock.to_string());
        Ok(())
    }

    fn show_error(&mut self, message: &str) -> Result<()> {
        self.errors.push(message.to_string());
        Ok(())
    }

    fn notify(&mut self, message: &str) -> Result<()> {
        self.notices.push(message.to_string());
        Ok(())
    }

    fn show_summary(
        &mut self,
        facts: &MachineFacts,
        result: Option<&SubmissionResult>,
    ) -> Result<()> {
        self.summaries.push((facts.clone(), result.cloned()));
        Ok(())
    }

    fn read_manual_inputs(&mut self) -> Result<ManualInputs> {
        Ok(self.manual_inputs.clone())
    }
}

/// Input source that replays a fixed event sequence and then goes quiet.
pub struct ScriptedInput {
    events: Vec<WorkflowEvent>,
}

impl ScriptedInput {
    pub fn new(events: Vec<WorkflowEvent>) -> Self {
        Self { events }
    }
}

impl InputSource for ScriptedInput {
    fn start(&mut self, tx: Sender<WorkflowEvent>) {
        for event in self.events.drain(..) {
            if tx.send(event).is_err() {
                break;
            }
        }
    }
}
