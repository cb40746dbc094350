//! Deployment front-end that gathers and validates machine identity.
//!
//! The binary runs during OS deployment, either embedded in the
//! task-sequence engine (automation mode) or standalone, and drives a
//! timed, cancellable confirmation of the machine's hostname and build
//! type before handing control back to the sequence. The architecture
//! enforces a strict separation:
//!
//! - **[`core`]**: Pure, deterministic logic (chassis classification,
//!   configuration resolution, the validation workflow). No I/O, fully
//!   testable in isolation.
//! - **[`io`]**: Side-effecting adapters (variable store, hardware facts,
//!   session probing, console frontend). Isolated to enable fakes in
//!   tests.
//!
//! Orchestration modules ([`gather`], [`silent`], [`submit`]) coordinate
//! core logic with I/O to implement the run modes.

pub mod core;
pub mod exit_codes;
pub mod gather;
pub mod io;
pub mod logging;
pub mod silent;
pub mod submit;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
