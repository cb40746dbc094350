//! Deterministic, pure logic shared by the gather flows.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! data structures and return deterministic outputs suitable for tests.

pub mod chassis;
pub mod config;
pub mod countdown;
pub mod types;
pub mod workflow;
