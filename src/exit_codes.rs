//! Stable exit codes for the gather binary.

/// Normal completion, including a relaunch handoff.
pub const OK: i32 = 0;
/// Fatal configuration, argument, or runtime error; nothing was submitted.
pub const INVALID: i32 = 1;
/// Deliberate forced failure via the escape gesture at submit.
pub const FORCED_FAIL: i32 = 4;
