//! Completion provider port and retry policy.

pub mod client;
pub mod retry;
