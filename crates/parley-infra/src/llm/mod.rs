//! Completion provider clients.

pub mod openai_compat;
mod types;
