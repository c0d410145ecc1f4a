//! Infrastructure layer for Parley.
//!
//! Contains implementations of the port traits defined in `parley-core`:
//! SQLite conversation storage and the OpenAI-compatible completion client.

pub mod llm;
pub mod sqlite;
