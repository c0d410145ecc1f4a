//! Shared domain types for Parley.
//!
//! This crate contains the core domain types used across the Parley backend:
//! Conversation, Message, Role, the completion-provider request shapes, and
//! their associated error types.
//!
//! Zero infrastructure dependencies -- only serde, chrono, thiserror.

pub mod chat;
pub mod error;
pub mod llm;
