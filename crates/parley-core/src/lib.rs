//! Business logic and port trait definitions for Parley.
//!
//! This crate defines the "ports" (the [`chat::store::ConversationStore`]
//! and [`llm::client::CompletionClient`] traits) that the infrastructure
//! layer implements, plus the message pipeline orchestrating them. It
//! depends only on `parley-types` -- never on `parley-infra` or any
//! database/HTTP crate.

pub mod chat;
pub mod llm;
