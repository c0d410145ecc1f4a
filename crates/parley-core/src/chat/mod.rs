//! Conversation persistence port and the message pipeline.

pub mod pipeline;
pub mod store;
