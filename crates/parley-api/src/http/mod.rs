//! HTTP/REST API layer for Parley.
//!
//! Axum-based REST API under `/api` with CORS support and request tracing.

pub mod error;
pub mod handlers;
pub mod router;
