//! Webhook HTTP layer.
//!
//! Axum router accepting updates at `POST /updates`, with envelope
//! responses and request tracing.

pub mod error;
pub mod handlers;
pub mod response;
pub mod router;
