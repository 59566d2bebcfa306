//! Shared domain types for formbot.
//!
//! This crate contains the data that crosses crate boundaries: persisted
//! wizard forms, inbound updates, outgoing messages, configuration, and the
//! error enums used by the engine and its ports.
//!
//! Zero infrastructure dependencies -- only serde and thiserror.

pub mod config;
pub mod error;
pub mod event;
pub mod form;
pub mod reply;
