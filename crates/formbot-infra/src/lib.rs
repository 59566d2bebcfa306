//! Infrastructure layer for formbot.
//!
//! Implementations of the ports defined in `formbot-core`: SQLite and
//! in-memory wizard state storage, TOML translation catalogs, and the
//! configuration loader.

pub mod config;
pub mod locale;
pub mod memory;
pub mod sqlite;
