//! SQLite storage layer.
//!
//! Wizard state persistence backed by SQLite with WAL mode and split
//! read/write connection pools.

pub mod pool;
pub mod state;
