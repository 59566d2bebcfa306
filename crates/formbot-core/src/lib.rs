//! Wizard engine and ports for formbot.
//!
//! This crate defines the "ports" the infrastructure layer implements
//! (state storage, transport, localization) and the engine that drives
//! multi-step forms over them. It depends only on `formbot-types` -- never
//! on `formbot-infra` or any database/IO crate.

pub mod dispatch;
pub mod locale;
pub mod transport;
pub mod wizard;

#[cfg(test)]
pub(crate) mod testing;
