//! Wizards shipped with the binary.

pub mod profile;
