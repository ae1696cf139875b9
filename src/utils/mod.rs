//! Shared helpers for command execution, file reading and text parsing

pub mod command;
pub mod file;
pub mod parsing;
