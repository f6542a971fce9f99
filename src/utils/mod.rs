//! Generic utility primitives with zero domain knowledge.
//!
//! - `command` - Captured command execution with error handling
//! - `io` - File I/O with consistent error handling

pub mod command;
pub mod io;
