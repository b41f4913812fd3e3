//! Music-Makro CLI library.
//!
//! Command implementations and logging setup for the `makro` binary.

pub mod commands;
pub mod logging;
