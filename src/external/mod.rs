//! External tool abstractions
//!
//! The workflow engine is driven through its command-line tools. This module
//! isolates process execution behind a trait so engine adapters can be tested
//! without spawning anything.

pub mod command;

pub use command::{CommandError, CommandExecutor, CommandOutput, ProcessCommandExecutor};
