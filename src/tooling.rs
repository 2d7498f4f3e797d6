//! Tooling Layer
//!
//! Command-line entry points and the interactive browsing shell built on top
//! of the navigation cache.

pub mod cli;
pub mod format;
pub mod shell;

pub use cli::{Cli, CliContext, Commands, ConfigCommands};
pub use shell::{Outcome, Shell, ShellCommand};
