//! CLI module for folio - command-line interface and the interactive
//! decision provider.

pub mod commands;
pub mod terminal;

pub use commands::Cli;
pub use terminal::TerminalDecisions;
