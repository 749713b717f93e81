//! Command-line front end.

mod args;
mod commands;

pub use args::Cli;
pub use commands::execute;
