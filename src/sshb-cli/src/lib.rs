//! sshb CLI library.
//!
//! - `cli/` - argument parsing and command dispatch
//! - `history_cmd` - eternal-history maintenance subcommands

pub mod cli;
pub mod history_cmd;
