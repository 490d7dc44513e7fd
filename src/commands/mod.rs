//! `bf` subcommands: argument structs and drivers.

pub mod read;
pub mod repl;
