//! Subcommands

pub mod check;
pub mod tail;
