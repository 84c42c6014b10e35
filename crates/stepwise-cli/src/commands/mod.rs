//! CLI command implementations for stepwise.
//!
//! Each module corresponds to a subcommand (`stepwise <command>`).

pub mod check;
pub mod demo;
pub mod init;
pub mod render;
