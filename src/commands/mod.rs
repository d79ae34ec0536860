//! Command implementations for the cobs CLI.

pub mod args;
pub mod construct;
pub mod docs;
pub mod query;
pub mod util;

pub use args::{Cli, Commands, ConstructArgs};
