//! `buildledger` command-line front end over a JSON ledger snapshot.

pub mod args;
pub mod commands;

pub use args::{Cli, Command, SkuKind};
pub use commands::run;
