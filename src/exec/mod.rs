// src/exec/mod.rs

//! Process execution layer.
//!
//! Everything that touches `tokio::process` lives here:
//!
//! - [`command`] holds the immutable `Command` value and `CommandResult`.
//! - [`executor`] provides the `CommandExecutor` trait and the
//!   `RealCommandExecutor` used in production; tests replace it with a fake.
//! - [`process`] contains `CommandProcess`, the duplex handle used for
//!   long-lived processes.

pub mod command;
pub mod executor;
pub mod process;

pub use command::{Command, CommandBuilder, CommandResult};
pub use executor::{BoxFuture, CommandExecutor, RealCommandExecutor};
pub use process::CommandProcess;
