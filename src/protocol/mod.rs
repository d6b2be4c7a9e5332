// src/protocol/mod.rs

//! Line protocol spoken with the external tool.
//!
//! In stay-open mode the tool reads one argument per line from stdin and
//! runs the accumulated arguments when it sees `-execute`. Every response
//! ends with a `{ready}` line; there is no other framing.
//!
//! ```text
//! request  = (ARG "\n")* "-execute\n"
//! response = (LINE "\n")* "{ready}\n"
//! ```
//!
//! - [`handler`] contains the `OutputHandler` trait, the line splitter and
//!   the basic handlers (stop detection, capture, composition).
//! - [`tags`] turns `Name: value` lines into a map.

pub mod handler;
pub mod tags;

pub use handler::{
    read_lines, CollectingHandler, DrainHandler, MultiHandler, OutputHandler, StopHandler,
};
pub use tags::TagHandler;

/// Line terminating every response in stay-open mode.
pub const READY: &str = "{ready}";

/// Line asking the daemon to run the arguments sent so far.
pub const EXECUTE: &str = "-execute";

/// Arguments starting the tool in stay-open mode, reading arguments from stdin.
pub const STAY_OPEN_ARGS: [&str; 4] = ["-stay_open", "True", "-@", "-"];

/// Input asking a stay-open daemon to exit.
pub const SHUTDOWN: &str = "-stay_open\nFalse\n";
