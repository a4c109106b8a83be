//! # SMF CLI
//!
//! The `smf` command: lists the registered encodings, probes files, prints
//! event traces, converts between `smft` and `smfb`, and describes packed
//! vertex buffers.

pub mod args;
pub mod commands;
pub mod error;

pub use args::{Cli, CliByteOrder, Command};
pub use commands::{pack_file, parse_file, probe_file, read_mesh, registry, run, write_mesh};
pub use error::{CliError, CliResult};
