//! Library side of the `kore` binary: argument parsing, the resolve driver
//! and report rendering.

pub mod args;
pub mod driver;
pub mod output;
pub mod tracing_config;
