use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// CLI arguments for the kore binary.
#[derive(Parser, Debug)]
#[command(
    name = "kore",
    version,
    about = "Resolve members and overrides of JSON class declarations"
)]
pub struct CliArgs {
    /// Declarations file (JSON).
    pub input: PathBuf,

    /// Only print this class. Accepts `a.b.C` or `a/b/Outer.Inner`; may be repeated.
    #[arg(long = "class", value_name = "FQ_NAME")]
    pub classes: Vec<String>,

    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text, ignore_case = true)]
    pub format: OutputFormat,

    /// Resolve classes on this many worker threads.
    #[arg(short = 'j', long)]
    pub jobs: Option<usize>,

    /// Drop member scopes from the cache once they are no longer used.
    #[arg(long = "weak-member-cache")]
    pub weak_member_cache: bool,

    /// Disable colored output.
    #[arg(long = "no-color")]
    pub no_color: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[cfg(test)]
#[path = "../tests/args_tests.rs"]
mod tests;
