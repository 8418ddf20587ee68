#![allow(clippy::print_stderr)]

use anyhow::Result;
use clap::Parser;
use std::io::IsTerminal;

use kore_cli::args::{CliArgs, OutputFormat};
use kore_cli::{driver, output, tracing_config};

/// Exit status when resolution reported at least one error.
const EXIT_DIAGNOSTICS: i32 = 1;

fn main() -> Result<()> {
    // Only installs a subscriber when KORE_LOG or RUST_LOG is set.
    tracing_config::init_tracing();

    let args = CliArgs::parse();
    let report = driver::run(&args)?;

    let rendered = match args.format {
        OutputFormat::Text => {
            let color = !args.no_color && std::io::stdout().is_terminal();
            output::render_text(&report, color)
        }
        OutputFormat::Json => output::render_json(&report)?,
    };
    println!("{rendered}");

    if report.has_errors() {
        eprintln!("resolution finished with errors");
        std::process::exit(EXIT_DIAGNOSTICS);
    }
    Ok(())
}
