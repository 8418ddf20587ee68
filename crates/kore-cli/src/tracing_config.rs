//! Log output for the `kore` binary.
//!
//! Logging stays off unless `KORE_LOG` (or, failing that, `RUST_LOG`) holds
//! filter directives. `KORE_LOG_FORMAT` picks `text`, `tree` or `json`.
//!
//! ```bash
//! KORE_LOG=kore::resolve=debug KORE_LOG_FORMAT=tree kore decls.json
//! KORE_LOG=kore::storage=trace KORE_LOG_FORMAT=json kore decls.json
//! ```

use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, Registry, fmt};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    /// Nested resolution spans, indented.
    Tree,
    Json,
}

impl LogFormat {
    /// Unknown names fall back to `Text`.
    pub fn parse(value: &str) -> Self {
        if value.eq_ignore_ascii_case("tree") {
            Self::Tree
        } else if value.eq_ignore_ascii_case("json") {
            Self::Json
        } else {
            Self::Text
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    pub directives: String,
    pub format: LogFormat,
}

impl LogSettings {
    /// `None` when no filter is configured.
    pub fn from_values(kore_log: Option<String>, rust_log: Option<String>, format: Option<&str>) -> Option<Self> {
        let directives = kore_log.or(rust_log)?;
        Some(Self {
            directives,
            format: format.map_or(LogFormat::Text, LogFormat::parse),
        })
    }

    pub fn from_env() -> Option<Self> {
        let format = std::env::var("KORE_LOG_FORMAT").ok();
        Self::from_values(
            std::env::var("KORE_LOG").ok(),
            std::env::var("RUST_LOG").ok(),
            format.as_deref(),
        )
    }

    fn filter(&self) -> EnvFilter {
        EnvFilter::builder().parse_lossy(&self.directives)
    }
}

/// Install the global subscriber if logging was requested. Output goes to
/// stderr; stdout carries the report.
pub fn init_tracing() {
    let Some(settings) = LogSettings::from_env() else {
        return;
    };
    let registry = Registry::default().with(settings.filter());
    match settings.format {
        LogFormat::Tree => registry
            .with(
                tracing_tree::HierarchicalLayer::new(2)
                    .with_targets(true)
                    .with_bracketed_fields(true),
            )
            .init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_current_span(false).with_writer(std::io::stderr))
            .init(),
        LogFormat::Text => registry.with(fmt::layer().with_writer(std::io::stderr)).init(),
    }
}

#[cfg(test)]
#[path = "../tests/tracing_config_tests.rs"]
mod tests;
