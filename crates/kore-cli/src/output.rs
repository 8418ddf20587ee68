use crate::driver::ResolveReport;
use anyhow::{Context, Result};
use colored::Colorize;
use kore_common::{Diagnostic, Severity};
use std::fmt::Write;

/// Human-readable listing of every class, followed by the diagnostics.
pub fn render_text(report: &ResolveReport, color: bool) -> String {
    let mut out = String::new();
    for class in &report.classes {
        let header = if color {
            class.class_id.bold().to_string()
        } else {
            class.class_id.clone()
        };
        let _ = write!(out, "class {header}");
        if !class.supertypes.is_empty() {
            let _ = write!(out, " : {}", class.supertypes.join(", "));
        }
        if class.cyclic {
            out.push_str(" (cyclic)");
        }
        out.push('\n');
        for member in &class.members {
            for descriptor in &member.descriptors {
                let _ = writeln!(out, "  {descriptor}");
            }
        }
    }

    for diagnostic in &report.diagnostics {
        out.push_str(&format_diagnostic(diagnostic, color));
        out.push('\n');
    }

    let errors = report.diagnostics.iter().filter(|d| d.is_error()).count();
    let warnings = report.diagnostics.len() - errors;
    let _ = write!(
        out,
        "{} classes, {errors} errors, {warnings} warnings",
        report.classes.len()
    );
    out
}

fn format_diagnostic(diagnostic: &Diagnostic, color: bool) -> String {
    let severity = match (diagnostic.severity, color) {
        (Severity::Error, true) => "error".red().bold().to_string(),
        (Severity::Warning, true) => "warning".yellow().bold().to_string(),
        (Severity::Error, false) => "error".to_string(),
        (Severity::Warning, false) => "warning".to_string(),
    };
    let mut out = format!(
        "{severity}[{:?}]: {}\n  --> {}",
        diagnostic.code, diagnostic.message, diagnostic.subject
    );
    for related in &diagnostic.related {
        let _ = write!(out, "\n  related: {related}");
    }
    out
}

pub fn render_json(report: &ResolveReport) -> Result<String> {
    serde_json::to_string_pretty(report).context("failed to serialize report")
}
