//! Non-fatal problems found during resolution.
//!
//! Fatal problems (recursion without a fallback, failed computations) are
//! errors returned to the caller. Everything here is collected and attached to
//! the offending declaration instead.

use serde::Serialize;
use std::fmt;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiagnosticCode {
    /// A fake override's visibility could not be inferred.
    CannotInferVisibility,
    /// Two members with the same name clash without one overriding the other.
    ConflictingInheritedMembers,
    /// A supertype refers to a class that is not available.
    IncompleteHierarchy,
    /// A class is (transitively) its own supertype.
    CyclicInheritanceHierarchy,
}

impl DiagnosticCode {
    pub fn default_severity(self) -> Severity {
        match self {
            Self::CannotInferVisibility
            | Self::ConflictingInheritedMembers
            | Self::CyclicInheritanceHierarchy => Severity::Error,
            Self::IncompleteHierarchy => Severity::Warning,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: DiagnosticCode,
    /// Rendered declaration the diagnostic is attached to.
    pub subject: String,
    pub message: String,
    /// Other declarations involved, e.g. the second member of a conflict.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub related: Vec<String>,
}

impl Diagnostic {
    pub fn new(code: DiagnosticCode, subject: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: code.default_severity(),
            code,
            subject: subject.into(),
            message: message.into(),
            related: Vec::new(),
        }
    }

    pub fn with_related(mut self, related: impl Into<String>) -> Self {
        self.related.push(related.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let severity = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "{severity}[{:?}]: {} ({})", self.code, self.message, self.subject)?;
        for related in &self.related {
            write!(f, "\n  related: {related}")?;
        }
        Ok(())
    }
}
