//! Sinks for non-fatal problems found during override resolution.

use crate::trace::BindingTrace;
use kore_common::{ClassId, Diagnostic, DiagnosticCode};
use kore_descriptors::{DescriptorArena, DescriptorId, DescriptorRenderer};
use parking_lot::Mutex;

pub trait ErrorReporter {
    /// A fake override's visibility could not be inferred; `Public` was used.
    fn report_cannot_infer_visibility(&self, member: DescriptorId);

    /// `from_super` and `from_current` share a name but neither overrides the
    /// other.
    fn report_conflict(&self, from_super: DescriptorId, from_current: DescriptorId);

    /// Some supertypes of `class` could not be found.
    fn report_incomplete_hierarchy(&self, class: &ClassId, missing: &[String]);
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReportedProblem {
    CannotInferVisibility(DescriptorId),
    Conflict(DescriptorId, DescriptorId),
    IncompleteHierarchy(ClassId, Vec<String>),
}

/// Keeps every report in memory, in order.
#[derive(Debug, Default)]
pub struct CollectingErrorReporter {
    problems: Mutex<Vec<ReportedProblem>>,
}

impl CollectingErrorReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn problems(&self) -> Vec<ReportedProblem> {
        self.problems.lock().clone()
    }

    pub fn is_empty(&self) -> bool {
        self.problems.lock().is_empty()
    }
}

impl ErrorReporter for CollectingErrorReporter {
    fn report_cannot_infer_visibility(&self, member: DescriptorId) {
        self.problems.lock().push(ReportedProblem::CannotInferVisibility(member));
    }

    fn report_conflict(&self, from_super: DescriptorId, from_current: DescriptorId) {
        self.problems
            .lock()
            .push(ReportedProblem::Conflict(from_super, from_current));
    }

    fn report_incomplete_hierarchy(&self, class: &ClassId, missing: &[String]) {
        self.problems
            .lock()
            .push(ReportedProblem::IncompleteHierarchy(class.clone(), missing.to_vec()));
    }
}

/// Turns reports into [`Diagnostic`]s recorded in a binding trace.
pub struct TraceErrorReporter<'a, T> {
    trace: &'a T,
    arena: &'a DescriptorArena,
    report_conflicts: bool,
}

impl<'a, T: BindingTrace> TraceErrorReporter<'a, T> {
    pub fn new(trace: &'a T, arena: &'a DescriptorArena) -> Self {
        Self {
            trace,
            arena,
            report_conflicts: true,
        }
    }

    /// Drop conflict reports instead of recording them.
    pub fn without_conflicts(mut self) -> Self {
        self.report_conflicts = false;
        self
    }

    fn render(&self, id: DescriptorId) -> String {
        DescriptorRenderer::new(self.arena).render(id)
    }
}

impl<T: BindingTrace> ErrorReporter for TraceErrorReporter<'_, T> {
    fn report_cannot_infer_visibility(&self, member: DescriptorId) {
        let subject = self.render(member);
        let message = "cannot infer visibility; the members it overrides disagree";
        self.trace
            .report(Diagnostic::new(DiagnosticCode::CannotInferVisibility, subject, message));
    }

    fn report_conflict(&self, from_super: DescriptorId, from_current: DescriptorId) {
        if !self.report_conflicts {
            return;
        }
        let subject = self.render(from_current);
        let related = self.render(from_super);
        let message = "conflicting inherited members with the same name";
        self.trace.report(
            Diagnostic::new(DiagnosticCode::ConflictingInheritedMembers, subject, message).with_related(related),
        );
    }

    fn report_incomplete_hierarchy(&self, class: &ClassId, missing: &[String]) {
        let message = format!("supertypes not found: {}", missing.join(", "));
        self.trace.report(Diagnostic::new(
            DiagnosticCode::IncompleteHierarchy,
            class.as_string(),
            message,
        ));
    }
}
