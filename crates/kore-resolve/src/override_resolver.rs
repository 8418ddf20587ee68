//! Entry points that turn inherited and declared members of one name into the
//! member set of a class.

use crate::overriding::{OverridingStrategy, OverridingUtil, resolve_unknown_visibility_for_member};
use crate::reporter::ErrorReporter;
use kore_common::Name;
use kore_descriptors::{CallableKind, DescriptorArena, DescriptorError, DescriptorId, TypeContext, Visibility};
use tracing::debug;

/// Resolve overrides among instance members named `name`.
///
/// Returns the declared members followed by the fake overrides generated for
/// the inherited members nothing declared overrides.
pub fn resolve_overrides<C>(
    util: &OverridingUtil<'_, C>,
    name: &Name,
    inherited: &[DescriptorId],
    declared: &[DescriptorId],
    owning_class: DescriptorId,
    reporter: &dyn ErrorReporter,
) -> Result<Vec<DescriptorId>, C::Error>
where
    C: TypeContext + ?Sized,
    C::Error: From<DescriptorError>,
{
    resolve(util, name, inherited, declared, owning_class, reporter, false)
}

/// Like [`resolve_overrides`], for static members. Declared static members do
/// not override anything, so their overridden list is left unset; fake
/// overrides are linked as usual.
pub fn resolve_static_overrides<C>(
    util: &OverridingUtil<'_, C>,
    name: &Name,
    inherited: &[DescriptorId],
    declared: &[DescriptorId],
    owning_class: DescriptorId,
    reporter: &dyn ErrorReporter,
) -> Result<Vec<DescriptorId>, C::Error>
where
    C: TypeContext + ?Sized,
    C::Error: From<DescriptorError>,
{
    resolve(util, name, inherited, declared, owning_class, reporter, true)
}

fn resolve<C>(
    util: &OverridingUtil<'_, C>,
    name: &Name,
    inherited: &[DescriptorId],
    declared: &[DescriptorId],
    owning_class: DescriptorId,
    reporter: &dyn ErrorReporter,
    is_static_context: bool,
) -> Result<Vec<DescriptorId>, C::Error>
where
    C: TypeContext + ?Sized,
    C::Error: From<DescriptorError>,
{
    let arena = util.arena();
    let mut sink = ResolutionSink {
        arena,
        reporter,
        is_static_context,
        fake_overrides: Vec::new(),
    };
    util.generate_overrides_in_function_group(name, inherited, declared, owning_class, &mut sink)?;

    for &member in declared {
        if arena.callable(member)?.visibility() == Visibility::Inherited {
            let report = |member: DescriptorId| reporter.report_cannot_infer_visibility(member);
            resolve_unknown_visibility_for_member(arena, member, Some(&report))?;
        }
    }

    let mut result: Vec<DescriptorId> = Vec::with_capacity(declared.len() + sink.fake_overrides.len());
    for id in declared.iter().copied().chain(sink.fake_overrides) {
        if !result.contains(&id) {
            result.push(id);
        }
    }
    debug!(
        target: "kore::resolve",
        %name,
        is_static_context,
        declared = declared.len(),
        total = result.len(),
        "resolved overrides"
    );
    Ok(result)
}

struct ResolutionSink<'a> {
    arena: &'a DescriptorArena,
    reporter: &'a dyn ErrorReporter,
    is_static_context: bool,
    fake_overrides: Vec<DescriptorId>,
}

impl OverridingStrategy for ResolutionSink<'_> {
    fn add_fake_override(&mut self, fake_override: DescriptorId) -> Result<(), DescriptorError> {
        let reporter = self.reporter;
        let report = |member: DescriptorId| reporter.report_cannot_infer_visibility(member);
        resolve_unknown_visibility_for_member(self.arena, fake_override, Some(&report))?;
        self.fake_overrides.push(fake_override);
        Ok(())
    }

    fn conflict(&mut self, from_super: DescriptorId, from_current: DescriptorId) {
        self.reporter.report_conflict(from_super, from_current);
    }

    fn set_overridden_descriptors(
        &mut self,
        member: DescriptorId,
        overridden: Vec<DescriptorId>,
    ) -> Result<(), DescriptorError> {
        let descriptor = self.arena.callable(member)?;
        if self.is_static_context && descriptor.kind != CallableKind::FakeOverride {
            return Ok(());
        }
        descriptor.set_overridden_descriptors(overridden)
    }
}
