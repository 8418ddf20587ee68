//! Overridability checks and fake-override generation.
//!
//! # Design
//!
//! [`OverridingUtil`] answers "can `sub` override `super`?" by comparing
//! signatures with a [`TypeChecker`], then uses that relation to bind the
//! members declared in a class to the inherited members they override. What
//! is left over from the supertypes is grouped into sets of mutually
//! overridable members, and each group becomes a single fake override copied
//! from its most specific member.
//!
//! Where the results go (overridden lists, new fake overrides, conflicts) is
//! decided by an [`OverridingStrategy`], so callers can treat static members
//! or collect fake overrides in their own way.

use kore_common::Name;
use kore_descriptors::{
    CallableKind, CallableMemberDescriptor, DescriptorArena, DescriptorError, DescriptorId, KType,
    MatchingTypeParameters, Modality, RecursionGuard, RecursionProfile, RecursionResult, TypeChecker,
    TypeConstructorEquality, TypeContext, Visibility, find_max_visibility, is_visible,
};
use smallvec::SmallVec;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{debug, trace};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum OverridabilityResult {
    Overridable,
    Incompatible,
    /// Same name and shape, but the pair cannot coexist.
    Conflict,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct OverrideCompatibilityInfo {
    pub result: OverridabilityResult,
    pub debug_message: &'static str,
}

impl OverrideCompatibilityInfo {
    pub const fn success() -> Self {
        Self {
            result: OverridabilityResult::Overridable,
            debug_message: "SUCCESS",
        }
    }

    pub const fn incompatible(debug_message: &'static str) -> Self {
        Self {
            result: OverridabilityResult::Incompatible,
            debug_message,
        }
    }

    pub const fn conflict(debug_message: &'static str) -> Self {
        Self {
            result: OverridabilityResult::Conflict,
            debug_message,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ExternalConditionResult {
    Overridable,
    Conflict,
    Incompatible,
    /// No opinion; fall through to the next condition.
    Unknown,
}

/// A platform-specific rule consulted before the signature comparison.
pub trait ExternalOverridabilityCondition: Send + Sync {
    fn is_overridable(
        &self,
        super_member: &CallableMemberDescriptor,
        sub_member: &CallableMemberDescriptor,
        sub_class: Option<DescriptorId>,
    ) -> ExternalConditionResult;
}

/// Receives the outcome of [`OverridingUtil::generate_overrides_in_function_group`].
pub trait OverridingStrategy {
    fn add_fake_override(&mut self, fake_override: DescriptorId) -> Result<(), DescriptorError>;

    fn conflict(&mut self, from_super: DescriptorId, from_current: DescriptorId);

    /// Record the members a declared member overrides.
    fn set_overridden_descriptors(
        &mut self,
        member: DescriptorId,
        overridden: Vec<DescriptorId>,
    ) -> Result<(), DescriptorError>;
}

type Member = (DescriptorId, Arc<CallableMemberDescriptor>);

pub struct OverridingUtil<'a, C: TypeContext + ?Sized> {
    arena: &'a DescriptorArena,
    checker: TypeChecker<'a, C>,
    external_conditions: &'a [Box<dyn ExternalOverridabilityCondition>],
}

impl<'a, C> OverridingUtil<'a, C>
where
    C: TypeContext + ?Sized,
    C::Error: From<DescriptorError>,
{
    pub fn new(arena: &'a DescriptorArena, context: &'a C, axioms: &'a dyn TypeConstructorEquality) -> Self {
        Self {
            arena,
            checker: TypeChecker::new(context, axioms),
            external_conditions: &[],
        }
    }

    pub fn with_external_conditions(mut self, conditions: &'a [Box<dyn ExternalOverridabilityCondition>]) -> Self {
        self.external_conditions = conditions;
        self
    }

    pub fn arena(&self) -> &'a DescriptorArena {
        self.arena
    }

    pub fn type_checker(&self) -> &TypeChecker<'a, C> {
        &self.checker
    }

    // =========================================================================
    // Overridability
    // =========================================================================

    pub fn is_overridable_by(
        &self,
        super_member: &CallableMemberDescriptor,
        sub_member: &CallableMemberDescriptor,
        sub_class: Option<DescriptorId>,
        check_return_type: bool,
    ) -> Result<OverrideCompatibilityInfo, C::Error> {
        let mut external_success = false;
        for condition in self.external_conditions {
            match condition.is_overridable(super_member, sub_member, sub_class) {
                ExternalConditionResult::Overridable => external_success = true,
                ExternalConditionResult::Conflict => {
                    return Ok(OverrideCompatibilityInfo::conflict("External condition failed"));
                }
                ExternalConditionResult::Incompatible => {
                    return Ok(OverrideCompatibilityInfo::incompatible("External condition"));
                }
                ExternalConditionResult::Unknown => {}
            }
        }
        if external_success {
            return Ok(OverrideCompatibilityInfo::success());
        }
        self.is_overridable_by_without_external_conditions(super_member, sub_member, check_return_type)
    }

    pub fn is_overridable_by_without_external_conditions(
        &self,
        super_member: &CallableMemberDescriptor,
        sub_member: &CallableMemberDescriptor,
        check_return_type: bool,
    ) -> Result<OverrideCompatibilityInfo, C::Error> {
        if super_member.member.is_function() != sub_member.member.is_function() {
            return Ok(OverrideCompatibilityInfo::incompatible("Member kind mismatch"));
        }
        if super_member.name != sub_member.name {
            return Ok(OverrideCompatibilityInfo::incompatible("Name mismatch"));
        }
        if super_member.extension_receiver.is_some() != sub_member.extension_receiver.is_some() {
            return Ok(OverrideCompatibilityInfo::incompatible("Receiver presence mismatch"));
        }
        if super_member.value_parameters.len() != sub_member.value_parameters.len() {
            return Ok(OverrideCompatibilityInfo::incompatible("Value parameter number mismatch"));
        }

        let super_parameters = super_member.compiled_value_parameters();
        let sub_parameters = sub_member.compiled_value_parameters();

        if super_member.type_parameters.len() != sub_member.type_parameters.len() {
            let same_parameters = super_parameters
                .iter()
                .zip(&sub_parameters)
                .all(|(a, b)| self.checker.equal_types(a, b));
            return Ok(if same_parameters {
                OverrideCompatibilityInfo::conflict("Type parameter number mismatch")
            } else {
                OverrideCompatibilityInfo::incompatible("Type parameter number mismatch")
            });
        }

        let matching = MatchingTypeParameters::new(
            self.checker.axioms(),
            &super_member.type_parameters,
            &sub_member.type_parameters,
        );
        let checker = self.checker.with_axioms(&matching);

        for (&super_parameter, &sub_parameter) in super_member.type_parameters.iter().zip(&sub_member.type_parameters) {
            if !self.type_parameters_equivalent(super_parameter, sub_parameter, &checker)? {
                return Ok(OverrideCompatibilityInfo::incompatible("Type parameter bounds mismatch"));
            }
        }

        for (a, b) in super_parameters.iter().zip(&sub_parameters) {
            if !types_equivalent(a, b, &checker) {
                return Ok(OverrideCompatibilityInfo::incompatible("Value parameter type mismatch"));
            }
        }

        if check_return_type {
            let super_return = &super_member.return_type;
            let sub_return = &sub_member.return_type;
            let both_errors = super_return.is_error() && sub_return.is_error();
            if !both_errors && !checker.is_subtype_of(sub_return, super_return)? {
                return Ok(OverrideCompatibilityInfo::conflict("Return type mismatch"));
            }
        }

        Ok(OverrideCompatibilityInfo::success())
    }

    /// Bounds must match as multisets; order does not matter.
    fn type_parameters_equivalent(
        &self,
        super_parameter: DescriptorId,
        sub_parameter: DescriptorId,
        checker: &TypeChecker<'_, C>,
    ) -> Result<bool, C::Error> {
        let super_parameter = self.arena.type_parameter(super_parameter)?;
        let mut sub_bounds: Vec<KType> = self.arena.type_parameter(sub_parameter)?.upper_bounds.clone();
        if super_parameter.upper_bounds.len() != sub_bounds.len() {
            return Ok(false);
        }
        for super_bound in &super_parameter.upper_bounds {
            match sub_bounds
                .iter()
                .position(|sub_bound| types_equivalent(super_bound, sub_bound, checker))
            {
                Some(index) => {
                    sub_bounds.swap_remove(index);
                }
                None => return Ok(false),
            }
        }
        Ok(true)
    }

    // =========================================================================
    // Binding and fake overrides
    // =========================================================================

    /// Bind each member of `members_from_current` to the inherited members it
    /// overrides, and merge the remaining inherited members into fake
    /// overrides of `current`. All members must be named `name`.
    pub fn generate_overrides_in_function_group(
        &self,
        name: &Name,
        members_from_supertypes: &[DescriptorId],
        members_from_current: &[DescriptorId],
        current: DescriptorId,
        strategy: &mut dyn OverridingStrategy,
    ) -> Result<(), C::Error> {
        trace!(
            target: "kore::resolve",
            %name,
            inherited = members_from_supertypes.len(),
            declared = members_from_current.len(),
            "generate_overrides_in_function_group"
        );

        let mut not_overridden: Vec<DescriptorId> = Vec::with_capacity(members_from_supertypes.len());
        for &id in members_from_supertypes {
            if !not_overridden.contains(&id) {
                not_overridden.push(id);
            }
        }

        let from_supertypes = not_overridden.clone();
        for &from_current in members_from_current {
            let bound = self.extract_and_bind_overrides_for_member(from_current, &from_supertypes, current, strategy)?;
            not_overridden.retain(|id| !bound.contains(id));
        }

        self.create_and_bind_fake_overrides(current, not_overridden, strategy)
    }

    fn extract_and_bind_overrides_for_member(
        &self,
        from_current: DescriptorId,
        descriptors_from_super: &[DescriptorId],
        current: DescriptorId,
        strategy: &mut dyn OverridingStrategy,
    ) -> Result<SmallVec<[DescriptorId; 4]>, C::Error> {
        let member = self.arena.callable(from_current)?;
        let mut bound = SmallVec::new();
        let mut overridden = Vec::new();
        for &from_super in descriptors_from_super {
            let super_member = self.arena.callable(from_super)?;
            let info = self.is_overridable_by(&super_member, &member, Some(current), false)?;
            let visible = is_visible(self.arena, &super_member, current);
            match info.result {
                OverridabilityResult::Overridable => {
                    if visible {
                        overridden.push(from_super);
                    }
                    bound.push(from_super);
                }
                OverridabilityResult::Conflict => {
                    if visible {
                        strategy.conflict(from_super, from_current);
                    }
                    bound.push(from_super);
                }
                OverridabilityResult::Incompatible => {}
            }
        }
        strategy.set_overridden_descriptors(from_current, overridden)?;
        Ok(bound)
    }

    fn create_and_bind_fake_overrides(
        &self,
        current: DescriptorId,
        not_overridden: Vec<DescriptorId>,
        strategy: &mut dyn OverridingStrategy,
    ) -> Result<(), C::Error> {
        let mut queue: VecDeque<DescriptorId> = not_overridden.into();
        while let Some(overrider) = self.find_member_with_max_visibility(&queue)? {
            let overridables = self.extract_members_overridable_in_both_ways(overrider, &mut queue, strategy)?;
            self.create_and_bind_fake_override(&overridables, current, strategy)?;
        }
        Ok(())
    }

    /// First member whose visibility no other member exceeds.
    fn find_member_with_max_visibility(&self, members: &VecDeque<DescriptorId>) -> Result<Option<DescriptorId>, C::Error> {
        let mut best: Option<(DescriptorId, Visibility)> = None;
        for &id in members {
            let visibility = self.arena.callable(id)?.visibility();
            best = match best {
                None => Some((id, visibility)),
                Some((_, current)) if current < visibility => Some((id, visibility)),
                keep => keep,
            };
        }
        Ok(best.map(|(id, _)| id))
    }

    fn extract_members_overridable_in_both_ways(
        &self,
        overrider: DescriptorId,
        queue: &mut VecDeque<DescriptorId>,
        strategy: &mut dyn OverridingStrategy,
    ) -> Result<Vec<Member>, C::Error> {
        let overrider_member = self.arena.callable(overrider)?;
        let mut overridable = vec![(overrider, Arc::clone(&overrider_member))];
        let mut remaining = VecDeque::with_capacity(queue.len());
        while let Some(candidate) = queue.pop_front() {
            if candidate == overrider {
                continue;
            }
            let candidate_member = self.arena.callable(candidate)?;
            let forward = self.is_overridable_by(&candidate_member, &overrider_member, None, false)?.result;
            let backward = self.is_overridable_by(&overrider_member, &candidate_member, None, false)?.result;
            if forward == OverridabilityResult::Overridable && backward == OverridabilityResult::Overridable {
                overridable.push((candidate, candidate_member));
            } else if forward == OverridabilityResult::Conflict || backward == OverridabilityResult::Conflict {
                strategy.conflict(overrider, candidate);
            } else {
                remaining.push_back(candidate);
            }
        }
        *queue = remaining;
        Ok(overridable)
    }

    fn create_and_bind_fake_override(
        &self,
        overridables: &[Member],
        current: DescriptorId,
        strategy: &mut dyn OverridingStrategy,
    ) -> Result<(), C::Error> {
        // Nested classes can see private members, so private ones are
        // excluded explicitly.
        let visible: Vec<Member> = overridables
            .iter()
            .filter(|(_, member)| !member.visibility().is_private() && is_visible(self.arena, member, current))
            .cloned()
            .collect();
        let all_invisible = visible.is_empty();
        let effective: &[Member] = if all_invisible { overridables } else { &visible };

        let modality = effective
            .iter()
            .map(|(_, member)| member.modality)
            .min()
            .unwrap_or(Modality::Abstract);
        let visibility = if all_invisible {
            Visibility::InvisibleFake
        } else {
            Visibility::Inherited
        };
        let Some(most_specific) = self.select_most_specific_member_from_super(effective)? else {
            return Ok(());
        };

        let fake_override = most_specific.copy(current, modality, visibility, CallableKind::FakeOverride);
        let id = self.arena.alloc_callable(fake_override);
        self.arena
            .callable(id)?
            .set_overridden_descriptors(effective.iter().map(|(id, _)| *id).collect())?;
        debug!(
            target: "kore::resolve",
            fake_override = id.0,
            name = %most_specific.name,
            merged = effective.len(),
            "created fake override"
        );
        strategy.add_fake_override(id)?;
        Ok(())
    }

    // =========================================================================
    // Specificity
    // =========================================================================

    /// Whether `a` can stand in for `b` as the inherited signature.
    pub fn is_more_specific(&self, a: &CallableMemberDescriptor, b: &CallableMemberDescriptor) -> Result<bool, C::Error> {
        match (a.member.is_function(), b.member.is_function()) {
            (true, true) => self.checker.is_subtype_of(&a.return_type, &b.return_type),
            (false, false) => {
                if a.is_var() && b.is_var() {
                    return Ok(self.checker.equal_types(&a.return_type, &b.return_type));
                }
                // A val is never more specific than a var.
                if !a.is_var() && b.is_var() {
                    return Ok(false);
                }
                self.checker.is_subtype_of(&a.return_type, &b.return_type)
            }
            _ => Ok(false),
        }
    }

    fn is_more_specific_than_all_of(&self, candidate: &CallableMemberDescriptor, members: &[Member]) -> Result<bool, C::Error> {
        for (_, member) in members {
            if !self.is_more_specific(candidate, member)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn select_most_specific_member_from_super(
        &self,
        overridables: &[Member],
    ) -> Result<Option<Arc<CallableMemberDescriptor>>, C::Error> {
        match overridables {
            [] => return Ok(None),
            [(_, only)] => return Ok(Some(Arc::clone(only))),
            _ => {}
        }

        let mut candidates: SmallVec<[&Arc<CallableMemberDescriptor>; 2]> = SmallVec::new();
        let mut transitively_most_specific: Option<&Arc<CallableMemberDescriptor>> = None;
        for (_, overridable) in overridables {
            if self.is_more_specific_than_all_of(overridable, overridables)? {
                candidates.push(overridable);
            }
            let replace = match transitively_most_specific {
                None => true,
                Some(current) => self.is_more_specific(overridable, current)?,
            };
            if replace {
                transitively_most_specific = Some(overridable);
            }
        }

        let chosen = match candidates.as_slice() {
            [] => transitively_most_specific,
            [only] => Some(*only),
            _ => candidates
                .iter()
                .rev()
                .find(|candidate| !candidate.return_type.is_flexible())
                .or(candidates.last())
                .copied(),
        };
        Ok(chosen.map(Arc::clone))
    }
}

fn types_equivalent<C: TypeContext + ?Sized>(a: &KType, b: &KType, checker: &TypeChecker<'_, C>) -> bool {
    (a.is_error() && b.is_error()) || checker.equal_types(a, b)
}

// =============================================================================
// Visibility inference
// =============================================================================

/// Replace `Inherited` visibility on `member` (and, first, on the members it
/// overrides) with the visibility inferred from its overridden members.
/// When nothing can be inferred, `cannot_infer` is called and `Public` is used.
pub fn resolve_unknown_visibility_for_member(
    arena: &DescriptorArena,
    member: DescriptorId,
    cannot_infer: Option<&dyn Fn(DescriptorId)>,
) -> Result<(), DescriptorError> {
    let mut guard = RecursionGuard::with_profile(RecursionProfile::OverrideChain);
    resolve_visibility_guarded(arena, member, cannot_infer, &mut guard)
}

fn resolve_visibility_guarded(
    arena: &DescriptorArena,
    member: DescriptorId,
    cannot_infer: Option<&dyn Fn(DescriptorId)>,
    guard: &mut RecursionGuard<DescriptorId>,
) -> Result<(), DescriptorError> {
    let descriptor = arena.callable(member)?;
    for &overridden in descriptor.overridden_descriptors() {
        if arena.callable(overridden)?.visibility() != Visibility::Inherited {
            continue;
        }
        if let RecursionResult::Entered = guard.enter(overridden) {
            let result = resolve_visibility_guarded(arena, overridden, cannot_infer, guard);
            guard.leave(&overridden);
            result?;
        }
    }

    if descriptor.visibility() != Visibility::Inherited {
        return Ok(());
    }

    let visibility = match compute_visibility_to_inherit(arena, &descriptor)? {
        Some(visibility) => visibility,
        None => {
            if let Some(callback) = cannot_infer {
                callback(member);
            }
            Visibility::Public
        }
    };
    descriptor.set_visibility(visibility)
}

fn compute_visibility_to_inherit(
    arena: &DescriptorArena,
    descriptor: &CallableMemberDescriptor,
) -> Result<Option<Visibility>, DescriptorError> {
    let overridden = descriptor
        .overridden_descriptors()
        .iter()
        .map(|&id| arena.callable(id))
        .collect::<Result<Vec<_>, _>>()?;
    let visibilities: Vec<Visibility> = overridden.iter().map(|member| member.visibility()).collect();
    let Some(max) = find_max_visibility(&visibilities) else {
        return Ok(None);
    };
    if descriptor.kind == CallableKind::FakeOverride {
        // Every implementation must already have the widest visibility.
        let consistent = overridden
            .iter()
            .all(|member| member.modality == Modality::Abstract || member.visibility() == max);
        return Ok(consistent.then_some(max));
    }
    Ok(Some(max.normalize()))
}

#[cfg(test)]
#[path = "../tests/overriding_tests.rs"]
mod tests;
