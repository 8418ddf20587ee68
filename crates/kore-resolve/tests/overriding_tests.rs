use super::*;
use kore_common::{ClassId, FqName};
use kore_descriptors::{ClassDescriptor, ClassKind, DefaultTypeEquality, MemberKind, TypeParameterDescriptor, ValueParameter};
use rustc_hash::FxHashMap;
use std::cell::RefCell;

fn class_id(name: &str) -> ClassId {
    ClassId::top_level(&FqName::parse(name).unwrap()).unwrap()
}

fn ty(name: &str) -> KType {
    KType::class(class_id(name), vec![])
}

fn name(text: &str) -> Name {
    Name::identifier(text).unwrap()
}

/// An arena plus a fixed supertype table.
struct Fixture {
    arena: DescriptorArena,
    supertypes: FxHashMap<ClassId, Arc<[KType]>>,
}

impl Fixture {
    fn new() -> Self {
        let mut supertypes: FxHashMap<ClassId, Arc<[KType]>> = FxHashMap::default();
        for (class, supertype) in [
            ("kotlin.String", "kotlin.CharSequence"),
            ("kotlin.CharSequence", "kotlin.Any"),
            ("kotlin.Int", "kotlin.Any"),
        ] {
            supertypes.insert(class_id(class), Arc::from(vec![ty(supertype)]));
        }
        Self {
            arena: DescriptorArena::new(),
            supertypes,
        }
    }

    fn class(&self, fq_name: &str) -> DescriptorId {
        let class_id = class_id(fq_name);
        self.arena.alloc_class(|_| ClassDescriptor {
            name: class_id.short_class_name().unwrap().clone(),
            class_id,
            container: None,
            kind: ClassKind::Class,
            modality: Modality::Open,
            visibility: Visibility::Public,
            type_parameters: Vec::new(),
        })
    }

    fn member(&self, member: CallableMemberDescriptor) -> DescriptorId {
        self.arena.alloc_callable(member)
    }

    fn callable(&self, id: DescriptorId) -> Arc<CallableMemberDescriptor> {
        self.arena.callable(id).unwrap()
    }

    fn util(&self) -> OverridingUtil<'_, Fixture> {
        OverridingUtil::new(&self.arena, self, &DefaultTypeEquality)
    }
}

impl TypeContext for Fixture {
    type Error = DescriptorError;

    fn supertypes(&self, class: &ClassId) -> Result<Arc<[KType]>, DescriptorError> {
        Ok(self
            .supertypes
            .get(class)
            .cloned()
            .unwrap_or_else(|| Arc::from(Vec::new())))
    }

    fn class_type_parameters(&self, _class: &ClassId) -> Result<Arc<[DescriptorId]>, DescriptorError> {
        Ok(Arc::from(Vec::new()))
    }

    fn upper_bounds(&self, parameter: DescriptorId) -> Result<Vec<KType>, DescriptorError> {
        Ok(self.arena.type_parameter(parameter)?.upper_bounds.clone())
    }
}

fn function(container: DescriptorId, member_name: &str, return_type: KType) -> CallableMemberDescriptor {
    CallableMemberDescriptor::declaration(name(member_name), container, MemberKind::Function, return_type)
        .with_modality(Modality::Open)
}

fn property(container: DescriptorId, member_name: &str, is_var: bool, ty: KType) -> CallableMemberDescriptor {
    CallableMemberDescriptor::declaration(name(member_name), container, MemberKind::Property { is_var }, ty)
        .with_modality(Modality::Open)
}

fn parameter(parameter_name: &str, ty: KType) -> ValueParameter {
    ValueParameter {
        name: name(parameter_name),
        ty,
    }
}

/// Records what the algorithm decided.
#[derive(Default)]
struct Recorder {
    fake_overrides: Vec<DescriptorId>,
    conflicts: Vec<(DescriptorId, DescriptorId)>,
    overridden: Vec<(DescriptorId, Vec<DescriptorId>)>,
}

impl OverridingStrategy for Recorder {
    fn add_fake_override(&mut self, fake_override: DescriptorId) -> Result<(), DescriptorError> {
        self.fake_overrides.push(fake_override);
        Ok(())
    }

    fn conflict(&mut self, from_super: DescriptorId, from_current: DescriptorId) {
        self.conflicts.push((from_super, from_current));
    }

    fn set_overridden_descriptors(
        &mut self,
        member: DescriptorId,
        overridden: Vec<DescriptorId>,
    ) -> Result<(), DescriptorError> {
        self.overridden.push((member, overridden));
        Ok(())
    }
}

// =============================================================================
// is_overridable_by
// =============================================================================

#[test]
fn test_overridable_checks_run_in_order() {
    let fixture = Fixture::new();
    let base = fixture.class("p.Base");
    let util = fixture.util();

    let foo = function(base, "foo", ty("kotlin.Any"));
    let check = |a: &CallableMemberDescriptor, b: &CallableMemberDescriptor| {
        util.is_overridable_by(a, b, None, true).unwrap()
    };

    let bar = function(base, "bar", ty("kotlin.Any"));
    assert_eq!(check(&foo, &bar).debug_message, "Name mismatch");

    let foo_property = property(base, "foo", false, ty("kotlin.Any"));
    assert_eq!(check(&foo, &foo_property).debug_message, "Member kind mismatch");

    let extension = function(base, "foo", ty("kotlin.Any")).with_extension_receiver(Some(ty("kotlin.String")));
    assert_eq!(check(&foo, &extension).debug_message, "Receiver presence mismatch");

    let with_parameter =
        function(base, "foo", ty("kotlin.Any")).with_value_parameters(vec![parameter("x", ty("kotlin.Int"))]);
    let info = check(&foo, &with_parameter);
    assert_eq!(info.result, OverridabilityResult::Incompatible);
    assert_eq!(info.debug_message, "Value parameter number mismatch");

    let other_parameter =
        function(base, "foo", ty("kotlin.Any")).with_value_parameters(vec![parameter("y", ty("kotlin.String"))]);
    assert_eq!(
        check(&with_parameter, &other_parameter).debug_message,
        "Value parameter type mismatch"
    );

    let narrower = function(base, "foo", ty("kotlin.String"));
    assert_eq!(check(&foo, &narrower), OverrideCompatibilityInfo::success());

    let info = check(&narrower, &foo);
    assert_eq!(info.result, OverridabilityResult::Conflict);
    assert_eq!(info.debug_message, "Return type mismatch");
    // Without the return type check the pair is fine.
    assert_eq!(
        util.is_overridable_by(&narrower, &foo, None, false).unwrap().result,
        OverridabilityResult::Overridable
    );
}

#[test]
fn test_type_parameter_count_mismatch() {
    let fixture = Fixture::new();
    let base = fixture.class("p.Base");
    let t = fixture.arena.alloc_type_parameter(TypeParameterDescriptor {
        name: name("T"),
        container: base,
        index: 0,
        upper_bounds: vec![ty("kotlin.Any").make_nullable(true)],
    });
    let util = fixture.util();

    let plain = function(base, "foo", ty("kotlin.Any")).with_value_parameters(vec![parameter("x", ty("kotlin.Int"))]);
    let generic = function(base, "foo", ty("kotlin.Any"))
        .with_type_parameters(vec![t])
        .with_value_parameters(vec![parameter("x", ty("kotlin.Int"))]);
    assert_eq!(
        util.is_overridable_by(&plain, &generic, None, false).unwrap().result,
        OverridabilityResult::Conflict
    );

    let generic_over_t = function(base, "foo", ty("kotlin.Any"))
        .with_type_parameters(vec![t])
        .with_value_parameters(vec![parameter("x", KType::type_parameter(t))]);
    assert_eq!(
        util.is_overridable_by(&plain, &generic_over_t, None, false).unwrap().result,
        OverridabilityResult::Incompatible
    );
}

#[test]
fn test_type_parameters_are_matched_positionally() {
    let fixture = Fixture::new();
    let base = fixture.class("p.Base");
    let derived = fixture.class("p.Derived");
    let bound = |container| TypeParameterDescriptor {
        name: name("T"),
        container,
        index: 0,
        upper_bounds: vec![ty("kotlin.CharSequence")],
    };
    let t_super = fixture.arena.alloc_type_parameter(bound(base));
    let t_sub = fixture.arena.alloc_type_parameter(bound(derived));
    let util = fixture.util();

    let super_member = function(base, "put", ty("kotlin.Unit"))
        .with_type_parameters(vec![t_super])
        .with_value_parameters(vec![parameter("value", KType::type_parameter(t_super))]);
    let sub_member = function(derived, "put", ty("kotlin.Unit"))
        .with_type_parameters(vec![t_sub])
        .with_value_parameters(vec![parameter("value", KType::type_parameter(t_sub))]);
    assert_eq!(
        util.is_overridable_by(&super_member, &sub_member, None, true).unwrap(),
        OverrideCompatibilityInfo::success()
    );
}

struct Veto;

impl ExternalOverridabilityCondition for Veto {
    fn is_overridable(
        &self,
        _super_member: &CallableMemberDescriptor,
        sub_member: &CallableMemberDescriptor,
        _sub_class: Option<DescriptorId>,
    ) -> ExternalConditionResult {
        if sub_member.name.as_str() == "vetoed" {
            ExternalConditionResult::Incompatible
        } else {
            ExternalConditionResult::Unknown
        }
    }
}

#[test]
fn test_external_condition_vetoes() {
    let fixture = Fixture::new();
    let base = fixture.class("p.Base");
    let conditions: Vec<Box<dyn ExternalOverridabilityCondition>> = vec![Box::new(Veto)];
    let util = fixture.util().with_external_conditions(&conditions);

    let vetoed = function(base, "vetoed", ty("kotlin.Any"));
    let info = util.is_overridable_by(&vetoed, &vetoed, None, true).unwrap();
    assert_eq!(info, OverrideCompatibilityInfo::incompatible("External condition"));

    let allowed = function(base, "allowed", ty("kotlin.Any"));
    assert_eq!(
        util.is_overridable_by(&allowed, &allowed, None, true).unwrap().result,
        OverridabilityResult::Overridable
    );
}

// =============================================================================
// generate_overrides_in_function_group
// =============================================================================

#[test]
fn test_inherited_members_merge_into_one_fake_override() {
    let fixture = Fixture::new();
    let left = fixture.class("p.Left");
    let right = fixture.class("p.Right");
    let current = fixture.class("p.Both");

    let from_left = fixture.member(function(left, "foo", ty("kotlin.CharSequence")));
    let from_right = fixture.member(function(right, "foo", ty("kotlin.String")).with_modality(Modality::Abstract));

    let mut recorder = Recorder::default();
    fixture
        .util()
        .generate_overrides_in_function_group(&name("foo"), &[from_left, from_right], &[], current, &mut recorder)
        .unwrap();

    assert_eq!(recorder.fake_overrides.len(), 1);
    assert!(recorder.conflicts.is_empty());
    let fake = fixture.callable(recorder.fake_overrides[0]);
    assert_eq!(fake.kind, CallableKind::FakeOverride);
    assert_eq!(fake.container, current);
    assert_eq!(fake.modality, Modality::Open);
    assert_eq!(fake.visibility(), Visibility::Inherited);
    // Copied from the member with the most specific return type.
    assert_eq!(fake.return_type, ty("kotlin.String"));
    assert_eq!(fake.overridden_descriptors(), &[from_left, from_right]);
}

#[test]
fn test_declared_member_binds_to_inherited_ones() {
    let fixture = Fixture::new();
    let base = fixture.class("p.Base");
    let current = fixture.class("p.Derived");

    let inherited = fixture.member(function(base, "foo", ty("kotlin.Any")));
    let unrelated = fixture
        .member(function(base, "foo", ty("kotlin.Any")).with_value_parameters(vec![parameter("x", ty("kotlin.Int"))]));
    let declared = fixture.member(function(current, "foo", ty("kotlin.String")));

    let mut recorder = Recorder::default();
    fixture
        .util()
        .generate_overrides_in_function_group(
            &name("foo"),
            &[inherited, unrelated, inherited],
            &[declared],
            current,
            &mut recorder,
        )
        .unwrap();

    assert_eq!(recorder.overridden, vec![(declared, vec![inherited])]);
    // The overload with a parameter is still inherited.
    assert_eq!(recorder.fake_overrides.len(), 1);
    assert_eq!(
        fixture.callable(recorder.fake_overrides[0]).overridden_descriptors(),
        &[unrelated]
    );
}

#[test]
fn test_invisible_private_member_is_not_overridden() {
    let fixture = Fixture::new();
    let base = fixture.class("p.Base");
    let current = fixture.class("p.Derived");

    let private = fixture.member(function(base, "foo", ty("kotlin.Any")).with_visibility(Visibility::Private));
    let declared = fixture.member(function(current, "foo", ty("kotlin.Any")));

    let mut recorder = Recorder::default();
    fixture
        .util()
        .generate_overrides_in_function_group(&name("foo"), &[private], &[declared], current, &mut recorder)
        .unwrap();

    assert_eq!(recorder.overridden, vec![(declared, vec![])]);
    assert!(recorder.fake_overrides.is_empty());
}

#[test]
fn test_all_invisible_group_becomes_invisible_fake() {
    let fixture = Fixture::new();
    let base = fixture.class("p.Base");
    let current = fixture.class("p.Derived");
    let private = fixture.member(function(base, "secret", ty("kotlin.Any")).with_visibility(Visibility::Private));

    let mut recorder = Recorder::default();
    fixture
        .util()
        .generate_overrides_in_function_group(&name("secret"), &[private], &[], current, &mut recorder)
        .unwrap();

    let fake = fixture.callable(recorder.fake_overrides[0]);
    assert_eq!(fake.visibility(), Visibility::InvisibleFake);
    assert_eq!(fake.overridden_descriptors(), &[private]);
}

#[test]
fn test_binding_ignores_return_types() {
    let fixture = Fixture::new();
    let left = fixture.class("p.Left");
    let right = fixture.class("p.Right");
    let current = fixture.class("p.Both");

    let from_left = fixture.member(function(left, "foo", ty("kotlin.Int")));
    let from_right = fixture.member(function(right, "foo", ty("kotlin.String")));
    let declared = fixture.member(function(current, "foo", ty("kotlin.Int")));

    let mut recorder = Recorder::default();
    fixture
        .util()
        .generate_overrides_in_function_group(&name("foo"), &[from_left, from_right], &[declared], current, &mut recorder)
        .unwrap();

    assert_eq!(recorder.overridden, vec![(declared, vec![from_left, from_right])]);
    assert!(recorder.fake_overrides.is_empty());
}

#[test]
fn test_type_parameter_count_clash_reports_conflict() {
    let fixture = Fixture::new();
    let base = fixture.class("p.Base");
    let current = fixture.class("p.Derived");
    let t = fixture.arena.alloc_type_parameter(TypeParameterDescriptor {
        name: name("T"),
        container: current,
        index: 0,
        upper_bounds: vec![ty("kotlin.Any").make_nullable(true)],
    });

    let inherited = fixture.member(function(base, "foo", ty("kotlin.Any")));
    let declared = fixture.member(function(current, "foo", ty("kotlin.Any")).with_type_parameters(vec![t]));

    let mut recorder = Recorder::default();
    fixture
        .util()
        .generate_overrides_in_function_group(&name("foo"), &[inherited], &[declared], current, &mut recorder)
        .unwrap();

    assert_eq!(recorder.conflicts, vec![(inherited, declared)]);
    assert_eq!(recorder.overridden, vec![(declared, vec![])]);
    assert!(recorder.fake_overrides.is_empty());
}

// =============================================================================
// Specificity
// =============================================================================

#[test]
fn test_val_is_never_more_specific_than_var() {
    let fixture = Fixture::new();
    let base = fixture.class("p.Base");
    let util = fixture.util();

    let val = property(base, "x", false, ty("kotlin.String"));
    let var = property(base, "x", true, ty("kotlin.CharSequence"));
    assert!(!util.is_more_specific(&val, &var).unwrap());
    assert!(!util.is_more_specific(&var, &val).unwrap());

    let narrower_val = property(base, "x", false, ty("kotlin.String"));
    let wider_val = property(base, "x", false, ty("kotlin.CharSequence"));
    assert!(util.is_more_specific(&narrower_val, &wider_val).unwrap());

    let var_again = property(base, "x", true, ty("kotlin.CharSequence"));
    assert!(util.is_more_specific(&var, &var_again).unwrap());
}

#[test]
fn test_non_flexible_return_type_wins_tie() {
    let fixture = Fixture::new();
    let left = fixture.class("p.Left");
    let right = fixture.class("p.Right");
    let current = fixture.class("p.Both");

    let from_left = fixture.member(function(left, "name", ty("kotlin.String")));
    let from_right = fixture.member(function(right, "name", ty("kotlin.String").make_flexible()));

    let mut recorder = Recorder::default();
    fixture
        .util()
        .generate_overrides_in_function_group(&name("name"), &[from_left, from_right], &[], current, &mut recorder)
        .unwrap();

    let fake = fixture.callable(recorder.fake_overrides[0]);
    assert!(!fake.return_type.is_flexible());
}

// =============================================================================
// Visibility inference
// =============================================================================

#[test]
fn test_fake_override_inherits_widest_visibility() {
    let fixture = Fixture::new();
    let left = fixture.class("p.Left");
    let right = fixture.class("p.Right");
    let current = fixture.class("p.Both");

    let protected = fixture.member(
        function(left, "foo", ty("kotlin.Any"))
            .with_visibility(Visibility::Protected)
            .with_modality(Modality::Abstract),
    );
    let public = fixture.member(function(right, "foo", ty("kotlin.Any")));

    let mut recorder = Recorder::default();
    fixture
        .util()
        .generate_overrides_in_function_group(&name("foo"), &[protected, public], &[], current, &mut recorder)
        .unwrap();
    let fake = recorder.fake_overrides[0];

    let failures = RefCell::new(Vec::new());
    let report = |member: DescriptorId| failures.borrow_mut().push(member);
    resolve_unknown_visibility_for_member(&fixture.arena, fake, Some(&report)).unwrap();

    assert!(failures.borrow().is_empty());
    assert_eq!(fixture.callable(fake).visibility(), Visibility::Public);
}

#[test]
fn test_conflicting_implementations_cannot_infer_visibility() {
    let fixture = Fixture::new();
    let left = fixture.class("p.Left");
    let right = fixture.class("p.Right");
    let current = fixture.class("p.Both");

    let protected = fixture.member(function(left, "foo", ty("kotlin.Any")).with_visibility(Visibility::Protected));
    let public = fixture.member(function(right, "foo", ty("kotlin.Any")));

    let mut recorder = Recorder::default();
    fixture
        .util()
        .generate_overrides_in_function_group(&name("foo"), &[protected, public], &[], current, &mut recorder)
        .unwrap();
    let fake = recorder.fake_overrides[0];

    let failures = RefCell::new(Vec::new());
    let report = |member: DescriptorId| failures.borrow_mut().push(member);
    resolve_unknown_visibility_for_member(&fixture.arena, fake, Some(&report)).unwrap();

    assert_eq!(*failures.borrow(), vec![fake]);
    assert_eq!(fixture.callable(fake).visibility(), Visibility::Public);
}

#[test]
fn test_inherited_declaration_resolves_through_chain() {
    let fixture = Fixture::new();
    let base = fixture.class("p.Base");
    let middle = fixture.class("p.Middle");
    let current = fixture.class("p.Derived");

    let root = fixture.member(function(base, "foo", ty("kotlin.Any")).with_visibility(Visibility::Protected));
    let middle_member = fixture.member(function(middle, "foo", ty("kotlin.Any")).with_visibility(Visibility::Inherited));
    fixture.callable(middle_member).set_overridden_descriptors(vec![root]).unwrap();
    let leaf = fixture.member(function(current, "foo", ty("kotlin.Any")).with_visibility(Visibility::Inherited));
    fixture.callable(leaf).set_overridden_descriptors(vec![middle_member]).unwrap();

    resolve_unknown_visibility_for_member(&fixture.arena, leaf, None).unwrap();

    assert_eq!(fixture.callable(middle_member).visibility(), Visibility::Protected);
    assert_eq!(fixture.callable(leaf).visibility(), Visibility::Protected);
}
