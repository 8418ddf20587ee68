//! End-to-end resolution of JSON declarations through a `ResolveSession`.

use kore_common::{ClassId, DiagnosticCode, FqName, Name};
use kore_descriptors::{CallableKind, CallableMemberDescriptor, DescriptorId, Modality, Visibility};
use kore_resolve::{
    BindingContext, CLASS_DESCRIPTOR, DeclarationFile, ExternalConditionResult, ExternalOverridabilityCondition,
    MemberCacheKind, RESOLVED_MEMBERS, ResolveError, ResolveSession,
};
use rayon::prelude::*;
use std::sync::Arc;

fn class_id(name: &str) -> ClassId {
    ClassId::top_level(&FqName::parse(name).unwrap()).unwrap()
}

fn name(text: &str) -> Name {
    Name::identifier(text).unwrap()
}

fn callable(session: &ResolveSession, id: DescriptorId) -> Arc<CallableMemberDescriptor> {
    session.arena().callable(id).unwrap()
}

const SHAPES: &str = r#"{
    "classes": [
        {
            "id": "shapes/Shape",
            "kind": "interface",
            "members": [
                { "name": "area", "returnType": "Double" },
                { "name": "name", "kind": "property", "returnType": "String" },
                { "name": "describe", "modality": "open", "returnType": "String" }
            ]
        },
        {
            "id": "shapes/Named",
            "kind": "interface",
            "members": [
                { "name": "name", "kind": "property", "returnType": "String" }
            ]
        },
        {
            "id": "shapes/Circle",
            "modality": "open",
            "supertypes": ["shapes.Shape", "shapes.Named"],
            "members": [
                { "name": "area", "modality": "open", "visibility": "inherited", "returnType": "Double" },
                { "name": "radius", "kind": "property", "returnType": "Double" },
                { "name": "unit", "isStatic": true, "returnType": "shapes.Circle" }
            ]
        },
        {
            "id": "shapes/Ring",
            "supertypes": ["shapes.Circle"],
            "members": [
                { "name": "unit", "isStatic": true, "returnType": "shapes.Ring" }
            ]
        }
    ]
}"#;

#[test]
fn declared_member_overrides_interface_member() {
    let session = ResolveSession::from_json_str(SHAPES).unwrap();
    let circle = class_id("shapes.Circle");
    let shape = class_id("shapes.Shape");

    let resolved = session.members(&circle, &name("area")).unwrap();
    let declared = session.declared_members(&circle, &name("area")).unwrap();
    assert_eq!(&resolved[..], &declared[..]);

    let area = callable(&session, resolved[0]);
    assert_eq!(area.kind, CallableKind::Declaration);
    let shape_area = session.members(&shape, &name("area")).unwrap();
    assert_eq!(area.overridden_descriptors(), &shape_area[..]);
    assert_eq!(callable(&session, shape_area[0]).modality, Modality::Abstract);
    // Inherited visibility comes from the interface member.
    assert_eq!(area.visibility(), Visibility::Public);
}

#[test]
fn members_from_two_interfaces_merge_into_one_fake_override() {
    let session = ResolveSession::from_json_str(SHAPES).unwrap();
    let circle = class_id("shapes.Circle");

    let resolved = session.members(&circle, &name("name")).unwrap();
    assert_eq!(resolved.len(), 1);
    let fake = callable(&session, resolved[0]);
    assert_eq!(fake.kind, CallableKind::FakeOverride);
    assert_eq!(fake.modality, Modality::Abstract);
    assert_eq!(fake.overridden_descriptors().len(), 2);
    assert_eq!(
        session.render(resolved[0]),
        "public abstract /*fake_override*/ val name: String defined in shapes/Circle"
    );
}

#[test]
fn member_scope_lists_declared_and_inherited_names() {
    let session = ResolveSession::from_json_str(SHAPES).unwrap();
    let ring = class_id("shapes.Ring");

    let scope = session.member_scope(&ring).unwrap();
    let names: Vec<&str> = scope.names().map(Name::as_str).collect();
    assert_eq!(names, ["unit", "area", "radius", "name", "describe"]);
    assert_eq!(scope.class_id(), &ring);
    assert_eq!(scope.member_count(), 5);
    assert!(scope.get(&name("missing")).is_empty());

    let describe = callable(&session, scope.get(&name("describe"))[0]);
    assert_eq!(describe.kind, CallableKind::FakeOverride);
    // Fake override of a fake override.
    let circle_describe = callable(&session, describe.overridden_descriptors()[0]);
    assert_eq!(circle_describe.kind, CallableKind::FakeOverride);
}

#[test]
fn static_members_do_not_override() {
    let session = ResolveSession::from_json_str(SHAPES).unwrap();
    let ring = class_id("shapes.Ring");

    let resolved = session.members(&ring, &name("unit")).unwrap();
    assert_eq!(resolved.len(), 1);
    let unit = callable(&session, resolved[0]);
    assert!(unit.is_static);
    assert_eq!(unit.kind, CallableKind::Declaration);
    assert!(!unit.has_overridden_descriptors_set());
}

#[test]
fn resolution_is_recorded_in_the_trace() {
    let session = ResolveSession::from_json_str(SHAPES).unwrap();
    let circle = class_id("shapes.Circle");

    let scopes = session.resolve_all().unwrap();
    assert_eq!(scopes.len(), 4);
    assert_eq!(
        session.trace().get(CLASS_DESCRIPTOR, &circle),
        session.class_descriptor(&circle).unwrap()
    );
    let recorded = session.trace().get(RESOLVED_MEMBERS, &(circle.clone(), name("radius"))).unwrap();
    assert_eq!(&recorded[..], session.member_scope(&circle).unwrap().get(&name("radius")));
    assert!(session.diagnostics().is_empty());
}

#[test]
fn unknown_classes() {
    let session = ResolveSession::from_json_str(SHAPES).unwrap();
    let unknown = class_id("shapes.Square");

    assert_eq!(session.class_descriptor(&unknown).unwrap(), None);
    assert!(matches!(
        session.supertypes(&unknown),
        Err(ResolveError::UnknownClass(id)) if id == unknown
    ));
}

#[test]
fn implicit_any_supertype() {
    let session = ResolveSession::from_json_str(SHAPES).unwrap();
    let supertypes = session.supertypes(&class_id("shapes.Shape")).unwrap();
    assert_eq!(supertypes.len(), 1);
    assert_eq!(supertypes[0].class_id(), Some(&class_id("kotlin.Any")));
}

#[test]
fn supertype_cycle_is_reported_once_per_class() {
    let session = ResolveSession::from_json_str(
        r#"{
            "classes": [
                { "id": "p/A", "supertypes": ["p.B"], "members": [{ "name": "foo" }] },
                { "id": "p/B", "supertypes": ["p.A"], "members": [{ "name": "bar" }] }
            ]
        }"#,
    )
    .unwrap();
    let a = class_id("p.A");
    let b = class_id("p.B");

    let scope = session.member_scope(&a).unwrap();
    assert_eq!(scope.names().count(), 1);
    session.member_scope(&b).unwrap();

    assert!(session.has_supertype_cycle(&a));
    assert!(session.has_supertype_cycle(&b));
    let diagnostics = session.diagnostics();
    assert_eq!(diagnostics.len(), 2);
    assert!(
        diagnostics
            .iter()
            .all(|diagnostic| diagnostic.code == DiagnosticCode::CyclicInheritanceHierarchy)
    );
}

#[test]
fn missing_supertype_is_a_warning() {
    let session = ResolveSession::from_json_str(
        r#"{ "classes": [{ "id": "p/C", "supertypes": ["p.Missing"] }] }"#,
    )
    .unwrap();
    let c = class_id("p.C");

    let supertypes = session.supertypes(&c).unwrap();
    assert_eq!(supertypes[0].class_id(), Some(&class_id("kotlin.Any")));
    let diagnostics = session.diagnostics();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].code, DiagnosticCode::IncompleteHierarchy);
    assert_eq!(diagnostics[0].subject, "p/C");
    assert!(!diagnostics[0].is_error());
}

#[test]
fn platform_types_are_equal_to_kotlin_types() {
    let session = ResolveSession::from_json_str(
        r#"{
            "classes": [
                {
                    "id": "p/JavaBase",
                    "modality": "open",
                    "members": [
                        { "name": "take", "modality": "open", "parameters": [{ "name": "s", "type": "java.lang.String!" }] }
                    ]
                },
                {
                    "id": "p/Derived",
                    "supertypes": ["p.JavaBase"],
                    "members": [
                        { "name": "take", "parameters": [{ "name": "s", "type": "String" }] }
                    ]
                }
            ]
        }"#,
    )
    .unwrap();
    let derived = class_id("p.Derived");

    let resolved = session.members(&derived, &name("take")).unwrap();
    assert_eq!(resolved.len(), 1);
    assert_eq!(callable(&session, resolved[0]).overridden_descriptors().len(), 1);
}

const BOXES: &str = r#"{
    "classes": [
        {
            "id": "p/Box",
            "kind": "interface",
            "typeParameters": [{ "name": "T" }],
            "members": [{ "name": "put", "parameters": [{ "name": "x", "type": "T" }] }]
        },
        {
            "id": "p/StringBox",
            "supertypes": ["p.Box<String>"],
            "members": [{ "name": "put", "parameters": [{ "name": "x", "type": "String" }] }]
        },
        {
            "id": "p/Holder",
            "kind": "interface",
            "typeParameters": [{ "name": "A" }],
            "supertypes": ["p.Box<A>"]
        },
        {
            "id": "p/IntHolder",
            "kind": "interface",
            "supertypes": ["p.Holder<Int>"]
        },
        {
            "id": "p/IntBox",
            "supertypes": ["p.IntHolder"],
            "members": [{ "name": "put", "parameters": [{ "name": "x", "type": "Int" }] }]
        }
    ]
}"#;

#[test]
fn generic_supertype_members_are_substituted() {
    let session = ResolveSession::from_json_str(BOXES).unwrap();
    let box_put = session.members(&class_id("p.Box"), &name("put")).unwrap()[0];

    let resolved = session.members(&class_id("p.StringBox"), &name("put")).unwrap();
    assert_eq!(resolved.len(), 1);
    let put = callable(&session, resolved[0]);
    assert_eq!(put.kind, CallableKind::Declaration);
    assert_eq!(put.overridden_descriptors().len(), 1);
    let overridden = callable(&session, put.overridden_descriptors()[0]);
    assert_eq!(overridden.original(), Some(box_put));
    assert_eq!(session.render(put.overridden_descriptors()[0]), session.render(box_put).replace("x: T", "x: String"));
    assert!(session.diagnostics().is_empty());
}

#[test]
fn substitution_follows_the_hierarchy() {
    let session = ResolveSession::from_json_str(BOXES).unwrap();

    let holder_put = session.members(&class_id("p.Holder"), &name("put")).unwrap();
    assert_eq!(holder_put.len(), 1);
    assert_eq!(callable(&session, holder_put[0]).kind, CallableKind::FakeOverride);

    let int_holder_put = session.members(&class_id("p.IntHolder"), &name("put")).unwrap();
    assert_eq!(int_holder_put.len(), 1);
    assert_eq!(
        session.render(int_holder_put[0]),
        "public abstract /*fake_override*/ fun put(x: Int): Unit defined in p/IntHolder"
    );

    let resolved = session.members(&class_id("p.IntBox"), &name("put")).unwrap();
    assert_eq!(resolved.len(), 1);
    let put = callable(&session, resolved[0]);
    assert_eq!(put.kind, CallableKind::Declaration);
    assert_eq!(put.overridden_descriptors(), &int_holder_put[..]);
}

#[test]
fn configured_platform_pairs_extend_the_builtins() {
    let json = r#"{
        "config": {
            "debugName": "boxes",
            "platformClassMap": [{ "platform": "com.example.JBox", "kotlin": "com.example.Box" }]
        },
        "classes": [{ "id": "p/C" }]
    }"#;
    let session = ResolveSession::from_json_str(json).unwrap();

    assert_eq!(session.config().debug_name, "boxes");
    assert_eq!(
        session.platform_map().map_platform_class(&class_id("com.example.JBox")),
        Some(&class_id("com.example.Box"))
    );
}

#[test]
fn conflicts_can_be_silenced() {
    let json = |report: bool| {
        format!(
            r#"{{
                "config": {{ "reportConflicts": {report} }},
                "classes": [
                    {{ "id": "p/Base", "modality": "open", "members": [{{ "name": "foo", "modality": "open" }}] }},
                    {{
                        "id": "p/Derived",
                        "supertypes": ["p.Base"],
                        "members": [{{ "name": "foo", "typeParameters": [{{ "name": "T" }}] }}]
                    }}
                ]
            }}"#
        )
    };

    let reporting = ResolveSession::from_json_str(&json(true)).unwrap();
    reporting.resolve_all().unwrap();
    let diagnostics = reporting.diagnostics();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].code, DiagnosticCode::ConflictingInheritedMembers);
    assert_eq!(diagnostics[0].related.len(), 1);

    let silent = ResolveSession::from_json_str(&json(false)).unwrap();
    silent.resolve_all().unwrap();
    assert!(silent.diagnostics().is_empty());
}

#[test]
fn weak_member_cache_drops_unused_scopes() {
    let file = DeclarationFile::from_json_str(SHAPES).unwrap();
    let mut config = file.config.clone();
    config.member_cache = MemberCacheKind::Weak;
    let session = ResolveSession::with_config(file.classes, config).unwrap();
    let circle = class_id("shapes.Circle");

    let scope = session.member_scope(&circle).unwrap();
    assert!(session.is_member_scope_cached(&circle));
    assert!(Arc::ptr_eq(&scope, &session.member_scope(&circle).unwrap()));

    let weak = Arc::downgrade(&scope);
    drop(scope);
    assert!(weak.upgrade().is_none());
    assert!(!session.is_member_scope_cached(&circle));

    // Rebuilt from the memoized per-name members.
    let rebuilt = session.member_scope(&circle).unwrap();
    assert_eq!(rebuilt.member_count(), 5);
}

#[test]
fn strong_member_cache_keeps_scopes() {
    let session = ResolveSession::from_json_str(SHAPES).unwrap();
    let circle = class_id("shapes.Circle");
    assert_eq!(session.config().member_cache, MemberCacheKind::Strong);

    drop(session.member_scope(&circle).unwrap());
    assert!(session.is_member_scope_cached(&circle));
}

struct NeverOverride;

impl ExternalOverridabilityCondition for NeverOverride {
    fn is_overridable(
        &self,
        _super_member: &CallableMemberDescriptor,
        sub_member: &CallableMemberDescriptor,
        _sub_class: Option<DescriptorId>,
    ) -> ExternalConditionResult {
        if sub_member.name.as_str() == "area" {
            ExternalConditionResult::Incompatible
        } else {
            ExternalConditionResult::Unknown
        }
    }
}

#[test]
fn external_conditions_are_consulted_first() {
    let file = DeclarationFile::from_json_str(SHAPES).unwrap();
    let conditions: Vec<Box<dyn ExternalOverridabilityCondition>> = vec![Box::new(NeverOverride)];
    let session = ResolveSession::with_external_conditions(file.classes, file.config, conditions).unwrap();
    let circle = class_id("shapes.Circle");

    let resolved = session.members(&circle, &name("area")).unwrap();
    assert_eq!(resolved.len(), 2);
    let declared = callable(&session, resolved[0]);
    assert!(declared.overridden_descriptors().is_empty());
    assert_eq!(callable(&session, resolved[1]).kind, CallableKind::FakeOverride);
}

#[test]
fn concurrent_queries_share_results() {
    let session = ResolveSession::from_json_str(SHAPES).unwrap();
    let class_ids = session.class_ids();

    let scopes: Vec<_> = (0..64)
        .into_par_iter()
        .map(|i| {
            let class_id = &class_ids[i % class_ids.len()];
            (class_id.clone(), session.member_scope(class_id).unwrap())
        })
        .collect();

    for (class_id, scope) in &scopes {
        assert!(Arc::ptr_eq(scope, &session.member_scope(class_id).unwrap()));
    }
    let descriptors = session.arena().len();
    session.resolve_all().unwrap();
    assert_eq!(session.arena().len(), descriptors);
}

#[test]
fn invalid_inputs_are_rejected() {
    let duplicate = r#"{ "classes": [{ "id": "p/A" }, { "id": "p/A" }] }"#;
    assert!(matches!(
        ResolveSession::from_json_str(duplicate),
        Err(ResolveError::InvalidDeclaration { .. })
    ));

    let bad_type = r#"{ "classes": [{ "id": "p/A", "supertypes": ["List<"] }] }"#;
    let session = ResolveSession::from_json_str(bad_type).unwrap();
    assert!(matches!(
        session.supertypes(&class_id("p.A")),
        Err(ResolveError::InvalidDeclaration { .. })
    ));
}
