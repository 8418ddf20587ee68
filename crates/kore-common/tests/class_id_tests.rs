use super::*;

fn fq(text: &str) -> FqName {
    FqName::parse(text).unwrap()
}

#[test]
fn test_top_level_round_trip() {
    for text in ["kotlin.Any", "a.b.c.D", "Root"] {
        let fq_name = fq(text);
        let id = ClassId::top_level(&fq_name).unwrap();
        assert_eq!(id.as_single_fq_name(), fq_name);
        assert!(!id.is_nested_class());
    }
}

#[test]
fn test_root_is_not_a_class() {
    assert!(ClassId::top_level(&FqName::root()).is_err());
    assert!(ClassId::new(fq("a.b"), FqName::root(), false).is_err());
    assert!(ClassId::new(fq("a.b"), FqName::root(), true).is_ok());
}

#[test]
fn test_nested_class_ids() {
    let outer = ClassId::top_level(&fq("kotlin.collections.Map")).unwrap();
    let entry = outer.create_nested_class_id(Name::identifier("Entry").unwrap());

    assert!(entry.is_nested_class());
    assert_eq!(entry.outer_class_id(), Some(outer.clone()));
    assert_eq!(entry.short_class_name().map(Name::as_str), Some("Entry"));
    assert_eq!(entry.as_string(), "kotlin/collections/Map.Entry");
    assert_eq!(outer.outer_class_id(), None);
}

#[test]
fn test_string_form_round_trip() {
    let id = ClassId::from_string("kotlin/collections/Map.Entry").unwrap();
    assert_eq!(id.package_fq_name(), &fq("kotlin.collections"));
    assert_eq!(id.relative_class_name(), &fq("Map.Entry"));
    assert_eq!(ClassId::from_string(&id.as_string()).unwrap(), id);

    let default_package = ClassId::from_string("Foo").unwrap();
    assert!(default_package.package_fq_name().is_root());
    assert_eq!(default_package.as_string(), "Foo");
}

#[test]
fn test_identity_is_structural() {
    let a = ClassId::new(fq("p"), fq("A"), false).unwrap();
    let b = ClassId::new(fq("p"), fq("A"), false).unwrap();
    let local = ClassId::new(fq("p"), fq("A"), true).unwrap();
    assert_eq!(a, b);
    assert_ne!(a, local);
}
