use super::*;

fn class(fq_name: &str) -> ClassId {
    ClassId::top_level(&FqName::parse(fq_name).unwrap()).unwrap()
}

#[test]
fn builtins_map_both_ways() {
    let map = PlatformClassMap::with_builtins();
    assert_eq!(map.len(), BUILTIN_PAIRS.len());
    assert_eq!(
        map.map_platform_class(&class("java.lang.String")),
        Some(&class("kotlin.String"))
    );
    assert_eq!(
        map.map_kotlin_to_platform(&class("kotlin.collections.List")),
        Some(&class("java.util.List"))
    );
    assert_eq!(map.map_platform_class(&class("java.lang.Thread")), None);
}

#[test]
fn canonical_prefers_kotlin_class() {
    let map = PlatformClassMap::with_builtins();
    let object = class("java.lang.Object");
    let any = class("kotlin.Any");
    assert_eq!(map.canonical(&object), &any);
    assert_eq!(map.canonical(&any), &any);
}

#[test]
fn equality_axioms_follow_pairs() {
    let map = PlatformClassMap::with_builtins();
    let string = TypeConstructor::Class(class("kotlin.String"));
    let java_string = TypeConstructor::Class(class("java.lang.String"));
    let int = TypeConstructor::Class(class("kotlin.Int"));

    assert!(map.equals(&string, &java_string));
    assert!(map.equals(&java_string, &string));
    assert!(!map.equals(&string, &int));
    assert!(!map.equals(&TypeConstructor::Error, &string));
}

#[test]
fn configured_pairs_extend_the_registry() {
    let mut map = PlatformClassMap::new();
    assert!(map.is_empty());
    map.extend(&[PlatformClassPair {
        platform: "com.example.JBox".to_string(),
        kotlin: "com.example.Box".to_string(),
    }])
    .unwrap();

    assert_eq!(
        map.map_platform_class(&class("com.example.JBox")),
        Some(&class("com.example.Box"))
    );
    assert_eq!(map.pairs().count(), 1);
}

#[test]
fn invalid_pair_is_rejected() {
    let mut map = PlatformClassMap::new();
    assert!(map.add("", "kotlin.Any").is_err());
    assert!(map.is_empty());
}

#[test]
fn registries_are_independent() {
    let mut first = PlatformClassMap::with_builtins();
    let second = PlatformClassMap::with_builtins();
    first.add("com.example.JBox", "com.example.Box").unwrap();
    assert_eq!(first.len(), second.len() + 1);
}
