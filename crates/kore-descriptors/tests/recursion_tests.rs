use super::*;

#[test]
fn test_enter_and_leave() {
    let mut guard = RecursionGuard::new(10, 100);
    assert!(guard.enter(1u32).is_entered());
    assert!(guard.is_visiting(&1));
    assert_eq!(guard.depth(), 1);
    guard.leave(&1);
    assert!(!guard.is_visiting(&1));
    assert_eq!(guard.depth(), 0);
}

#[test]
fn test_reentering_same_key_is_a_cycle() {
    let mut guard = RecursionGuard::new(10, 100);
    assert!(guard.enter("A").is_entered());
    assert!(guard.enter("B").is_entered());
    assert!(guard.enter("A").is_cycle());
    guard.leave(&"B");
    guard.leave(&"A");
    assert!(!guard.is_exceeded());
}

#[test]
fn test_depth_limit() {
    let mut guard = RecursionGuard::new(2, 100);
    assert!(guard.enter(1u32).is_entered());
    assert!(guard.enter(2u32).is_entered());
    assert_eq!(guard.enter(3u32), RecursionResult::DepthExceeded);
    assert!(guard.is_exceeded());
    guard.leave(&2);
    guard.leave(&1);
}

#[test]
fn test_iteration_limit_counts_sibling_visits() {
    let mut guard = RecursionGuard::new(10, 3);
    for key in 0u32..3 {
        assert!(guard.enter(key).is_entered());
        guard.leave(&key);
    }
    assert_eq!(guard.enter(99), RecursionResult::IterationExceeded);
    assert!(guard.is_exceeded());
}

#[test]
fn test_scope_leaves_on_return() {
    let mut guard = RecursionGuard::with_profile(RecursionProfile::OverrideChain);
    let inner = guard.scope(7u32, |g| {
        assert!(g.is_visiting(&7));
        g.scope(7u32, |_| ()).unwrap_err()
    });
    assert_eq!(inner, Ok(RecursionResult::Cycle));
    assert_eq!(guard.depth(), 0);
}

#[test]
fn test_profiles_use_shared_limits() {
    assert_eq!(
        RecursionProfile::SupertypeWalk.max_depth(),
        kore_common::limits::MAX_SUPERTYPE_DEPTH
    );
    assert_eq!(
        RecursionProfile::OverrideChain.max_depth(),
        kore_common::limits::MAX_OVERRIDE_CHAIN_DEPTH
    );
}
