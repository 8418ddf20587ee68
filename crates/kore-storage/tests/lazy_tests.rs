use super::*;
use crate::LockBasedStorageManager;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

fn manager() -> LockBasedStorageManager {
    LockBasedStorageManager::new("lazy tests")
}

#[test]
fn test_lazy_value_computes_once() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let value = manager().create_lazy_value(move || {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok("computed".to_string())
    });

    assert!(!value.is_computed());
    assert_eq!(value.get().unwrap(), "computed");
    assert_eq!(value.get().unwrap(), "computed");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(value.is_computed());
    assert!(!value.is_computing());
}

#[test]
fn test_nullable_absence_is_cached() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let value = manager().create_nullable_lazy_value(move || {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(None::<u32>)
    });

    assert_eq!(value.get().unwrap(), None);
    assert_eq!(value.get().unwrap(), None);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_recursion_fallback_returned_to_reentrant_caller() {
    let slot: Arc<OnceLock<LazyValue<i32>>> = Arc::new(OnceLock::new());
    let seen_inner = Arc::new(AtomicUsize::new(0));

    let this = Arc::clone(&slot);
    let seen = Arc::clone(&seen_inner);
    let value = manager().create_recursion_tolerant_lazy_value(
        move || {
            let inner = this.get().unwrap().get()?;
            seen.store(inner as usize, Ordering::SeqCst);
            Ok(inner + 100)
        },
        1,
    );
    slot.set(value.clone()).unwrap();

    assert_eq!(value.get().unwrap(), 101);
    assert_eq!(seen_inner.load(Ordering::SeqCst), 1);
    // The memoized value is the outer result, not the fallback.
    assert_eq!(value.get().unwrap(), 101);
}

#[test]
fn test_recursion_without_fallback_fails() {
    let slot: Arc<OnceLock<LazyValue<i32>>> = Arc::new(OnceLock::new());
    let this = Arc::clone(&slot);
    let value = manager().create_lazy_value(move || this.get().unwrap().get());
    slot.set(value.clone()).unwrap();

    let error = value.get().unwrap_err();
    assert!(error.is_recursion());
    let message = error.to_string();
    assert!(message.starts_with("Recursion detected in a lazy value"), "{message}");
    assert!(message.contains("lazy tests"), "{message}");

    // The failure is memoized.
    assert!(value.get().unwrap_err().is_recursion());
    assert!(value.is_computed());
}

#[test]
fn test_recursion_handler_sees_first_time_once() {
    let slot: Arc<OnceLock<LazyValue<usize>>> = Arc::new(OnceLock::new());
    let flags = Arc::new(parking_lot::Mutex::new(Vec::new()));

    let this = Arc::clone(&slot);
    let recorded = Arc::clone(&flags);
    let value = manager().create_lazy_value_with_recursion_handler(
        move || {
            let first = this.get().unwrap().get()?;
            let second = this.get().unwrap().get()?;
            Ok(first + second)
        },
        move |first_time| {
            recorded.lock().push(first_time);
            Ok(if first_time { 10 } else { 20 })
        },
    );
    slot.set(value.clone()).unwrap();

    assert_eq!(value.get().unwrap(), 30);
    assert_eq!(*flags.lock(), vec![true, false]);
}

#[test]
fn test_post_compute_runs_once_with_value() {
    let hook_values = Arc::new(parking_lot::Mutex::new(Vec::new()));
    let recorded = Arc::clone(&hook_values);
    let value = manager().create_lazy_value_with_post_compute(
        || Ok(42),
        None,
        move |value: &i32| {
            recorded.lock().push(*value);
            Ok(())
        },
    );

    assert_eq!(value.get().unwrap(), 42);
    assert_eq!(value.get().unwrap(), 42);
    assert_eq!(*hook_values.lock(), vec![42]);
}

#[test]
fn test_post_compute_reentry_sees_computed_value() {
    let slot: Arc<OnceLock<LazyValue<i32>>> = Arc::new(OnceLock::new());
    let observed = Arc::new(AtomicUsize::new(0));

    let this = Arc::clone(&slot);
    let seen = Arc::clone(&observed);
    let value = manager().create_lazy_value_with_post_compute(
        || Ok(7),
        None,
        move |_| {
            let again = this.get().unwrap().get()?;
            seen.store(again as usize, Ordering::SeqCst);
            Ok(())
        },
    );
    slot.set(value.clone()).unwrap();

    assert_eq!(value.get().unwrap(), 7);
    assert_eq!(observed.load(Ordering::SeqCst), 7);
}

#[test]
fn test_post_compute_failure_is_memoized() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let value = manager().create_lazy_value_with_post_compute(
        move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(1)
        },
        None,
        |_| Err(StorageError::failed("index rejected value")),
    );

    assert!(value.get().is_err());
    assert!(value.get().is_err());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_failure_is_memoized() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let value = manager().create_lazy_value(move || -> StorageResult<u8> {
        counter.fetch_add(1, Ordering::SeqCst);
        Err(StorageError::failed("boom"))
    });

    let first = value.get().unwrap_err();
    let second = value.get().unwrap_err();
    assert_eq!(first.to_string(), "computation failed: boom");
    assert_eq!(second.to_string(), first.to_string());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_panic_resets_cell() {
    let should_panic = Arc::new(AtomicBool::new(true));
    let flag = Arc::clone(&should_panic);
    let value = manager().create_lazy_value(move || {
        if flag.swap(false, Ordering::SeqCst) {
            panic!("cancelled");
        }
        Ok(5)
    });

    let result = catch_unwind(AssertUnwindSafe(|| value.get()));
    assert!(result.is_err());
    assert!(!value.is_computing());
    assert!(!value.is_computed());
    assert_eq!(value.get().unwrap(), 5);
}
