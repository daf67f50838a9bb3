//! Concurrent lookups against one registry.

mod common;

use common::{Person, Sample};
use std::sync::Arc;
use std::thread;
use tidemark::{TideError, TypeRegistry};

#[test]
fn test_concurrent_lookups_see_one_metadata() {
    let registry = TypeRegistry::new();
    let person = registry.register::<Person>().unwrap();
    let sample = registry.register::<Sample>().unwrap();

    thread::scope(|scope| {
        for _ in 0..8 {
            scope.spawn(|| {
                for _ in 0..1_000 {
                    assert!(Arc::ptr_eq(&registry.lookup::<Person>().unwrap(), &person));
                    assert!(Arc::ptr_eq(&registry.lookup::<Sample>().unwrap(), &sample));
                }
            });
        }
    });
    assert_eq!(registry.len().unwrap(), 2);
}

#[test]
fn test_concurrent_registration_has_one_winner() {
    let registry = TypeRegistry::new();
    let results: Vec<Result<_, TideError>> = thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| scope.spawn(|| registry.register::<Person>()))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .filter_map(|r| r.as_ref().err())
        .all(|e| matches!(e, TideError::AlreadyRegistered { .. })));
}

#[test]
fn test_shared_registry_across_threads() {
    let registry = Arc::new(TypeRegistry::new());
    registry.register::<Person>().unwrap();
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || registry.table_name::<Person>().unwrap())
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.join().unwrap(), "person");
    }
}
