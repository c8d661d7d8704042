use super::*;
use crate::core::CounterSnapshot;

fn used(n: u64) -> CounterSnapshot {
    CounterSnapshot {
        generations_today: n,
        generations_lifetime: n,
        ..CounterSnapshot::default()
    }
}

#[test]
fn test_load_creates_zero_snapshot() {
    let mut store = MemoryStore::new();
    let id = Identity::Guest("new".into());

    assert!(store.get(&id).is_none());
    let snapshot = store.load(&id).unwrap();

    assert_eq!(snapshot, CounterSnapshot::default());
    assert_eq!(store.get(&id), Some(&CounterSnapshot::default()));
    assert_eq!(store.len(), 1);
}

#[test]
fn test_save_then_load() {
    let mut store = MemoryStore::new();
    let id = Identity::Account("1".into());

    store.save(&id, used(4)).unwrap();
    assert_eq!(store.load(&id).unwrap(), used(4));
}

#[test]
fn test_compare_and_swap_success() {
    let mut store = MemoryStore::new();
    let id = Identity::Account("1".into());
    store.save(&id, used(1)).unwrap();

    assert!(store.compare_and_swap(&id, &used(1), used(2)).unwrap());
    assert_eq!(store.load(&id).unwrap(), used(2));
}

#[test]
fn test_compare_and_swap_stale_expectation() {
    let mut store = MemoryStore::new();
    let id = Identity::Account("1".into());
    store.save(&id, used(3)).unwrap();

    assert!(!store.compare_and_swap(&id, &used(1), used(2)).unwrap());
    assert_eq!(store.load(&id).unwrap(), used(3));
}

#[test]
fn test_compare_and_swap_missing_record() {
    let mut store = MemoryStore::new();
    let id = Identity::Guest("g".into());

    // Missing behaves like the zero snapshot
    assert!(!store.compare_and_swap(&id, &used(1), used(2)).unwrap());
    assert!(store.is_empty());
    assert!(
        store
            .compare_and_swap(&id, &CounterSnapshot::default(), used(1))
            .unwrap()
    );
    assert_eq!(store.load(&id).unwrap(), used(1));
}

#[test]
fn test_guest_and_account_namespaces() {
    let mut store = MemoryStore::builder().capacity(10).build();
    store.save(&Identity::Guest("x".into()), used(1)).unwrap();
    store.save(&Identity::Account("x".into()), used(2)).unwrap();

    assert_eq!(store.len(), 2);
    assert_eq!(store.load(&Identity::Guest("x".into())).unwrap(), used(1));
}

#[test]
fn test_boxed_store() {
    let mut store: Box<dyn CounterStore> = Box::new(MemoryStore::new());
    let id = Identity::Guest("boxed".into());

    store.save(&id, used(2)).unwrap();
    assert!(store.compare_and_swap(&id, &used(2), used(3)).unwrap());
    assert_eq!(store.load(&id).unwrap(), used(3));
}
