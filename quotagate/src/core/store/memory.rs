use super::CounterStore;
use crate::core::{CounterSnapshot, Identity};

#[cfg(feature = "ahash")]
use ahash::AHashMap as HashMap;
#[cfg(not(feature = "ahash"))]
use std::collections::HashMap;

// Configuration constants
const DEFAULT_CAPACITY: usize = 1000;
const CAPACITY_OVERHEAD_FACTOR: f64 = 1.3;

/// In-process counter store
///
/// Keeps every snapshot in a hash map keyed by
/// [`Identity::storage_key`]. Nothing survives a restart, which makes it a
/// fit for tests, development and single-node deployments that accept
/// losing usage history.
///
/// # Example
///
/// ```
/// use quotagate::{CounterStore, Identity, MemoryStore};
///
/// let mut store = MemoryStore::builder().capacity(10_000).build();
/// let snapshot = store.load(&Identity::Guest("abc".into())).unwrap();
/// assert_eq!(snapshot.generations_lifetime, 0);
/// ```
pub struct MemoryStore {
    data: HashMap<String, CounterSnapshot>,
}

/// Builder for configuring a MemoryStore
pub struct MemoryStoreBuilder {
    capacity: usize,
}

impl MemoryStore {
    /// Create a new MemoryStore with default capacity
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create a new MemoryStore sized for `capacity` identities
    ///
    /// The store will allocate 30% more space to reduce hash collisions.
    pub fn with_capacity(capacity: usize) -> Self {
        MemoryStore {
            data: HashMap::with_capacity((capacity as f64 * CAPACITY_OVERHEAD_FACTOR) as usize),
        }
    }

    pub fn builder() -> MemoryStoreBuilder {
        MemoryStoreBuilder::default()
    }

    /// Number of identities with a stored snapshot
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Read a snapshot without creating it
    pub fn get(&self, identity: &Identity) -> Option<&CounterSnapshot> {
        self.data.get(&identity.storage_key())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CounterStore for MemoryStore {
    fn load(&mut self, identity: &Identity) -> Result<CounterSnapshot, String> {
        Ok(self
            .data
            .entry(identity.storage_key())
            .or_default()
            .clone())
    }

    fn save(&mut self, identity: &Identity, snapshot: CounterSnapshot) -> Result<(), String> {
        self.data.insert(identity.storage_key(), snapshot);
        Ok(())
    }

    fn compare_and_swap(
        &mut self,
        identity: &Identity,
        old: &CounterSnapshot,
        new: CounterSnapshot,
    ) -> Result<bool, String> {
        match self.data.get_mut(&identity.storage_key()) {
            Some(current) if current == old => {
                *current = new;
                Ok(true)
            }
            Some(_) => Ok(false),
            // A missing record is equivalent to the zero snapshot
            None if *old == CounterSnapshot::default() => {
                self.data.insert(identity.storage_key(), new);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

impl Default for MemoryStoreBuilder {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
        }
    }
}

impl MemoryStoreBuilder {
    /// Create a new builder with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the expected number of identities
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn build(self) -> MemoryStore {
        MemoryStore::with_capacity(self.capacity)
    }
}
