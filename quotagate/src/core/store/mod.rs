use super::{CounterSnapshot, Identity};

#[cfg(test)]
mod tests;

mod memory;

pub use memory::{MemoryStore, MemoryStoreBuilder};

/// Persistence for per-identity usage counters
///
/// Errors are reported as strings and surfaced to callers as
/// [`QuotaError::Persistence`](super::QuotaError::Persistence). A failed
/// write must leave the stored snapshot unchanged.
pub trait CounterStore {
    /// Load the snapshot for `identity`
    ///
    /// If none exists, a zero snapshot is created, persisted and returned.
    fn load(&mut self, identity: &Identity) -> Result<CounterSnapshot, String>;

    /// Unconditionally overwrite the snapshot for `identity`
    fn save(&mut self, identity: &Identity, snapshot: CounterSnapshot) -> Result<(), String>;

    /// Replace the snapshot only if it still equals `old`
    ///
    /// Returns `Ok(false)` without writing when another writer got there
    /// first. This is the atomic conditional increment that keeps two
    /// concurrent sessions from both spending the last unit of quota.
    fn compare_and_swap(
        &mut self,
        identity: &Identity,
        old: &CounterSnapshot,
        new: CounterSnapshot,
    ) -> Result<bool, String>;
}

impl<S: CounterStore + ?Sized> CounterStore for Box<S> {
    fn load(&mut self, identity: &Identity) -> Result<CounterSnapshot, String> {
        (**self).load(identity)
    }

    fn save(&mut self, identity: &Identity, snapshot: CounterSnapshot) -> Result<(), String> {
        (**self).save(identity, snapshot)
    }

    fn compare_and_swap(
        &mut self,
        identity: &Identity,
        old: &CounterSnapshot,
        new: CounterSnapshot,
    ) -> Result<bool, String> {
        (**self).compare_and_swap(identity, old, new)
    }
}
