//! Store factory for the entitlement actor
//!
//! Builds the configured [`CounterStore`] and spawns the actor that owns it.
//!
//! # Store Types
//!
//! ## Memory Store
//! - Counters live in process memory
//! - Lost on restart; suitable for development and single-instance demos
//!
//! ## File Store
//! - Counters are written through to a JSON file on every change
//! - Survives restarts; one process per file

use crate::actor::{Engine, EntitlementActor, EntitlementHandle};
use crate::config::{Config, StoreConfig, StoreType};
use crate::file_store::JsonFileStore;
use anyhow::{Result, anyhow};
use quotagate::{Cooldown, CounterStore, Entitlements, MemoryStore, PlanTable};

/// Create the counter store described by `config`
///
/// # Errors
///
/// Fails when the file store has no path or its file cannot be read.
pub fn create_store(config: &StoreConfig) -> Result<Box<dyn CounterStore + Send>> {
    match config.store_type {
        StoreType::Memory => Ok(Box::new(
            MemoryStore::builder().capacity(config.capacity).build(),
        )),
        StoreType::File => {
            let path = config
                .path
                .as_ref()
                .ok_or_else(|| anyhow!("File store requires --store-path"))?;
            Ok(Box::new(JsonFileStore::open(path)?))
        }
    }
}

/// Create the entitlement actor with the configured store and plans
///
/// # Example
///
/// ```ignore
/// let config = Config::from_env_and_args()?;
/// let plans = load_plans(config.limits.plans_file.as_deref())?;
/// let entitlements = create_entitlements(&config, plans)?;
/// ```
pub fn create_entitlements(config: &Config, plans: PlanTable) -> Result<EntitlementHandle> {
    let store = create_store(&config.store)?;
    let engine: Engine = Entitlements::new(store, plans);
    let cooldown = Cooldown::builder().capacity(config.store.capacity).build();

    Ok(EntitlementActor::spawn(
        config.buffer_size,
        engine,
        cooldown,
        config.limits.cooldown_seconds,
    ))
}
