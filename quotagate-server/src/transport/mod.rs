//! Transport layer for the entitlement server
//!
//! Transports accept client requests, resolve who is asking and forward the
//! work to the entitlement actor through an [`EntitlementHandle`].
//!
//! # Available Transports
//!
//! - [`http`]: REST API with JSON

pub mod http;


use crate::actor::EntitlementHandle;
use anyhow::Result;
use async_trait::async_trait;

/// Common interface for all transport implementations
#[async_trait]
pub trait Transport {
    /// Start the transport server
    ///
    /// Runs until an error occurs or the server shuts down.
    async fn start(self, entitlements: EntitlementHandle) -> Result<()>;
}
