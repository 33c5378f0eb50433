use crate::engine::StorageEngine;
use crate::error::AdapterError;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// Hands out connection handles, sharing a single handle between all
/// adapters that opt in.
///
/// The host application constructs one registry and passes it (as an `Arc`)
/// to every adapter instance that should share a connection; the registry
/// instance itself stands in for process identity. The slot is written at
/// most once: the first successful connect wins, and later acquisitions
/// return the stored handle regardless of their own connection spec.
///
/// There is no reference counting: a shared handle lives until the process
/// tears the registry down. Graceful shutdown of a shared connection is not
/// supported at this layer.
pub struct ConnectionRegistry {
    slot: Mutex<Option<Arc<dyn StorageEngine>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(None),
        }
    }

    /// Acquires a connection handle.
    ///
    /// With `shared == false` the registry is bypassed entirely and
    /// `connect` runs unconditionally. With `shared == true` the stored
    /// handle is returned if present; otherwise `connect` runs and its
    /// handle is stored. The slot lock is held across the connect so
    /// concurrent first acquisitions still resolve to a single handle.
    pub async fn acquire<F, Fut>(
        &self,
        shared: bool,
        connect: F,
    ) -> Result<Arc<dyn StorageEngine>, AdapterError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Arc<dyn StorageEngine>, AdapterError>>,
    {
        if !shared {
            return connect().await;
        }

        let mut slot = self.slot.lock().await;
        if let Some(handle) = slot.as_ref() {
            return Ok(Arc::clone(handle));
        }

        let handle = connect().await?;
        *slot = Some(Arc::clone(&handle));
        Ok(handle)
    }

    /// Releases a handle obtained from [`ConnectionRegistry::acquire`].
    ///
    /// Exclusive handles close immediately. Shared handles persist for the
    /// registry's lifetime, so the release is a no-op from the individual
    /// adapter's perspective.
    pub async fn release(
        &self,
        handle: Arc<dyn StorageEngine>,
        shared: bool,
    ) -> Result<(), AdapterError> {
        if shared {
            debug!("releasing a shared connection handle is a no-op");
            return Ok(());
        }
        handle.close().await
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
