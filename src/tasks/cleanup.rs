//! TTL Cleanup Task
//!
//! Background task that periodically removes expired values from a
//! [`MemoryStore`].

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::store::MemoryStore;

/// Spawns a task sweeping expired values every `interval` until `cancel`
/// fires.
///
/// # Example
/// ```ignore
/// let store = Arc::new(MemoryStore::new(1000));
/// let token = CancellationToken::new();
/// let handle = spawn_cleanup_task(store.clone(), Duration::from_secs(1), token.clone());
/// // Later, during shutdown:
/// token.cancel();
/// handle.await?;
/// ```
pub fn spawn_cleanup_task(
    store: Arc<MemoryStore>,
    interval: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(interval_ms = interval.as_millis() as u64, "starting TTL cleanup task");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("TTL cleanup task stopped");
                    return;
                }
                _ = tokio::time::sleep(interval) => {}
            }

            let removed = store.cleanup_expired().await;
            if removed > 0 {
                info!(removed, "TTL cleanup: removed expired values");
            } else {
                debug!("TTL cleanup: no expired values found");
            }
        }
    })
}
