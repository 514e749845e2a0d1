//! Scheduled maintenance of the security store
//!
//! Runs the store's cleanup sweep on a fixed interval: expired revocation
//! entries are pruned durably and the in-memory set re-derived, stale
//! token families are purged, and lapsed lockout records dropped.

use std::sync::Arc;

use tracing::{error, info, warn};

use crate::errors::DomainError;

use super::store::{CleanupSummary, SecurityStore};

/// Configuration for the cleanup scheduler
#[derive(Debug, Clone)]
pub struct SecurityCleanupConfig {
    /// How often to run cleanup (in seconds)
    pub interval_seconds: u64,
    /// Whether to enable automatic cleanup
    pub enabled: bool,
}

impl Default for SecurityCleanupConfig {
    fn default() -> Self {
        Self {
            interval_seconds: 3600, // Run every hour
            enabled: true,
        }
    }
}

/// Background sweep over the persistent security store
pub struct SecurityCleanupService {
    store: Arc<SecurityStore>,
    config: SecurityCleanupConfig,
}

impl SecurityCleanupService {
    /// Create a new cleanup service
    pub fn new(store: Arc<SecurityStore>, config: SecurityCleanupConfig) -> Self {
        Self { store, config }
    }

    /// Run a single cleanup cycle
    ///
    /// # Returns
    /// * `Ok(CleanupSummary)` - Counts of items removed
    /// * `Err(DomainError)` - If the sweep fails
    pub async fn run_cleanup(&self) -> Result<CleanupSummary, DomainError> {
        if !self.config.enabled {
            return Ok(CleanupSummary::default());
        }

        info!("starting security cleanup cycle");
        let summary = self.store.cleanup().await?;
        info!(
            revocations = summary.expired_revocations_deleted,
            families = summary.stale_families_deleted,
            lockouts = summary.lapsed_lockouts_deleted,
            "security cleanup completed"
        );
        Ok(summary)
    }

    /// Start the cleanup service as a background task
    ///
    /// Spawns a tokio task that runs cleanup at regular intervals and
    /// registers it with the store so `SecurityStore::shutdown` cancels it.
    pub fn start_background_task(self: Arc<Self>) {
        if !self.config.enabled {
            warn!("security cleanup service is disabled");
            return;
        }

        let interval = std::time::Duration::from_secs(self.config.interval_seconds);
        let store = Arc::clone(&self.store);

        let handle = tokio::spawn(async move {
            info!(
                interval_seconds = self.config.interval_seconds,
                "security cleanup service started"
            );

            let mut interval_timer = tokio::time::interval(interval);
            // The first tick fires immediately; skip it so a fresh boot
            // does not sweep before hydration settles.
            interval_timer.tick().await;

            loop {
                interval_timer.tick().await;

                if let Err(e) = self.run_cleanup().await {
                    error!("security cleanup cycle failed: {}", e);
                }
            }
        });

        store.attach_cleanup_task(handle);
    }
}
