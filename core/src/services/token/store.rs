//! Write-through persistent cache for the security collections
//!
//! The store owns the in-memory revocation set, token-family map, and
//! failed-login map. Reads are synchronous and never touch I/O. Writes
//! update memory first and hand the durable write to a background task;
//! a failed durable write is logged and the in-memory state stays
//! authoritative for this process. [`initialize`](SecurityStore::initialize)
//! hydrates the caches from durable storage at startup, and
//! [`cleanup`](SecurityStore::cleanup) reconciles both sides on a schedule.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use chrono::{Duration, Utc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::domain::entities::family::{TokenFamily, FAMILY_RETENTION_DAYS};
use crate::domain::entities::login_attempt::LoginAttemptRecord;
use crate::domain::entities::revocation::RevokedToken;
use crate::errors::DomainResult;
use crate::repositories::SecurityRepository;

/// Failed-login records with no active lockout are dropped by the sweep
/// once they have been idle this long
const LOGIN_ATTEMPT_RETENTION_HOURS: i64 = 24;

/// Summary of one cleanup sweep
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CleanupSummary {
    /// Revocation entries pruned from durable storage
    pub expired_revocations_deleted: usize,
    /// Token families past the retention horizon
    pub stale_families_deleted: usize,
    /// Failed-login records whose lockout or idle window lapsed
    pub lapsed_lockouts_deleted: usize,
}

impl CleanupSummary {
    /// Total number of items removed in this sweep
    pub fn total_cleaned(&self) -> usize {
        self.expired_revocations_deleted + self.stale_families_deleted
            + self.lapsed_lockouts_deleted
    }
}

/// Write-through cache over the durable [`SecurityRepository`]
pub struct SecurityStore {
    repository: Arc<dyn SecurityRepository>,
    revocations: RwLock<HashMap<String, RevokedToken>>,
    families: RwLock<HashMap<String, TokenFamily>>,
    attempts: RwLock<HashMap<String, LoginAttemptRecord>>,
    cleanup_running: AtomicBool,
    cleanup_task: Mutex<Option<JoinHandle<()>>>,
}

impl SecurityStore {
    /// Creates a store over a durable repository; call
    /// [`initialize`](Self::initialize) before serving requests.
    pub fn new(repository: Arc<dyn SecurityRepository>) -> Self {
        Self {
            repository,
            revocations: RwLock::new(HashMap::new()),
            families: RwLock::new(HashMap::new()),
            attempts: RwLock::new(HashMap::new()),
            cleanup_running: AtomicBool::new(false),
            cleanup_task: Mutex::new(None),
        }
    }

    /// Hydrates the in-memory caches from durable storage.
    ///
    /// Hydration failure is non-fatal: the affected cache starts empty and
    /// the process boots anyway.
    pub async fn initialize(&self) {
        match self.repository.load_active_revocations().await {
            Ok(entries) => {
                let mut revocations = self.write_revocations();
                for entry in entries {
                    revocations.insert(entry.fingerprint.clone(), entry);
                }
                info!(count = revocations.len(), "hydrated revocation cache");
            }
            Err(error) => {
                warn!(%error, "failed to hydrate revocations, starting empty");
            }
        }

        match self.repository.load_families().await {
            Ok(families) => {
                let mut cache = self.write_families();
                for family in families {
                    cache.insert(family.family_id.clone(), family);
                }
                info!(count = cache.len(), "hydrated token family cache");
            }
            Err(error) => {
                warn!(%error, "failed to hydrate token families, starting empty");
            }
        }

        match self.repository.load_login_attempts().await {
            Ok(records) => {
                let mut attempts = self.write_attempts();
                for record in records {
                    attempts.insert(record.identity.clone(), record);
                }
                info!(count = attempts.len(), "hydrated login attempt cache");
            }
            Err(error) => {
                warn!(%error, "failed to hydrate login attempts, starting empty");
            }
        }
    }

    // ---- revocations ----

    /// Adds a revocation entry: memory now, durable storage in the background
    pub fn insert_revocation(&self, entry: RevokedToken) {
        self.write_revocations()
            .insert(entry.fingerprint.clone(), entry.clone());

        let repository = Arc::clone(&self.repository);
        spawn_persist("save_revoked_token", async move {
            repository.save_revoked_token(&entry).await
        });
    }

    /// Checks a fingerprint against the in-memory revocation set.
    ///
    /// No I/O: this sits on the hot path of every verification.
    pub fn is_revoked(&self, fingerprint: &str) -> bool {
        self.read_revocations()
            .get(fingerprint)
            .map(|entry| !entry.is_expired())
            .unwrap_or(false)
    }

    // ---- token families ----

    /// Adds a fingerprint to a family's active set, creating the family if
    /// this is a fresh login lineage.
    pub fn store_family_fingerprint(&self, family_id: &str, user_id: Uuid, fingerprint: String) {
        let snapshot = {
            let mut families = self.write_families();
            let family = families
                .entry(family_id.to_string())
                .or_insert_with(|| TokenFamily::new(family_id.to_string(), user_id));
            family.insert_fingerprint(fingerprint);
            family.touch();
            family.clone()
        };
        self.persist_family(snapshot);
    }

    /// Removes a fingerprint from a family's active set.
    ///
    /// Returns `false` if the family is unknown or did not contain the
    /// fingerprint.
    pub fn remove_family_fingerprint(&self, family_id: &str, fingerprint: &str) -> bool {
        let snapshot = {
            let mut families = self.write_families();
            match families.get_mut(family_id) {
                Some(family) => {
                    if !family.remove_fingerprint(fingerprint) {
                        return false;
                    }
                    family.touch();
                    Some(family.clone())
                }
                None => None,
            }
        };
        match snapshot {
            Some(family) => {
                self.persist_family(family);
                true
            }
            None => false,
        }
    }

    /// Drops a family entirely, returning it if it existed
    pub fn destroy_family(&self, family_id: &str) -> Option<TokenFamily> {
        let removed = self.write_families().remove(family_id);

        if removed.is_some() {
            let repository = Arc::clone(&self.repository);
            let family_id = family_id.to_string();
            spawn_persist("delete_family", async move {
                repository.delete_family(&family_id).await.map(|_| ())
            });
        }
        removed
    }

    /// Membership check: `None` when the family itself is unknown
    pub fn family_contains(&self, family_id: &str, fingerprint: &str) -> Option<bool> {
        self.read_families()
            .get(family_id)
            .map(|family| family.contains(fingerprint))
    }

    /// Whether a family exists in the cache
    pub fn family_known(&self, family_id: &str) -> bool {
        self.read_families().contains_key(family_id)
    }

    /// All fingerprints currently active in a family
    pub fn family_fingerprints(&self, family_id: &str) -> Vec<String> {
        self.read_families()
            .get(family_id)
            .map(|family| family.fingerprints.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Ids of every family belonging to a user
    pub fn families_for_user(&self, user_id: Uuid) -> Vec<String> {
        self.read_families()
            .values()
            .filter(|family| family.user_id == user_id)
            .map(|family| family.family_id.clone())
            .collect()
    }

    // ---- login attempts ----

    /// Current failed-login record for an identity
    pub fn login_attempts(&self, identity: &str) -> Option<LoginAttemptRecord> {
        self.read_attempts().get(identity).cloned()
    }

    /// Stores updated failed-login counters
    pub fn put_login_attempts(&self, record: LoginAttemptRecord) {
        self.write_attempts()
            .insert(record.identity.clone(), record.clone());

        let repository = Arc::clone(&self.repository);
        spawn_persist("save_login_attempts", async move {
            repository.save_login_attempts(&record).await
        });
    }

    /// Clears the failed-login record for an identity
    pub fn clear_login_attempts(&self, identity: &str) -> bool {
        let removed = self.write_attempts().remove(identity).is_some();

        let repository = Arc::clone(&self.repository);
        let identity = identity.to_string();
        spawn_persist("delete_login_attempts", async move {
            repository.delete_login_attempts(&identity).await.map(|_| ())
        });
        removed
    }

    // ---- maintenance ----

    /// Runs one cleanup sweep; a sweep already in flight makes this a no-op
    pub async fn cleanup(&self) -> DomainResult<CleanupSummary> {
        if self.cleanup_running.swap(true, Ordering::SeqCst) {
            debug!("cleanup sweep already running, skipping");
            return Ok(CleanupSummary::default());
        }
        let result = self.run_cleanup_cycle().await;
        self.cleanup_running.store(false, Ordering::SeqCst);
        result
    }

    async fn run_cleanup_cycle(&self) -> DomainResult<CleanupSummary> {
        let now = Utc::now();
        let mut summary = CleanupSummary::default();

        // Prune durable storage first, then rebuild the in-memory set from
        // the pruned source of truth. Best-effort writes that never landed
        // are dropped here; that is the documented staleness bound.
        summary.expired_revocations_deleted =
            self.repository.delete_expired_revocations(now).await?;
        let active = self.repository.load_active_revocations().await?;
        {
            let mut revocations = self.write_revocations();
            revocations.clear();
            for entry in active {
                revocations.insert(entry.fingerprint.clone(), entry);
            }
        }

        let cutoff = now - Duration::days(FAMILY_RETENTION_DAYS);
        summary.stale_families_deleted = self.repository.delete_stale_families(cutoff).await?;
        self.write_families()
            .retain(|_, family| family.last_used_at >= cutoff);

        let idle_cutoff = now - Duration::hours(LOGIN_ATTEMPT_RETENTION_HOURS);
        let lapsed: Vec<String> = self
            .read_attempts()
            .values()
            .filter(|record| {
                record.lockout_lapsed()
                    || (record.locked_until.is_none() && record.last_attempt_at < idle_cutoff)
            })
            .map(|record| record.identity.clone())
            .collect();
        {
            let mut attempts = self.write_attempts();
            for identity in &lapsed {
                attempts.remove(identity);
            }
        }
        for identity in &lapsed {
            self.repository.delete_login_attempts(identity).await?;
        }
        summary.lapsed_lockouts_deleted = lapsed.len();

        Ok(summary)
    }

    /// Registers the background sweep task so `shutdown` can cancel it
    pub fn attach_cleanup_task(&self, handle: JoinHandle<()>) {
        let mut slot = self
            .cleanup_task
            .lock()
            .expect("cleanup task slot poisoned");
        if let Some(previous) = slot.replace(handle) {
            previous.abort();
        }
    }

    /// Cancels the cleanup timer.
    ///
    /// No flush: durable writes are already fire-and-forget.
    pub fn shutdown(&self) {
        let handle = self
            .cleanup_task
            .lock()
            .expect("cleanup task slot poisoned")
            .take();
        if let Some(handle) = handle {
            handle.abort();
            info!("security store cleanup task stopped");
        }
    }

    // ---- lock helpers ----

    fn read_revocations(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, RevokedToken>> {
        self.revocations.read().expect("revocation cache poisoned")
    }

    fn write_revocations(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, RevokedToken>> {
        self.revocations.write().expect("revocation cache poisoned")
    }

    fn read_families(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, TokenFamily>> {
        self.families.read().expect("family cache poisoned")
    }

    fn write_families(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, TokenFamily>> {
        self.families.write().expect("family cache poisoned")
    }

    fn read_attempts(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, LoginAttemptRecord>> {
        self.attempts.read().expect("login attempt cache poisoned")
    }

    fn write_attempts(
        &self,
    ) -> std::sync::RwLockWriteGuard<'_, HashMap<String, LoginAttemptRecord>> {
        self.attempts.write().expect("login attempt cache poisoned")
    }

    fn persist_family(&self, family: TokenFamily) {
        let repository = Arc::clone(&self.repository);
        spawn_persist("save_family", async move {
            repository.save_family(&family).await
        });
    }
}

/// Hands a durable write to the runtime; the caller never awaits it
fn spawn_persist<F>(operation: &'static str, write: F)
where
    F: Future<Output = DomainResult<()>> + Send + 'static,
{
    tokio::spawn(async move {
        if let Err(error) = write.await {
            warn!(
                operation,
                %error,
                "durable security write failed, in-memory state remains authoritative"
            );
        }
    });
}
