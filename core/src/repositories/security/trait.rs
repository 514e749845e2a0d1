//! Durable-store trait for the security core's three collections.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::entities::family::TokenFamily;
use crate::domain::entities::login_attempt::LoginAttemptRecord;
use crate::domain::entities::revocation::RevokedToken;
use crate::errors::DomainError;

/// Durable storage behind the in-memory security cache.
///
/// All operations are asynchronous and may fail independently of the
/// in-memory state; the cache layer treats failures as best-effort and
/// keeps memory authoritative for the running process.
///
/// # Security Considerations
/// - Only token fingerprints are stored, never raw tokens
/// - Revocation entries must outlive the tokens they revoke
#[async_trait]
pub trait SecurityRepository: Send + Sync {
    /// Upsert a revocation entry keyed by fingerprint
    async fn save_revoked_token(&self, entry: &RevokedToken) -> Result<(), DomainError>;

    /// Load all revocation entries that have not expired
    async fn load_active_revocations(&self) -> Result<Vec<RevokedToken>, DomainError>;

    /// Delete revocation entries whose own expiry has passed
    ///
    /// # Returns
    /// * `Ok(usize)` - Number of entries deleted
    async fn delete_expired_revocations(&self, now: DateTime<Utc>) -> Result<usize, DomainError>;

    /// Upsert a token family, including its full member-fingerprint set
    async fn save_family(&self, family: &TokenFamily) -> Result<(), DomainError>;

    /// Delete a token family
    ///
    /// # Returns
    /// * `Ok(true)` - Family existed and was deleted
    /// * `Ok(false)` - Family not found
    async fn delete_family(&self, family_id: &str) -> Result<bool, DomainError>;

    /// Load every stored token family
    async fn load_families(&self) -> Result<Vec<TokenFamily>, DomainError>;

    /// Delete families whose `last_used_at` is older than `cutoff`
    ///
    /// # Returns
    /// * `Ok(usize)` - Number of families deleted
    async fn delete_stale_families(&self, cutoff: DateTime<Utc>) -> Result<usize, DomainError>;

    /// Upsert the failed-login counters for an identity
    async fn save_login_attempts(&self, record: &LoginAttemptRecord) -> Result<(), DomainError>;

    /// Clear the failed-login counters for an identity
    ///
    /// # Returns
    /// * `Ok(true)` - A record existed and was cleared
    /// * `Ok(false)` - No record for this identity
    async fn delete_login_attempts(&self, identity: &str) -> Result<bool, DomainError>;

    /// Load every identity with a non-zero failure count or active lockout
    async fn load_login_attempts(&self) -> Result<Vec<LoginAttemptRecord>, DomainError>;
}
