//! Mock implementation of SecurityRepository for testing

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::entities::family::TokenFamily;
use crate::domain::entities::login_attempt::LoginAttemptRecord;
use crate::domain::entities::revocation::RevokedToken;
use crate::errors::DomainError;

use super::r#trait::SecurityRepository;

/// In-memory security repository for testing.
///
/// Cloning shares the underlying storage, which lets tests simulate a
/// process restart by building a fresh store over the same repository.
#[derive(Clone)]
pub struct MockSecurityRepository {
    revocations: Arc<RwLock<HashMap<String, RevokedToken>>>,
    families: Arc<RwLock<HashMap<String, TokenFamily>>>,
    attempts: Arc<RwLock<HashMap<String, LoginAttemptRecord>>>,
}

impl MockSecurityRepository {
    /// Create a new mock repository
    pub fn new() -> Self {
        Self {
            revocations: Arc::new(RwLock::new(HashMap::new())),
            families: Arc::new(RwLock::new(HashMap::new())),
            attempts: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Number of stored revocation entries, expired ones included
    pub async fn revocation_count(&self) -> usize {
        self.revocations.read().await.len()
    }

    /// Number of stored families
    pub async fn family_count(&self) -> usize {
        self.families.read().await.len()
    }
}

impl Default for MockSecurityRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SecurityRepository for MockSecurityRepository {
    async fn save_revoked_token(&self, entry: &RevokedToken) -> Result<(), DomainError> {
        let mut revocations = self.revocations.write().await;
        revocations.insert(entry.fingerprint.clone(), entry.clone());
        Ok(())
    }

    async fn load_active_revocations(&self) -> Result<Vec<RevokedToken>, DomainError> {
        let revocations = self.revocations.read().await;
        Ok(revocations
            .values()
            .filter(|entry| !entry.is_expired())
            .cloned()
            .collect())
    }

    async fn delete_expired_revocations(&self, now: DateTime<Utc>) -> Result<usize, DomainError> {
        let mut revocations = self.revocations.write().await;
        let initial_count = revocations.len();
        revocations.retain(|_, entry| entry.expires_at >= now);
        Ok(initial_count - revocations.len())
    }

    async fn save_family(&self, family: &TokenFamily) -> Result<(), DomainError> {
        let mut families = self.families.write().await;
        families.insert(family.family_id.clone(), family.clone());
        Ok(())
    }

    async fn delete_family(&self, family_id: &str) -> Result<bool, DomainError> {
        let mut families = self.families.write().await;
        Ok(families.remove(family_id).is_some())
    }

    async fn load_families(&self) -> Result<Vec<TokenFamily>, DomainError> {
        let families = self.families.read().await;
        Ok(families.values().cloned().collect())
    }

    async fn delete_stale_families(&self, cutoff: DateTime<Utc>) -> Result<usize, DomainError> {
        let mut families = self.families.write().await;
        let initial_count = families.len();
        families.retain(|_, family| family.last_used_at >= cutoff);
        Ok(initial_count - families.len())
    }

    async fn save_login_attempts(&self, record: &LoginAttemptRecord) -> Result<(), DomainError> {
        let mut attempts = self.attempts.write().await;
        attempts.insert(record.identity.clone(), record.clone());
        Ok(())
    }

    async fn delete_login_attempts(&self, identity: &str) -> Result<bool, DomainError> {
        let mut attempts = self.attempts.write().await;
        Ok(attempts.remove(identity).is_some())
    }

    async fn load_login_attempts(&self) -> Result<Vec<LoginAttemptRecord>, DomainError> {
        let attempts = self.attempts.read().await;
        Ok(attempts
            .values()
            .filter(|record| record.failure_count > 0 || record.locked_until.is_some())
            .cloned()
            .collect())
    }
}
