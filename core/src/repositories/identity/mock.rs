//! Mock implementation of IdentityRepository for testing

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::entities::identity::Identity;
use crate::errors::DomainError;

use super::r#trait::IdentityRepository;

/// In-memory identity directory for testing
#[derive(Clone)]
pub struct MockIdentityRepository {
    identities: Arc<RwLock<HashMap<Uuid, Identity>>>,
}

impl MockIdentityRepository {
    /// Create a new mock directory
    pub fn new() -> Self {
        Self {
            identities: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Seed an identity
    pub async fn insert(&self, identity: Identity) {
        let mut identities = self.identities.write().await;
        identities.insert(identity.id, identity);
    }
}

impl Default for MockIdentityRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IdentityRepository for MockIdentityRepository {
    async fn find_identity(&self, user_id: Uuid) -> Result<Option<Identity>, DomainError> {
        let identities = self.identities.read().await;
        Ok(identities.get(&user_id).cloned())
    }

    async fn bump_token_version(&self, user_id: Uuid) -> Result<u32, DomainError> {
        let mut identities = self.identities.write().await;
        let identity = identities
            .get_mut(&user_id)
            .ok_or_else(|| DomainError::Internal {
                message: format!("Unknown user: {}", user_id),
            })?;
        identity.token_version += 1;
        Ok(identity.token_version)
    }
}
