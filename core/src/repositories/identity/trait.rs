//! User-identity lookup consumed by the token core.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::entities::identity::Identity;
use crate::errors::DomainError;

/// Read access to the user record plus the token-version counter.
///
/// The user service owns the record; the token core reads it when issuing
/// and refreshing, and bumps the version to force a global logout.
#[async_trait]
pub trait IdentityRepository: Send + Sync {
    /// Fetch the identity projection for a user
    ///
    /// # Returns
    /// * `Ok(Some(Identity))` - User found
    /// * `Ok(None)` - No such user
    async fn find_identity(&self, user_id: Uuid) -> Result<Option<Identity>, DomainError>;

    /// Atomically increment the user's token version
    ///
    /// Every access token issued under an older version stops verifying at
    /// the authorization layer.
    ///
    /// # Returns
    /// * `Ok(u32)` - The new token version
    async fn bump_token_version(&self, user_id: Uuid) -> Result<u32, DomainError>;
}
