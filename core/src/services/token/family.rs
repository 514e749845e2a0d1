//! Refresh-token family registry.

use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use crate::domain::entities::family::TokenFamily;

use super::store::SecurityStore;

/// Tracks the lineage of refresh tokens issued from each login.
///
/// Thin domain facade over the security store's family collection; the
/// breach decision itself lives in the token service.
#[derive(Clone)]
pub struct TokenFamilyRegistry {
    store: Arc<SecurityStore>,
}

impl TokenFamilyRegistry {
    pub fn new(store: Arc<SecurityStore>) -> Self {
        Self { store }
    }

    /// Registers a fingerprint in a family, creating the family on first use
    pub fn store(&self, family_id: &str, user_id: Uuid, fingerprint: String) {
        debug!(family_id, "registering refresh token in family");
        self.store
            .store_family_fingerprint(family_id, user_id, fingerprint);
    }

    /// Whether the family currently contains the fingerprint
    pub fn has(&self, family_id: &str, fingerprint: &str) -> bool {
        self.store
            .family_contains(family_id, fingerprint)
            .unwrap_or(false)
    }

    /// Whether the family exists at all.
    ///
    /// An unknown family is not a breach signal; it marks a token from
    /// before family tracking, or one whose family was already purged.
    pub fn is_known(&self, family_id: &str) -> bool {
        self.store.family_known(family_id)
    }

    /// Removes a consumed fingerprint from its family
    pub fn remove(&self, family_id: &str, fingerprint: &str) -> bool {
        self.store.remove_family_fingerprint(family_id, fingerprint)
    }

    /// Destroys a family, returning it if it existed
    pub fn destroy(&self, family_id: &str) -> Option<TokenFamily> {
        debug!(family_id, "destroying token family");
        self.store.destroy_family(family_id)
    }

    /// Every fingerprint currently active in the family
    pub fn fingerprints_of(&self, family_id: &str) -> Vec<String> {
        self.store.family_fingerprints(family_id)
    }

    /// Ids of all families belonging to a user, for "logout everywhere"
    pub fn families_for_user(&self, user_id: Uuid) -> Vec<String> {
        self.store.families_for_user(user_id)
    }
}
