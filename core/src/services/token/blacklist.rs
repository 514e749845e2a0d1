//! Revocation blacklist keyed by token fingerprint.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::domain::entities::revocation::{RevocationReason, RevokedToken};

use super::store::SecurityStore;

/// Computes the one-way fingerprint of a raw token.
///
/// Raw tokens are never stored or compared directly.
pub fn token_fingerprint(raw_token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw_token.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Revocation registry over the security store.
///
/// Additions land in memory immediately and persist in the background;
/// lookups are in-memory only.
#[derive(Clone)]
pub struct TokenBlacklist {
    store: Arc<SecurityStore>,
}

impl TokenBlacklist {
    pub fn new(store: Arc<SecurityStore>) -> Self {
        Self { store }
    }

    /// Revokes a raw token.
    ///
    /// When `expires_at` is omitted the entry gets the default retention,
    /// which outlives every token kind.
    pub fn add(
        &self,
        raw_token: &str,
        expires_at: Option<DateTime<Utc>>,
        reason: RevocationReason,
    ) {
        self.add_fingerprint(token_fingerprint(raw_token), expires_at, reason);
    }

    /// Revokes by fingerprint, for cascades where the raw token is not held
    pub fn add_fingerprint(
        &self,
        fingerprint: String,
        expires_at: Option<DateTime<Utc>>,
        reason: RevocationReason,
    ) {
        debug!(%reason, "blacklisting token fingerprint");
        self.store
            .insert_revocation(RevokedToken::new(fingerprint, expires_at, reason));
    }

    /// Checks a raw token against the blacklist. No I/O.
    pub fn contains(&self, raw_token: &str) -> bool {
        self.contains_fingerprint(&token_fingerprint(raw_token))
    }

    /// Checks a fingerprint against the blacklist. No I/O.
    pub fn contains_fingerprint(&self, fingerprint: &str) -> bool {
        self.store.is_revoked(fingerprint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_is_sha256_hex() {
        let fingerprint = token_fingerprint("eyJhbGciOiJIUzI1NiJ9.payload.sig");

        assert_eq!(fingerprint.len(), 64);
        assert!(fingerprint.chars().all(|c| c.is_ascii_hexdigit()));
        assert!(!fingerprint.contains("eyJ"));
    }

    #[test]
    fn test_fingerprint_is_deterministic() {
        assert_eq!(token_fingerprint("token-a"), token_fingerprint("token-a"));
        assert_ne!(token_fingerprint("token-a"), token_fingerprint("token-b"));
    }
}
