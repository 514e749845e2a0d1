//! Refresh-token family entity used for replay and breach detection.

use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Token families unused for this many days are purged by the cleanup sweep
pub const FAMILY_RETENTION_DAYS: i64 = 7;

/// The lineage of refresh tokens descending from one login.
///
/// Exactly one member fingerprint is active under normal operation; a
/// verified refresh token whose fingerprint is missing from its family is
/// treated as a replayed (stolen) token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenFamily {
    /// Unique identifier carried in refresh-token claims
    pub family_id: String,

    /// User this lineage belongs to
    pub user_id: Uuid,

    /// Fingerprints of the refresh tokens currently active in this family
    pub fingerprints: HashSet<String>,

    /// Timestamp of the login that created the family
    pub created_at: DateTime<Utc>,

    /// Timestamp of the last rotation against this family
    pub last_used_at: DateTime<Utc>,
}

impl TokenFamily {
    /// Creates a new, empty family for a fresh login
    pub fn new(family_id: String, user_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            family_id,
            user_id,
            fingerprints: HashSet::new(),
            created_at: now,
            last_used_at: now,
        }
    }

    /// Adds a fingerprint to the active set
    pub fn insert_fingerprint(&mut self, fingerprint: String) {
        self.fingerprints.insert(fingerprint);
    }

    /// Removes a fingerprint from the active set
    ///
    /// Returns `true` if the fingerprint was a member.
    pub fn remove_fingerprint(&mut self, fingerprint: &str) -> bool {
        self.fingerprints.remove(fingerprint)
    }

    /// Checks whether a fingerprint is a member of the active set
    pub fn contains(&self, fingerprint: &str) -> bool {
        self.fingerprints.contains(fingerprint)
    }

    /// Records a use of the family
    pub fn touch(&mut self) {
        self.last_used_at = Utc::now();
    }

    /// Checks whether the family is past the retention horizon
    pub fn is_stale(&self, retention_days: i64) -> bool {
        Utc::now() - self.last_used_at > Duration::days(retention_days)
    }
}
