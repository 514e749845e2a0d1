//! Revocation blacklist entry.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Default retention for revocation entries (14 days).
///
/// Longer than any token lifetime so an entry always outlives the token it
/// revokes.
pub const REVOCATION_RETENTION_DAYS: i64 = 14;

/// Why a token was revoked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevocationReason {
    /// Consumed during a normal refresh rotation
    Rotated,
    /// Explicit logout
    Logout,
    /// Invalidated as part of a family-breach cascade
    FamilyBreach,
    /// Administrative revocation
    Manual,
}

impl RevocationReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RevocationReason::Rotated => "rotated",
            RevocationReason::Logout => "logout",
            RevocationReason::FamilyBreach => "family_breach",
            RevocationReason::Manual => "manual",
        }
    }

    /// Parses a stored reason, defaulting to `Manual` for unknown values
    pub fn parse(value: &str) -> Self {
        match value {
            "rotated" => RevocationReason::Rotated,
            "logout" => RevocationReason::Logout,
            "family_breach" => RevocationReason::FamilyBreach,
            _ => RevocationReason::Manual,
        }
    }
}

impl std::fmt::Display for RevocationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A blacklisted token, keyed by fingerprint.
///
/// Only the one-way hash of the raw token is ever stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevokedToken {
    /// SHA-256 fingerprint of the raw token
    pub fingerprint: String,

    /// When this entry can be garbage-collected
    pub expires_at: DateTime<Utc>,

    /// Why the token was revoked
    pub reason: RevocationReason,

    /// When the entry was created
    pub created_at: DateTime<Utc>,
}

impl RevokedToken {
    /// Creates a revocation entry.
    ///
    /// When `expires_at` is `None` the default retention is applied, which
    /// is guaranteed to exceed the lifetime of any token kind.
    pub fn new(
        fingerprint: String,
        expires_at: Option<DateTime<Utc>>,
        reason: RevocationReason,
    ) -> Self {
        let now = Utc::now();
        Self {
            fingerprint,
            expires_at: expires_at
                .unwrap_or_else(|| now + Duration::days(REVOCATION_RETENTION_DAYS)),
            reason,
            created_at: now,
        }
    }

    /// Checks if the entry itself has expired
    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }
}
