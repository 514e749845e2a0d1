//! Session security policy configuration
//!
//! Policy knobs for the token security core: account lockout thresholds,
//! revocation retention, token family retention, cleanup cadence, and the
//! two legacy-compatibility switches.

use serde::{Deserialize, Serialize};

/// Security policy for the session-token core
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SecurityConfig {
    /// Failed login attempts before an identity is locked out
    pub max_failed_attempts: u32,

    /// How long a lockout lasts, in minutes
    pub lockout_duration_minutes: i64,

    /// How long revocation entries are retained, in days.
    /// Must exceed the longest token lifetime so an entry outlives
    /// anything it revokes.
    pub revocation_retention_days: i64,

    /// Token families unused for this many days are purged
    pub family_retention_days: i64,

    /// Cleanup sweep interval in seconds
    pub cleanup_interval_seconds: u64,

    /// How long a refresh call waits on the per-identity guard before
    /// surfacing a retry error, in seconds
    pub refresh_guard_timeout_seconds: u64,

    /// Accept refresh tokens whose family is unknown by starting a fresh
    /// family for them (pre-family-tracking tokens)
    #[serde(default = "default_true")]
    pub allow_family_bootstrap: bool,

    /// Accept tokens without an audience claim via issuer-only
    /// verification (pre-audience tokens)
    #[serde(default = "default_true")]
    pub allow_legacy_audience: bool,
}

fn default_true() -> bool {
    true
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_failed_attempts: 5,
            lockout_duration_minutes: 15,
            revocation_retention_days: 14,
            family_retention_days: 7,
            cleanup_interval_seconds: 3600,
            refresh_guard_timeout_seconds: 10,
            allow_family_bootstrap: true,
            allow_legacy_audience: true,
        }
    }
}

impl SecurityConfig {
    /// Disable both legacy-compatibility paths (post-migration posture)
    pub fn strict(mut self) -> Self {
        self.allow_family_bootstrap = false;
        self.allow_legacy_audience = false;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_policy() {
        let config = SecurityConfig::default();
        assert_eq!(config.max_failed_attempts, 5);
        assert_eq!(config.lockout_duration_minutes, 15);
        assert!(config.revocation_retention_days > 7);
        assert!(config.allow_family_bootstrap);
        assert!(config.allow_legacy_audience);
    }

    #[test]
    fn test_strict_disables_legacy_paths() {
        let config = SecurityConfig::default().strict();
        assert!(!config.allow_family_bootstrap);
        assert!(!config.allow_legacy_audience);
    }
}
