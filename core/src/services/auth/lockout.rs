//! Account lockout guard for brute force protection
//!
//! Tracks failed authentication attempts per identity and enforces a
//! temporary lockout once the threshold is reached. A lockout that has
//! lapsed is treated as a full reset the next time the identity is
//! checked.

use std::sync::Arc;

use chrono::Duration;
use tracing::{info, warn};

use rn_shared::config::SecurityConfig;

use crate::domain::entities::login_attempt::{
    LoginAttemptRecord, LOCKOUT_DURATION_MINUTES, MAX_FAILED_ATTEMPTS,
};
use crate::errors::{AuthError, DomainResult};
use crate::services::token::SecurityStore;

/// Configuration for the account lockout guard
#[derive(Debug, Clone)]
pub struct AccountLockoutConfig {
    /// Maximum failed attempts before locking
    pub max_failed_attempts: u32,
    /// Duration in minutes for which an identity remains locked
    pub lockout_duration_minutes: i64,
}

impl Default for AccountLockoutConfig {
    fn default() -> Self {
        Self {
            max_failed_attempts: MAX_FAILED_ATTEMPTS,
            lockout_duration_minutes: LOCKOUT_DURATION_MINUTES,
        }
    }
}

impl AccountLockoutConfig {
    /// Builds the guard configuration from the shared settings
    pub fn from_settings(security: &SecurityConfig) -> Self {
        Self {
            max_failed_attempts: security.max_failed_attempts,
            lockout_duration_minutes: security.lockout_duration_minutes,
        }
    }
}

/// Guard tracking failed logins per identity
pub struct AccountLockoutGuard {
    store: Arc<SecurityStore>,
    config: AccountLockoutConfig,
}

impl AccountLockoutGuard {
    /// Create a new lockout guard
    pub fn new(store: Arc<SecurityStore>, config: AccountLockoutConfig) -> Self {
        Self { store, config }
    }

    /// Create a new lockout guard with default configuration
    pub fn with_defaults(store: Arc<SecurityStore>) -> Self {
        Self::new(store, AccountLockoutConfig::default())
    }

    /// Records a failed authentication attempt.
    ///
    /// Locks the identity once the failure count reaches the threshold.
    ///
    /// # Returns
    /// The failure count after this attempt.
    pub fn record_failure(&self, identity: &str) -> u32 {
        let mut record = self
            .store
            .login_attempts(identity)
            .unwrap_or_else(|| LoginAttemptRecord::new(identity.to_string()));

        let attempts = record.register_failure(
            self.config.max_failed_attempts,
            Duration::minutes(self.config.lockout_duration_minutes),
        );

        if record.is_locked() {
            warn!(
                identity,
                attempts,
                lockout_minutes = self.config.lockout_duration_minutes,
                "identity locked after repeated authentication failures"
            );
        } else {
            warn!(
                identity,
                attempts,
                max_attempts = self.config.max_failed_attempts,
                "failed authentication attempt recorded"
            );
        }

        self.store.put_login_attempts(record);
        attempts
    }

    /// Checks whether an identity is currently locked out.
    ///
    /// A lockout whose window has elapsed auto-clears the record and
    /// reports unlocked.
    pub fn is_locked(&self, identity: &str) -> bool {
        match self.store.login_attempts(identity) {
            Some(record) if record.is_locked() => true,
            Some(record) if record.lockout_lapsed() => {
                self.store.clear_login_attempts(identity);
                info!(identity, "lockout window elapsed, record cleared");
                false
            }
            _ => false,
        }
    }

    /// Fails with `AccountLocked` if the identity is locked out
    pub fn ensure_not_locked(&self, identity: &str) -> DomainResult<()> {
        if let Some(record) = self.store.login_attempts(identity) {
            if record.is_locked() {
                return Err(AuthError::AccountLocked {
                    seconds_remaining: record.remaining_lockout_seconds().unwrap_or(0),
                }
                .into());
            }
            if record.lockout_lapsed() {
                self.store.clear_login_attempts(identity);
                info!(identity, "lockout window elapsed, record cleared");
            }
        }
        Ok(())
    }

    /// Resets the failure counter after a successful authentication
    pub fn clear_failures(&self, identity: &str) {
        if self.store.clear_login_attempts(identity) {
            info!(identity, "failure counter reset after successful authentication");
        }
    }

    /// Current failure count for an identity
    pub fn failed_attempts(&self, identity: &str) -> u32 {
        self.store
            .login_attempts(identity)
            .filter(|record| !record.lockout_lapsed())
            .map(|record| record.failure_count)
            .unwrap_or(0)
    }
}
