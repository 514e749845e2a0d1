//! Failed-login tracking entity for account lockout.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Failed attempts before an identity is locked out
pub const MAX_FAILED_ATTEMPTS: u32 = 5;

/// How long a lockout lasts (15 minutes)
pub const LOCKOUT_DURATION_MINUTES: i64 = 15;

/// Per-identity failed-authentication counter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginAttemptRecord {
    /// Identity being tracked (user id or login handle)
    pub identity: String,

    /// Consecutive failed attempts since the last reset
    pub failure_count: u32,

    /// Timestamp of the most recent failure
    pub last_attempt_at: DateTime<Utc>,

    /// Set once `failure_count` reaches the threshold
    pub locked_until: Option<DateTime<Utc>>,
}

impl LoginAttemptRecord {
    /// Creates an empty record for an identity
    pub fn new(identity: String) -> Self {
        Self {
            identity,
            failure_count: 0,
            last_attempt_at: Utc::now(),
            locked_until: None,
        }
    }

    /// Registers a failed attempt, locking the identity once the
    /// threshold is reached.
    ///
    /// Returns the updated failure count.
    pub fn register_failure(&mut self, max_attempts: u32, lockout: Duration) -> u32 {
        self.failure_count += 1;
        self.last_attempt_at = Utc::now();
        if self.failure_count >= max_attempts {
            self.locked_until = Some(Utc::now() + lockout);
        }
        self.failure_count
    }

    /// Checks whether the identity is currently locked
    pub fn is_locked(&self) -> bool {
        match self.locked_until {
            Some(until) => Utc::now() < until,
            None => false,
        }
    }

    /// Checks whether a lockout was set and has since lapsed
    pub fn lockout_lapsed(&self) -> bool {
        match self.locked_until {
            Some(until) => Utc::now() >= until,
            None => false,
        }
    }

    /// Seconds until the lockout lifts, if locked
    pub fn remaining_lockout_seconds(&self) -> Option<i64> {
        self.locked_until
            .map(|until| (until - Utc::now()).num_seconds())
            .filter(|seconds| *seconds > 0)
    }

    /// Resets the record after a successful authentication
    pub fn reset(&mut self) {
        self.failure_count = 0;
        self.locked_until = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_engages_at_threshold() {
        let mut record = LoginAttemptRecord::new("reader@example.com".to_string());
        let lockout = Duration::minutes(LOCKOUT_DURATION_MINUTES);

        for _ in 0..MAX_FAILED_ATTEMPTS - 1 {
            record.register_failure(MAX_FAILED_ATTEMPTS, lockout);
        }
        assert!(!record.is_locked());

        record.register_failure(MAX_FAILED_ATTEMPTS, lockout);
        assert!(record.is_locked());
        assert!(record.remaining_lockout_seconds().unwrap() > 0);
    }

    #[test]
    fn test_lapsed_lockout() {
        let mut record = LoginAttemptRecord::new("reader@example.com".to_string());
        record.failure_count = MAX_FAILED_ATTEMPTS;
        record.locked_until = Some(Utc::now() - Duration::seconds(1));

        assert!(!record.is_locked());
        assert!(record.lockout_lapsed());
        assert!(record.remaining_lockout_seconds().is_none());
    }

    #[test]
    fn test_reset_clears_state() {
        let mut record = LoginAttemptRecord::new("reader@example.com".to_string());
        record.register_failure(1, Duration::minutes(15));
        assert!(record.is_locked());

        record.reset();
        assert_eq!(record.failure_count, 0);
        assert!(record.locked_until.is_none());
        assert!(!record.is_locked());
    }
}
