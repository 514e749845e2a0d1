//! Unit tests for the account lockout guard

use std::sync::Arc;

use chrono::{Duration, Utc};

use crate::domain::entities::login_attempt::{LoginAttemptRecord, MAX_FAILED_ATTEMPTS};
use crate::errors::{AuthError, DomainError};
use crate::repositories::MockSecurityRepository;
use crate::services::auth::{AccountLockoutConfig, AccountLockoutGuard};
use crate::services::token::SecurityStore;

const IDENTITY: &str = "reader@example.com";

fn create_guard() -> (AccountLockoutGuard, Arc<SecurityStore>) {
    let store = Arc::new(SecurityStore::new(Arc::new(MockSecurityRepository::new())));
    let guard = AccountLockoutGuard::with_defaults(Arc::clone(&store));
    (guard, store)
}

#[tokio::test]
async fn test_lock_engages_after_threshold_failures() {
    let (guard, _store) = create_guard();

    for attempt in 1..MAX_FAILED_ATTEMPTS {
        assert_eq!(guard.record_failure(IDENTITY), attempt);
        assert!(!guard.is_locked(IDENTITY));
    }

    assert_eq!(guard.record_failure(IDENTITY), MAX_FAILED_ATTEMPTS);
    assert!(guard.is_locked(IDENTITY));

    // The sixth attempt is rejected even before credentials are checked
    let result = guard.ensure_not_locked(IDENTITY);
    match result {
        Err(DomainError::Auth(AuthError::AccountLocked { seconds_remaining })) => {
            assert!(seconds_remaining > 0);
        }
        other => panic!("expected AccountLocked, got {:?}", other.err()),
    }
}

#[tokio::test]
async fn test_successful_login_resets_counter() {
    let (guard, _store) = create_guard();

    guard.record_failure(IDENTITY);
    guard.record_failure(IDENTITY);
    assert_eq!(guard.failed_attempts(IDENTITY), 2);

    guard.clear_failures(IDENTITY);

    assert_eq!(guard.failed_attempts(IDENTITY), 0);
    assert!(!guard.is_locked(IDENTITY));
    assert!(guard.ensure_not_locked(IDENTITY).is_ok());
}

#[tokio::test]
async fn test_lapsed_lockout_auto_clears() {
    let (guard, store) = create_guard();

    let mut record = LoginAttemptRecord::new(IDENTITY.to_string());
    record.failure_count = MAX_FAILED_ATTEMPTS;
    record.locked_until = Some(Utc::now() - Duration::seconds(1));
    store.put_login_attempts(record);

    // The elapsed window counts as a full reset
    assert!(!guard.is_locked(IDENTITY));
    assert!(store.login_attempts(IDENTITY).is_none());
    assert_eq!(guard.failed_attempts(IDENTITY), 0);
}

#[tokio::test]
async fn test_unknown_identity_is_not_locked() {
    let (guard, _store) = create_guard();

    assert!(!guard.is_locked("nobody@example.com"));
    assert_eq!(guard.failed_attempts("nobody@example.com"), 0);
    assert!(guard.ensure_not_locked("nobody@example.com").is_ok());
}

#[tokio::test]
async fn test_custom_threshold() {
    let store = Arc::new(SecurityStore::new(Arc::new(MockSecurityRepository::new())));
    let guard = AccountLockoutGuard::new(
        Arc::clone(&store),
        AccountLockoutConfig {
            max_failed_attempts: 2,
            lockout_duration_minutes: 15,
        },
    );

    guard.record_failure(IDENTITY);
    assert!(!guard.is_locked(IDENTITY));
    guard.record_failure(IDENTITY);
    assert!(guard.is_locked(IDENTITY));
}

#[tokio::test]
async fn test_lockout_survives_restart() {
    let repository = MockSecurityRepository::new();

    {
        let store = Arc::new(SecurityStore::new(Arc::new(repository.clone())));
        let guard = AccountLockoutGuard::with_defaults(store);
        for _ in 0..MAX_FAILED_ATTEMPTS {
            guard.record_failure(IDENTITY);
        }
        for _ in 0..16 {
            tokio::task::yield_now().await;
        }
    }

    let store = Arc::new(SecurityStore::new(Arc::new(repository)));
    store.initialize().await;
    let guard = AccountLockoutGuard::with_defaults(store);

    assert!(guard.is_locked(IDENTITY));
}
