//! Unit tests for the write-through security store

use std::sync::Arc;

use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::domain::entities::family::{TokenFamily, FAMILY_RETENTION_DAYS};
use crate::domain::entities::identity::Identity;
use crate::domain::entities::login_attempt::LoginAttemptRecord;
use crate::domain::entities::revocation::{RevocationReason, RevokedToken};
use crate::errors::{DomainError, TokenError};
use crate::repositories::{MockIdentityRepository, MockSecurityRepository, SecurityRepository};
use crate::services::auth::AccountLockoutGuard;
use crate::services::token::{SecurityStore, TokenService, TokenServiceConfig};

/// Lets fire-and-forget persistence tasks run to completion
async fn settle() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}

#[tokio::test]
async fn test_write_through_reaches_durable_storage() {
    let repository = MockSecurityRepository::new();
    let store = SecurityStore::new(Arc::new(repository.clone()));

    store.insert_revocation(RevokedToken::new(
        "fp-1".to_string(),
        None,
        RevocationReason::Logout,
    ));

    // Memory is consistent before the durable write lands
    assert!(store.is_revoked("fp-1"));

    settle().await;
    assert_eq!(repository.revocation_count().await, 1);
}

#[tokio::test]
async fn test_reads_do_not_consult_durable_storage() {
    let repository = MockSecurityRepository::new();
    let store = SecurityStore::new(Arc::new(repository.clone()));

    // Written behind the cache's back: invisible until rehydration
    repository
        .save_revoked_token(&RevokedToken::new(
            "fp-external".to_string(),
            None,
            RevocationReason::Manual,
        ))
        .await
        .unwrap();

    assert!(!store.is_revoked("fp-external"));

    store.initialize().await;
    assert!(store.is_revoked("fp-external"));
}

#[tokio::test]
async fn test_restart_reproduces_verify_and_lockout_outcomes() {
    let repository = Arc::new(MockSecurityRepository::new());
    let identities = MockIdentityRepository::new();
    let identity = Identity::new(Uuid::new_v4(), "reader@example.com", 1);
    identities.insert(identity.clone()).await;

    let pair;
    {
        let store = Arc::new(SecurityStore::new(
            Arc::clone(&repository) as Arc<dyn SecurityRepository>
        ));
        let service = TokenService::new(
            TokenServiceConfig::default(),
            Arc::clone(&store),
            Arc::new(identities.clone()),
        );
        let guard = AccountLockoutGuard::with_defaults(Arc::clone(&store));

        pair = service.issue_tokens(&identity, None).unwrap();
        service.blacklist_token(&pair.access_token, None);
        guard.record_failure("reader@example.com");
        guard.record_failure("reader@example.com");
        settle().await;
        // In-memory state dropped here: simulated process exit
    }

    let store = Arc::new(SecurityStore::new(
        Arc::clone(&repository) as Arc<dyn SecurityRepository>
    ));
    store.initialize().await;
    let service = TokenService::new(
        TokenServiceConfig::default(),
        Arc::clone(&store),
        Arc::new(identities.clone()),
    );
    let guard = AccountLockoutGuard::with_defaults(Arc::clone(&store));

    // The blacklisted access token stays revoked across the restart
    let result = service.verify_access(&pair.access_token);
    assert!(matches!(
        result,
        Err(DomainError::Token(TokenError::TokenRevoked))
    ));

    // The refresh token is still a member of its hydrated family
    assert!(service.verify_refresh(&pair.refresh_token).is_ok());
    assert!(store.family_known(&pair.family_id));

    // Failure counters survived too
    assert_eq!(guard.failed_attempts("reader@example.com"), 2);
}

#[tokio::test]
async fn test_hydrated_refresh_token_rotates_without_breach() {
    let repository = Arc::new(MockSecurityRepository::new());
    let identities = MockIdentityRepository::new();
    let identity = Identity::new(Uuid::new_v4(), "reader@example.com", 1);
    identities.insert(identity.clone()).await;

    let store = Arc::new(SecurityStore::new(
        Arc::clone(&repository) as Arc<dyn SecurityRepository>
    ));
    let service = TokenService::new(
        TokenServiceConfig::default(),
        Arc::clone(&store),
        Arc::new(identities.clone()),
    );
    let pair = service.issue_tokens(&identity, None).unwrap();
    settle().await;

    let restarted = Arc::new(SecurityStore::new(
        Arc::clone(&repository) as Arc<dyn SecurityRepository>
    ));
    restarted.initialize().await;
    let service = TokenService::new(
        TokenServiceConfig::default(),
        Arc::clone(&restarted),
        Arc::new(identities),
    );

    let rotated = service.refresh(&pair.refresh_token).await.unwrap();
    assert_eq!(rotated.family_id, pair.family_id);
}

#[tokio::test]
async fn test_cleanup_prunes_expired_revocations() {
    let repository = MockSecurityRepository::new();
    let store = SecurityStore::new(Arc::new(repository.clone()));

    store.insert_revocation(RevokedToken::new(
        "fp-expired".to_string(),
        Some(Utc::now() - Duration::hours(1)),
        RevocationReason::Rotated,
    ));
    store.insert_revocation(RevokedToken::new(
        "fp-live".to_string(),
        None,
        RevocationReason::Logout,
    ));
    settle().await;

    let summary = store.cleanup().await.unwrap();

    assert_eq!(summary.expired_revocations_deleted, 1);
    assert!(!store.is_revoked("fp-expired"));
    assert!(store.is_revoked("fp-live"));
    assert_eq!(repository.revocation_count().await, 1);
}

#[tokio::test]
async fn test_cleanup_purges_stale_families() {
    let repository = MockSecurityRepository::new();
    let user_id = Uuid::new_v4();

    let mut stale = TokenFamily::new("stale-family".to_string(), user_id);
    stale.insert_fingerprint("fp-old".to_string());
    stale.last_used_at = Utc::now() - Duration::days(FAMILY_RETENTION_DAYS + 1);
    repository.save_family(&stale).await.unwrap();

    let store = SecurityStore::new(Arc::new(repository.clone()));
    store.initialize().await;
    store.store_family_fingerprint("fresh-family", user_id, "fp-new".to_string());
    assert!(store.family_known("stale-family"));

    let summary = store.cleanup().await.unwrap();

    assert_eq!(summary.stale_families_deleted, 1);
    assert!(!store.family_known("stale-family"));
    assert!(store.family_known("fresh-family"));
    settle().await;
    assert_eq!(repository.family_count().await, 1);
}

#[tokio::test]
async fn test_cleanup_drops_lapsed_lockouts() {
    let repository = MockSecurityRepository::new();
    let store = SecurityStore::new(Arc::new(repository.clone()));

    let mut lapsed = LoginAttemptRecord::new("lapsed@example.com".to_string());
    lapsed.failure_count = 5;
    lapsed.locked_until = Some(Utc::now() - Duration::minutes(1));
    store.put_login_attempts(lapsed);

    let mut active = LoginAttemptRecord::new("active@example.com".to_string());
    active.failure_count = 2;
    store.put_login_attempts(active);
    settle().await;

    let summary = store.cleanup().await.unwrap();

    assert_eq!(summary.lapsed_lockouts_deleted, 1);
    assert!(store.login_attempts("lapsed@example.com").is_none());
    assert!(store.login_attempts("active@example.com").is_some());
}

#[tokio::test]
async fn test_shutdown_without_cleanup_task_is_a_noop() {
    let store = SecurityStore::new(Arc::new(MockSecurityRepository::new()));
    store.shutdown();
}
