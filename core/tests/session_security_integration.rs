//! Integration tests for the session-token security core
//!
//! Exercises the full login/refresh/breach/lockout lifecycle through the
//! public crate API, the way the HTTP layer consumes it.

use std::sync::Arc;

use uuid::Uuid;

use rn_core::domain::entities::identity::Identity;
use rn_core::errors::{DomainError, TokenError};
use rn_core::repositories::{
    IdentityRepository, MockIdentityRepository, MockSecurityRepository, SecurityRepository,
};
use rn_core::services::auth::AccountLockoutGuard;
use rn_core::services::token::{
    SecurityCleanupConfig, SecurityCleanupService, SecurityStore, TokenService,
    TokenServiceConfig,
};

async fn settle() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}

struct App {
    store: Arc<SecurityStore>,
    service: TokenService,
    lockout: AccountLockoutGuard,
    identities: MockIdentityRepository,
}

async fn boot(repository: Arc<MockSecurityRepository>, identities: MockIdentityRepository) -> App {
    let store = Arc::new(SecurityStore::new(
        Arc::clone(&repository) as Arc<dyn SecurityRepository>
    ));
    store.initialize().await;

    let service = TokenService::new(
        TokenServiceConfig::default(),
        Arc::clone(&store),
        Arc::new(identities.clone()),
    );
    let lockout = AccountLockoutGuard::with_defaults(Arc::clone(&store));

    App {
        store,
        service,
        lockout,
        identities,
    }
}

#[tokio::test]
async fn test_full_session_lifecycle() {
    let repository = Arc::new(MockSecurityRepository::new());
    let identities = MockIdentityRepository::new();
    let reader = Identity::new(Uuid::new_v4(), "reader@example.com", 1);
    identities.insert(reader.clone()).await;

    let app = boot(Arc::clone(&repository), identities.clone()).await;

    // Login
    let session = app.service.issue_tokens(&reader, None).unwrap();
    assert!(app.service.verify_access(&session.access_token).is_ok());

    // A few rotations along the same lineage
    let mut current = session.clone();
    for _ in 0..3 {
        let next = app.service.refresh(&current.refresh_token).await.unwrap();
        assert_eq!(next.family_id, session.family_id);
        current = next;
    }

    // The stolen original resurfaces: breach, family gone, everything dies
    let replay = app.service.refresh(&session.refresh_token).await;
    assert!(matches!(
        replay,
        Err(DomainError::Token(TokenError::FamilyBreach))
    ));
    assert!(matches!(
        app.service.verify_refresh(&current.refresh_token),
        Err(DomainError::Token(TokenError::TokenRevoked))
    ));

    let bumped = app
        .identities
        .find_identity(reader.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(bumped.token_version, reader.token_version + 1);

    app.store.shutdown();
}

#[tokio::test]
async fn test_state_survives_process_restart() {
    let repository = Arc::new(MockSecurityRepository::new());
    let identities = MockIdentityRepository::new();
    let reader = Identity::new(Uuid::new_v4(), "reader@example.com", 1);
    identities.insert(reader.clone()).await;

    let session;
    {
        let app = boot(Arc::clone(&repository), identities.clone()).await;
        session = app.service.issue_tokens(&reader, None).unwrap();
        app.service.logout(&session.access_token);
        app.lockout.record_failure(&reader.email);
        app.lockout.record_failure(&reader.email);
        settle().await;
        app.store.shutdown();
    }

    let app = boot(repository, identities).await;

    // Same verdicts as before the restart
    assert!(matches!(
        app.service.verify_access(&session.access_token),
        Err(DomainError::Token(TokenError::TokenRevoked))
    ));
    assert!(app.service.verify_refresh(&session.refresh_token).is_ok());
    assert_eq!(app.lockout.failed_attempts(&reader.email), 2);

    // And the hydrated family still rotates cleanly
    let rotated = app.service.refresh(&session.refresh_token).await.unwrap();
    assert_eq!(rotated.family_id, session.family_id);
}

#[tokio::test]
async fn test_lockout_blocks_sixth_attempt() {
    let repository = Arc::new(MockSecurityRepository::new());
    let app = boot(repository, MockIdentityRepository::new()).await;

    for _ in 0..5 {
        app.lockout.record_failure("reader@example.com");
    }

    assert!(app.lockout.is_locked("reader@example.com"));
    assert!(app.lockout.ensure_not_locked("reader@example.com").is_err());

    // A different identity is unaffected
    assert!(!app.lockout.is_locked("other@example.com"));
}

#[tokio::test]
async fn test_cleanup_service_runs_against_live_store() {
    let repository = Arc::new(MockSecurityRepository::new());
    let app = boot(Arc::clone(&repository), MockIdentityRepository::new()).await;

    let cleanup = SecurityCleanupService::new(
        Arc::clone(&app.store),
        SecurityCleanupConfig::default(),
    );
    let summary = cleanup.run_cleanup().await.unwrap();
    assert_eq!(summary.total_cleaned(), 0);

    let disabled = SecurityCleanupService::new(
        Arc::clone(&app.store),
        SecurityCleanupConfig {
            enabled: false,
            ..Default::default()
        },
    );
    assert_eq!(disabled.run_cleanup().await.unwrap().total_cleaned(), 0);
}
