//! Business services containing the session-token security logic.

pub mod auth;
pub mod token;

// Re-export commonly used types
pub use auth::{AccountLockoutConfig, AccountLockoutGuard};
pub use token::{
    token_fingerprint, CleanupSummary, SecurityCleanupConfig, SecurityCleanupService,
    SecurityStore, TokenBlacklist, TokenFamilyRegistry, TokenService, TokenServiceConfig,
    VerifiedClaims,
};
