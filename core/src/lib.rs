//! # ReadNest Security Core
//!
//! Session-token security for the ReadNest backend: token issuance and
//! rotation, refresh-token family tracking with breach detection, a
//! revocation blacklist, account lockout, and a write-through persistent
//! security store. The HTTP layer and the rest of the application consume
//! this crate through the services in [`services`].

pub mod domain;
pub mod errors;
pub mod repositories;
pub mod services;

// Re-export commonly used types for convenience
pub use errors::{AuthError, DomainError, DomainResult, TokenError};
pub use repositories::{IdentityRepository, SecurityRepository};
pub use services::{
    AccountLockoutConfig, AccountLockoutGuard, SecurityCleanupConfig, SecurityCleanupService,
    SecurityStore, TokenBlacklist, TokenFamilyRegistry, TokenService, TokenServiceConfig,
    VerifiedClaims,
};
