//! Domain entities representing the session-token security objects.

pub mod family;
pub mod identity;
pub mod login_attempt;
pub mod revocation;
pub mod token;

// Re-export commonly used types
pub use family::{TokenFamily, FAMILY_RETENTION_DAYS};
pub use identity::Identity;
pub use login_attempt::{LoginAttemptRecord, LOCKOUT_DURATION_MINUTES, MAX_FAILED_ATTEMPTS};
pub use revocation::{RevocationReason, RevokedToken, REVOCATION_RETENTION_DAYS};
pub use token::{
    Claims, TokenPair, TokenType, ACCESS_TOKEN_EXPIRY_MINUTES, JWT_AUDIENCE, JWT_ISSUER,
    REFRESH_TOKEN_EXPIRY_DAYS,
};
