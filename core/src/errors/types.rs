//! Domain-specific error types for token and authentication operations
//!
//! This module provides error type definitions for token verification,
//! rotation, and account lockout. HTTP status mapping happens in the
//! presentation layer.

use thiserror::Error;

/// Authentication-related errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Account locked, retry in {seconds_remaining} seconds")]
    AccountLocked { seconds_remaining: i64 },

    #[error("A refresh for this identity is already in progress")]
    RefreshInProgress,
}

/// Token-related errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token format")]
    InvalidTokenFormat,

    #[error("Invalid signature")]
    InvalidSignature,

    #[error("Token revoked")]
    TokenRevoked,

    #[error("Expected {expected} token, got {actual}")]
    TokenTypeMismatch { expected: String, actual: String },

    #[error("Refresh token replayed outside its family")]
    FamilyBreach,

    #[error("Invalid refresh token")]
    InvalidRefreshToken,

    #[error("Token generation failed")]
    TokenGenerationFailed,

    #[error("Missing claim: {claim}")]
    MissingClaim { claim: String },
}
