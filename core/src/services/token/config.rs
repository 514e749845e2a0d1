//! Configuration for the token service

use jsonwebtoken::Algorithm;

use rn_shared::config::{JwtConfig, SecurityConfig};

use crate::domain::entities::token::{ACCESS_TOKEN_EXPIRY_MINUTES, REFRESH_TOKEN_EXPIRY_DAYS};

/// Configuration for the token service
#[derive(Debug, Clone)]
pub struct TokenServiceConfig {
    /// JWT signing secret
    pub jwt_secret: String,
    /// JWT signing algorithm
    pub algorithm: Algorithm,
    /// Access token expiry in minutes
    pub access_token_expiry_minutes: i64,
    /// Refresh token expiry in days
    pub refresh_token_expiry_days: i64,
    /// Accept audience-less tokens via issuer-only verification
    pub allow_legacy_audience: bool,
    /// Accept refresh tokens whose family is unknown by starting a fresh one
    pub allow_family_bootstrap: bool,
    /// Seconds a refresh call waits on the per-identity guard
    pub refresh_guard_timeout_seconds: u64,
}

impl Default for TokenServiceConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "development-secret-please-change-in-production".to_string(),
            algorithm: Algorithm::HS256,
            access_token_expiry_minutes: ACCESS_TOKEN_EXPIRY_MINUTES,
            refresh_token_expiry_days: REFRESH_TOKEN_EXPIRY_DAYS,
            allow_legacy_audience: true,
            allow_family_bootstrap: true,
            refresh_guard_timeout_seconds: 10,
        }
    }
}

impl TokenServiceConfig {
    /// Builds the service configuration from the shared settings
    pub fn from_settings(jwt: &JwtConfig, security: &SecurityConfig) -> Self {
        Self {
            jwt_secret: jwt.secret.clone(),
            algorithm: jwt.algorithm.parse().unwrap_or(Algorithm::HS256),
            access_token_expiry_minutes: jwt.access_token_expiry / 60,
            refresh_token_expiry_days: jwt.refresh_token_expiry / 86400,
            allow_legacy_audience: security.allow_legacy_audience,
            allow_family_bootstrap: security.allow_family_bootstrap,
            refresh_guard_timeout_seconds: security.refresh_guard_timeout_seconds,
        }
    }
}
