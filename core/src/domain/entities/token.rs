//! Token entities for JWT-based session security.

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Access token expiration time (15 minutes)
pub const ACCESS_TOKEN_EXPIRY_MINUTES: i64 = 15;

/// Refresh token expiration time (7 days)
pub const REFRESH_TOKEN_EXPIRY_DAYS: i64 = 7;

/// JWT issuer
pub const JWT_ISSUER: &str = "readnest";

/// JWT audience
pub const JWT_AUDIENCE: &str = "readnest-api";

/// Discriminates access tokens from refresh tokens inside the claim set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    /// Short-lived credential authorizing individual API calls
    Access,
    /// Longer-lived credential used solely to obtain a new token pair
    Refresh,
}

impl TokenType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenType::Access => "access",
            TokenType::Refresh => "refresh",
        }
    }
}

impl std::fmt::Display for TokenType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Claims structure for the JWT payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,

    /// Email of the subject
    pub email: String,

    /// Whether this is an access or a refresh token
    pub token_type: TokenType,

    /// Issuer
    pub iss: String,

    /// Audience. Absent on tokens issued before audience checking existed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,

    /// Issued at timestamp
    pub iat: i64,

    /// Expiration timestamp
    pub exp: i64,

    /// JWT ID (unique identifier for the token)
    pub jti: String,

    /// Server-side token version at issue time (refresh tokens only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_version: Option<u32>,

    /// Refresh-token family this token belongs to (refresh tokens only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub family_id: Option<String>,
}

impl Claims {
    /// Creates new claims for an access token
    pub fn new_access_token(user_id: Uuid, email: String, expiry_minutes: i64) -> Self {
        let now = Utc::now();
        let expiry = now + Duration::minutes(expiry_minutes);

        Self {
            sub: user_id.to_string(),
            email,
            token_type: TokenType::Access,
            iss: JWT_ISSUER.to_string(),
            aud: Some(JWT_AUDIENCE.to_string()),
            iat: now.timestamp(),
            exp: expiry.timestamp(),
            jti: Uuid::new_v4().to_string(),
            token_version: None,
            family_id: None,
        }
    }

    /// Creates new claims for a refresh token bound to a token family
    pub fn new_refresh_token(
        user_id: Uuid,
        email: String,
        token_version: u32,
        family_id: String,
        expiry_days: i64,
    ) -> Self {
        let now = Utc::now();
        let expiry = now + Duration::days(expiry_days);

        Self {
            sub: user_id.to_string(),
            email,
            token_type: TokenType::Refresh,
            iss: JWT_ISSUER.to_string(),
            aud: Some(JWT_AUDIENCE.to_string()),
            iat: now.timestamp(),
            exp: expiry.timestamp(),
            jti: Uuid::new_v4().to_string(),
            token_version: Some(token_version),
            family_id: Some(family_id),
        }
    }

    /// Checks if the claims have expired
    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() >= self.exp
    }

    /// Gets the user ID from the claims
    pub fn user_id(&self) -> Result<Uuid, uuid::Error> {
        Uuid::parse_str(&self.sub)
    }
}

/// Token pair returned to the client on login and refresh
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    /// JWT access token
    pub access_token: String,

    /// JWT refresh token
    pub refresh_token: String,

    /// Family the refresh token belongs to
    pub family_id: String,

    /// Access token expiry time in seconds
    pub access_expires_in: i64,

    /// Refresh token expiry time in seconds
    pub refresh_expires_in: i64,
}

impl TokenPair {
    /// Creates a new token pair
    pub fn new(
        access_token: String,
        refresh_token: String,
        family_id: String,
        access_expiry_minutes: i64,
        refresh_expiry_days: i64,
    ) -> Self {
        Self {
            access_token,
            refresh_token,
            family_id,
            access_expires_in: access_expiry_minutes * 60,
            refresh_expires_in: refresh_expiry_days * 24 * 60 * 60,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_access_token_claims() {
        let user_id = Uuid::new_v4();
        let claims = Claims::new_access_token(
            user_id,
            "reader@example.com".to_string(),
            ACCESS_TOKEN_EXPIRY_MINUTES,
        );

        assert_eq!(claims.sub, user_id.to_string());
        assert_eq!(claims.iss, JWT_ISSUER);
        assert_eq!(claims.aud.as_deref(), Some(JWT_AUDIENCE));
        assert_eq!(claims.token_type, TokenType::Access);
        assert!(claims.token_version.is_none());
        assert!(claims.family_id.is_none());
        assert!(!claims.is_expired());
    }

    #[test]
    fn test_refresh_token_claims() {
        let user_id = Uuid::new_v4();
        let family_id = Uuid::new_v4().to_string();
        let claims = Claims::new_refresh_token(
            user_id,
            "reader@example.com".to_string(),
            3,
            family_id.clone(),
            REFRESH_TOKEN_EXPIRY_DAYS,
        );

        assert_eq!(claims.token_type, TokenType::Refresh);
        assert_eq!(claims.token_version, Some(3));
        assert_eq!(claims.family_id, Some(family_id));
        assert!(!claims.is_expired());
    }

    #[test]
    fn test_claims_user_id_parsing() {
        let user_id = Uuid::new_v4();
        let claims =
            Claims::new_access_token(user_id, "reader@example.com".to_string(), 15);

        assert_eq!(claims.user_id().unwrap(), user_id);
    }

    #[test]
    fn test_claims_expiration() {
        let user_id = Uuid::new_v4();
        let mut claims =
            Claims::new_access_token(user_id, "reader@example.com".to_string(), 15);

        claims.exp = Utc::now().timestamp() - 1;

        assert!(claims.is_expired());
    }

    #[test]
    fn test_audience_is_omitted_when_absent() {
        let user_id = Uuid::new_v4();
        let mut claims =
            Claims::new_access_token(user_id, "reader@example.com".to_string(), 15);
        claims.aud = None;

        let json = serde_json::to_string(&claims).unwrap();
        assert!(!json.contains("\"aud\""));

        let deserialized: Claims = serde_json::from_str(&json).unwrap();
        assert_eq!(claims, deserialized);
    }

    #[test]
    fn test_token_pair_expiry_seconds() {
        let pair = TokenPair::new(
            "access".to_string(),
            "refresh".to_string(),
            "family".to_string(),
            ACCESS_TOKEN_EXPIRY_MINUTES,
            REFRESH_TOKEN_EXPIRY_DAYS,
        );

        assert_eq!(pair.access_expires_in, 15 * 60);
        assert_eq!(pair.refresh_expires_in, 7 * 24 * 60 * 60);
    }
}
