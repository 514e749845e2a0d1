//! Main token service implementation

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation,
};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::domain::entities::identity::Identity;
use crate::domain::entities::revocation::RevocationReason;
use crate::domain::entities::token::{Claims, TokenPair, TokenType, JWT_AUDIENCE, JWT_ISSUER};
use crate::errors::{DomainError, DomainResult, TokenError};
use crate::repositories::IdentityRepository;

use super::blacklist::{token_fingerprint, TokenBlacklist};
use super::config::TokenServiceConfig;
use super::family::TokenFamilyRegistry;
use super::refresh_guard::RefreshGuard;
use super::store::SecurityStore;

/// Claims that passed full verification
#[derive(Debug, Clone)]
pub struct VerifiedClaims {
    pub claims: Claims,
    /// True when the token carried no audience claim and was accepted
    /// through the issuer-only fallback; the caller should prompt the
    /// client to refresh.
    pub legacy_audience: bool,
}

/// Service for issuing, verifying and rotating session tokens
pub struct TokenService {
    config: TokenServiceConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    legacy_validation: Validation,
    blacklist: TokenBlacklist,
    families: TokenFamilyRegistry,
    identities: Arc<dyn IdentityRepository>,
    refresh_guard: RefreshGuard,
}

impl TokenService {
    /// Creates a new token service over a hydrated security store
    pub fn new(
        config: TokenServiceConfig,
        store: Arc<SecurityStore>,
        identities: Arc<dyn IdentityRepository>,
    ) -> Self {
        let encoding_key = EncodingKey::from_secret(config.jwt_secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.jwt_secret.as_bytes());

        let mut validation = Validation::new(config.algorithm);
        validation.set_required_spec_claims(&["exp", "iss", "aud"]);
        validation.set_issuer(&[JWT_ISSUER]);
        validation.set_audience(&[JWT_AUDIENCE]);
        validation.validate_exp = true;

        // Tokens issued before audience checking existed carry no aud
        // claim; they are verified against issuer and expiry only.
        let mut legacy_validation = Validation::new(config.algorithm);
        legacy_validation.set_required_spec_claims(&["exp", "iss"]);
        legacy_validation.set_issuer(&[JWT_ISSUER]);
        legacy_validation.validate_exp = true;
        legacy_validation.validate_aud = false;

        let refresh_guard =
            RefreshGuard::new(Duration::from_secs(config.refresh_guard_timeout_seconds));

        Self {
            config,
            encoding_key,
            decoding_key,
            validation,
            legacy_validation,
            blacklist: TokenBlacklist::new(Arc::clone(&store)),
            families: TokenFamilyRegistry::new(store),
            identities,
            refresh_guard,
        }
    }

    /// Issues a fresh access/refresh pair for an authenticated identity.
    ///
    /// When `parent_refresh` is the token being rotated, the new refresh
    /// token stays in the parent's family; otherwise a new family is
    /// minted for this login. The new refresh fingerprint is registered
    /// in the family before the pair is returned.
    pub fn issue_tokens(
        &self,
        identity: &Identity,
        parent_refresh: Option<&str>,
    ) -> DomainResult<TokenPair> {
        let family_id = parent_refresh
            .and_then(|raw| self.peek_family_id(raw))
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let access_claims = Claims::new_access_token(
            identity.id,
            identity.email.clone(),
            self.config.access_token_expiry_minutes,
        );
        let refresh_claims = Claims::new_refresh_token(
            identity.id,
            identity.email.clone(),
            identity.token_version,
            family_id.clone(),
            self.config.refresh_token_expiry_days,
        );

        let access_token = self.encode_jwt(&access_claims)?;
        let refresh_token = self.encode_jwt(&refresh_claims)?;

        self.families
            .store(&family_id, identity.id, token_fingerprint(&refresh_token));

        Ok(TokenPair::new(
            access_token,
            refresh_token,
            family_id,
            self.config.access_token_expiry_minutes,
            self.config.refresh_token_expiry_days,
        ))
    }

    /// Verifies an access token and returns its claims.
    ///
    /// Pure check: signature, issuer, audience, expiry, blacklist and
    /// token type. No write side effects.
    pub fn verify_access(&self, token: &str) -> DomainResult<VerifiedClaims> {
        self.verify_token(token, TokenType::Access)
    }

    /// Verifies a refresh token and returns its claims
    pub fn verify_refresh(&self, token: &str) -> DomainResult<VerifiedClaims> {
        self.verify_token(token, TokenType::Refresh)
    }

    fn verify_token(&self, token: &str, expected: TokenType) -> DomainResult<VerifiedClaims> {
        let verified = self.decode_token(token, expected)?;

        if self.blacklist.contains(token) {
            return Err(DomainError::Token(TokenError::TokenRevoked));
        }

        Ok(verified)
    }

    /// Signature, issuer, audience, expiry and type checks without the
    /// blacklist lookup. The refresh path needs the decoded claims of a
    /// blacklisted token to run breach detection against its family.
    fn decode_token(&self, token: &str, expected: TokenType) -> DomainResult<VerifiedClaims> {
        let (claims, legacy_audience) =
            match decode::<Claims>(token, &self.decoding_key, &self.validation) {
                Ok(data) => (data.claims, false),
                Err(e) if is_missing_audience(&e) && self.config.allow_legacy_audience => {
                    let data =
                        decode::<Claims>(token, &self.decoding_key, &self.legacy_validation)
                            .map_err(|e| DomainError::Token(map_decode_error(e)))?;
                    warn!(
                        sub = %data.claims.sub,
                        "accepted audience-less token via issuer-only verification"
                    );
                    (data.claims, true)
                }
                Err(e) => return Err(DomainError::Token(map_decode_error(e))),
            };

        if claims.token_type != expected {
            return Err(DomainError::Token(TokenError::TokenTypeMismatch {
                expected: expected.to_string(),
                actual: claims.token_type.to_string(),
            }));
        }

        Ok(VerifiedClaims {
            claims,
            legacy_audience,
        })
    }

    /// Rotates a refresh token into a new access/refresh pair.
    ///
    /// Concurrent refreshes for one identity serialize on the keyed
    /// guard; a token consumed while its caller waited fails with
    /// `TokenRevoked` rather than replaying breach detection against the
    /// winner. A verified token missing from its (existing) family is a
    /// replay signal and revokes the whole family.
    pub async fn refresh(&self, raw_refresh: &str) -> DomainResult<TokenPair> {
        // Signature/expiry/type only: a blacklisted token must still reach
        // breach detection below instead of failing here.
        let verified = self.decode_token(raw_refresh, TokenType::Refresh)?;
        let claims = verified.claims;
        let user_id = claims
            .user_id()
            .map_err(|_| DomainError::Token(TokenError::InvalidTokenFormat))?;
        let family_id = claims
            .family_id
            .clone()
            .ok_or(DomainError::Token(TokenError::MissingClaim {
                claim: "family_id".to_string(),
            }))?;

        let permit = self.refresh_guard.acquire(&claims.sub).await?;

        // A contended permit means another refresh for this identity was
        // in flight; if it consumed this token, that rotation wins and
        // this caller retries with the new pair. Without contention the
        // same state is a replay and falls through to the family check.
        if permit.contended() && self.blacklist.contains(raw_refresh) {
            info!(user_id = %user_id, "refresh token already rotated by a concurrent request");
            return Err(DomainError::Token(TokenError::TokenRevoked));
        }

        let identity = self
            .identities
            .find_identity(user_id)
            .await?
            .ok_or(DomainError::Token(TokenError::InvalidRefreshToken))?;

        let fingerprint = token_fingerprint(raw_refresh);
        let rotation_parent = if self.families.is_known(&family_id) {
            if !self.families.has(&family_id, &fingerprint) {
                self.handle_family_breach(&family_id, user_id).await;
                return Err(DomainError::Token(TokenError::FamilyBreach));
            }
            if self.blacklist.contains(raw_refresh) {
                // Administratively revoked while still a family member
                self.families.remove(&family_id, &fingerprint);
                return Err(DomainError::Token(TokenError::TokenRevoked));
            }
            self.families.remove(&family_id, &fingerprint);
            Some(raw_refresh)
        } else if self.blacklist.contains(raw_refresh) {
            // Revoked token whose family is already gone; nothing left to
            // cascade against.
            return Err(DomainError::Token(TokenError::TokenRevoked));
        } else if self.config.allow_family_bootstrap {
            // Pre-family-tracking token, or the family was already purged.
            // Accept this once; the rotation result starts a fresh family.
            warn!(
                family_id,
                user_id = %user_id,
                "refresh token references unknown family, starting a new lineage"
            );
            None
        } else {
            warn!(
                family_id,
                user_id = %user_id,
                "refresh token references unknown family, rejecting"
            );
            return Err(DomainError::Token(TokenError::InvalidRefreshToken));
        };

        // Consuming the old token and registering its replacement is one
        // logical step; both land in memory before this call returns.
        let expires_at = Utc.timestamp_opt(claims.exp, 0).single();
        self.blacklist
            .add(raw_refresh, expires_at, RevocationReason::Rotated);
        self.issue_tokens(&identity, rotation_parent)
    }

    /// Revokes a single session: the token is blacklisted until its
    /// natural expiry and removed from its family.
    pub fn logout(&self, raw_token: &str) {
        let claims = self.peek_claims(raw_token);
        let expires_at = claims
            .as_ref()
            .and_then(|c| Utc.timestamp_opt(c.exp, 0).single());

        self.blacklist
            .add(raw_token, expires_at, RevocationReason::Logout);

        if let Some(claims) = claims {
            if let Some(family_id) = &claims.family_id {
                self.families
                    .remove(family_id, &token_fingerprint(raw_token));
            }
            info!(sub = %claims.sub, "session token revoked on logout");
        }
    }

    /// Revokes every session of a user: all family members are
    /// blacklisted, the families destroyed, and the token version bumped
    /// so outstanding access tokens stop verifying at the authorization
    /// layer.
    ///
    /// # Returns
    /// * `Ok(usize)` - Number of refresh tokens revoked
    pub async fn logout_all_devices(&self, user_id: Uuid) -> DomainResult<usize> {
        let mut revoked = 0;
        for family_id in self.families.families_for_user(user_id) {
            for fingerprint in self.families.fingerprints_of(&family_id) {
                self.blacklist
                    .add_fingerprint(fingerprint, None, RevocationReason::Logout);
                revoked += 1;
            }
            self.families.destroy(&family_id);
        }

        self.identities.bump_token_version(user_id).await?;
        info!(user_id = %user_id, revoked, "logged out all devices");
        Ok(revoked)
    }

    /// Administratively blacklists a token
    pub fn blacklist_token(&self, raw_token: &str, expires_at: Option<DateTime<Utc>>) {
        self.blacklist
            .add(raw_token, expires_at, RevocationReason::Manual);
    }

    /// Reads the family id out of a refresh token without verifying it.
    ///
    /// Bookkeeping only; never an input to an authorization decision.
    pub fn peek_family_id(&self, raw_token: &str) -> Option<String> {
        self.peek_claims(raw_token).and_then(|claims| claims.family_id)
    }

    /// Decodes claims without checking the signature.
    ///
    /// Usable only for metadata lookups (family id, expiry for
    /// blacklisting); every access decision goes through
    /// [`verify_access`](Self::verify_access) /
    /// [`verify_refresh`](Self::verify_refresh).
    fn peek_claims(&self, raw_token: &str) -> Option<Claims> {
        let mut validation = Validation::new(self.config.algorithm);
        validation.insecure_disable_signature_validation();
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.set_required_spec_claims::<&str>(&[]);

        decode::<Claims>(raw_token, &DecodingKey::from_secret(&[]), &validation)
            .map(|data| data.claims)
            .ok()
    }

    async fn handle_family_breach(&self, family_id: &str, user_id: Uuid) {
        warn!(
            family_id,
            user_id = %user_id,
            "refresh token replayed outside its family, revoking entire family"
        );

        for fingerprint in self.families.fingerprints_of(family_id) {
            self.blacklist
                .add_fingerprint(fingerprint, None, RevocationReason::FamilyBreach);
        }
        self.families.destroy(family_id);

        if let Err(err) = self.identities.bump_token_version(user_id).await {
            // The family is already revoked; only the global access-token
            // invalidation is delayed until the next successful bump.
            error!(%err, user_id = %user_id, "failed to bump token version after family breach");
        }
    }

    /// Encodes claims into a JWT
    fn encode_jwt(&self, claims: &Claims) -> DomainResult<String> {
        let header = Header::new(self.config.algorithm);
        encode(&header, claims, &self.encoding_key)
            .map_err(|_| DomainError::Token(TokenError::TokenGenerationFailed))
    }
}

fn is_missing_audience(error: &jsonwebtoken::errors::Error) -> bool {
    matches!(error.kind(), ErrorKind::MissingRequiredClaim(claim) if claim == "aud")
}

fn map_decode_error(error: jsonwebtoken::errors::Error) -> TokenError {
    match error.kind() {
        ErrorKind::ExpiredSignature => TokenError::TokenExpired,
        ErrorKind::InvalidSignature => TokenError::InvalidSignature,
        ErrorKind::MissingRequiredClaim(claim) => TokenError::MissingClaim {
            claim: claim.clone(),
        },
        _ => TokenError::InvalidTokenFormat,
    }
}
