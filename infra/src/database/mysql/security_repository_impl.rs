//! MySQL implementation of the SecurityRepository trait.
//!
//! Durable storage for the three security collections:
//! - `revoked_tokens` - blacklist entries keyed by token fingerprint
//! - `token_families` - refresh-token lineages with their member
//!   fingerprints stored as a JSON array
//! - failed-login counters, which live on the `users` table
//!   (`failed_login_attempts`, `last_failed_login_at`, `locked_until`)
//!   rather than in a table of their own

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{MySqlPool, Row};
use uuid::Uuid;

use rn_core::domain::entities::family::TokenFamily;
use rn_core::domain::entities::login_attempt::LoginAttemptRecord;
use rn_core::domain::entities::revocation::{RevocationReason, RevokedToken};
use rn_core::errors::DomainError;
use rn_core::repositories::SecurityRepository;

/// MySQL implementation of SecurityRepository
pub struct MySqlSecurityRepository {
    /// Database connection pool
    pool: MySqlPool,
}

impl MySqlSecurityRepository {
    /// Create a new MySQL security repository
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    fn row_to_revocation(row: &sqlx::mysql::MySqlRow) -> Result<RevokedToken, DomainError> {
        let reason: String = row
            .try_get("reason")
            .map_err(|e| persistence(format!("Failed to get reason: {}", e)))?;

        Ok(RevokedToken {
            fingerprint: row
                .try_get("token_fingerprint")
                .map_err(|e| persistence(format!("Failed to get token_fingerprint: {}", e)))?,
            expires_at: row
                .try_get::<DateTime<Utc>, _>("expires_at")
                .map_err(|e| persistence(format!("Failed to get expires_at: {}", e)))?,
            reason: RevocationReason::parse(&reason),
            created_at: row
                .try_get::<DateTime<Utc>, _>("created_at")
                .map_err(|e| persistence(format!("Failed to get created_at: {}", e)))?,
        })
    }

    fn row_to_family(row: &sqlx::mysql::MySqlRow) -> Result<TokenFamily, DomainError> {
        let user_id: String = row
            .try_get("user_id")
            .map_err(|e| persistence(format!("Failed to get user_id: {}", e)))?;
        let fingerprints: String = row
            .try_get("fingerprints")
            .map_err(|e| persistence(format!("Failed to get fingerprints: {}", e)))?;

        Ok(TokenFamily {
            family_id: row
                .try_get("family_id")
                .map_err(|e| persistence(format!("Failed to get family_id: {}", e)))?,
            user_id: Uuid::parse_str(&user_id)
                .map_err(|e| persistence(format!("Invalid user UUID: {}", e)))?,
            fingerprints: fingerprints_from_json(&fingerprints)?,
            created_at: row
                .try_get::<DateTime<Utc>, _>("created_at")
                .map_err(|e| persistence(format!("Failed to get created_at: {}", e)))?,
            last_used_at: row
                .try_get::<DateTime<Utc>, _>("last_used_at")
                .map_err(|e| persistence(format!("Failed to get last_used_at: {}", e)))?,
        })
    }

    fn row_to_attempts(row: &sqlx::mysql::MySqlRow) -> Result<LoginAttemptRecord, DomainError> {
        let failure_count: u32 = row
            .try_get("failed_login_attempts")
            .map_err(|e| persistence(format!("Failed to get failed_login_attempts: {}", e)))?;

        Ok(LoginAttemptRecord {
            identity: row
                .try_get("email")
                .map_err(|e| persistence(format!("Failed to get email: {}", e)))?,
            failure_count,
            last_attempt_at: row
                .try_get::<Option<DateTime<Utc>>, _>("last_failed_login_at")
                .map_err(|e| persistence(format!("Failed to get last_failed_login_at: {}", e)))?
                .unwrap_or_else(Utc::now),
            locked_until: row
                .try_get::<Option<DateTime<Utc>>, _>("locked_until")
                .map_err(|e| persistence(format!("Failed to get locked_until: {}", e)))?,
        })
    }
}

#[async_trait]
impl SecurityRepository for MySqlSecurityRepository {
    async fn save_revoked_token(&self, entry: &RevokedToken) -> Result<(), DomainError> {
        let query = r#"
            INSERT INTO revoked_tokens (token_fingerprint, expires_at, reason, created_at)
            VALUES (?, ?, ?, ?)
            ON DUPLICATE KEY UPDATE expires_at = VALUES(expires_at), reason = VALUES(reason)
        "#;

        sqlx::query(query)
            .bind(&entry.fingerprint)
            .bind(entry.expires_at)
            .bind(entry.reason.as_str())
            .bind(entry.created_at)
            .execute(&self.pool)
            .await
            .map_err(|e| persistence(format!("Failed to save revoked token: {}", e)))?;

        Ok(())
    }

    async fn load_active_revocations(&self) -> Result<Vec<RevokedToken>, DomainError> {
        let query = r#"
            SELECT token_fingerprint, expires_at, reason, created_at
            FROM revoked_tokens
            WHERE expires_at > ?
        "#;

        let rows = sqlx::query(query)
            .bind(Utc::now())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| persistence(format!("Failed to load revocations: {}", e)))?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in rows {
            entries.push(Self::row_to_revocation(&row)?);
        }
        Ok(entries)
    }

    async fn delete_expired_revocations(&self, now: DateTime<Utc>) -> Result<usize, DomainError> {
        let result = sqlx::query("DELETE FROM revoked_tokens WHERE expires_at < ?")
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(|e| persistence(format!("Failed to delete expired revocations: {}", e)))?;

        Ok(result.rows_affected() as usize)
    }

    async fn save_family(&self, family: &TokenFamily) -> Result<(), DomainError> {
        let query = r#"
            INSERT INTO token_families (family_id, user_id, fingerprints, created_at, last_used_at)
            VALUES (?, ?, ?, ?, ?)
            ON DUPLICATE KEY UPDATE
                fingerprints = VALUES(fingerprints),
                last_used_at = VALUES(last_used_at)
        "#;

        sqlx::query(query)
            .bind(&family.family_id)
            .bind(family.user_id.to_string())
            .bind(fingerprints_to_json(&family.fingerprints)?)
            .bind(family.created_at)
            .bind(family.last_used_at)
            .execute(&self.pool)
            .await
            .map_err(|e| persistence(format!("Failed to save token family: {}", e)))?;

        Ok(())
    }

    async fn delete_family(&self, family_id: &str) -> Result<bool, DomainError> {
        let result = sqlx::query("DELETE FROM token_families WHERE family_id = ?")
            .bind(family_id)
            .execute(&self.pool)
            .await
            .map_err(|e| persistence(format!("Failed to delete token family: {}", e)))?;

        Ok(result.rows_affected() > 0)
    }

    async fn load_families(&self) -> Result<Vec<TokenFamily>, DomainError> {
        let query = r#"
            SELECT family_id, user_id, fingerprints, created_at, last_used_at
            FROM token_families
        "#;

        let rows = sqlx::query(query)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| persistence(format!("Failed to load token families: {}", e)))?;

        let mut families = Vec::with_capacity(rows.len());
        for row in rows {
            families.push(Self::row_to_family(&row)?);
        }
        Ok(families)
    }

    async fn delete_stale_families(&self, cutoff: DateTime<Utc>) -> Result<usize, DomainError> {
        let result = sqlx::query("DELETE FROM token_families WHERE last_used_at < ?")
            .bind(cutoff)
            .execute(&self.pool)
            .await
            .map_err(|e| persistence(format!("Failed to delete stale families: {}", e)))?;

        Ok(result.rows_affected() as usize)
    }

    async fn save_login_attempts(&self, record: &LoginAttemptRecord) -> Result<(), DomainError> {
        let query = r#"
            UPDATE users
            SET failed_login_attempts = ?,
                last_failed_login_at = ?,
                locked_until = ?
            WHERE email = ?
        "#;

        sqlx::query(query)
            .bind(record.failure_count)
            .bind(record.last_attempt_at)
            .bind(record.locked_until)
            .bind(&record.identity)
            .execute(&self.pool)
            .await
            .map_err(|e| persistence(format!("Failed to save login attempts: {}", e)))?;

        Ok(())
    }

    async fn delete_login_attempts(&self, identity: &str) -> Result<bool, DomainError> {
        let query = r#"
            UPDATE users
            SET failed_login_attempts = 0,
                last_failed_login_at = NULL,
                locked_until = NULL
            WHERE email = ?
              AND (failed_login_attempts > 0 OR locked_until IS NOT NULL)
        "#;

        let result = sqlx::query(query)
            .bind(identity)
            .execute(&self.pool)
            .await
            .map_err(|e| persistence(format!("Failed to clear login attempts: {}", e)))?;

        Ok(result.rows_affected() > 0)
    }

    async fn load_login_attempts(&self) -> Result<Vec<LoginAttemptRecord>, DomainError> {
        let query = r#"
            SELECT email, failed_login_attempts, last_failed_login_at, locked_until
            FROM users
            WHERE failed_login_attempts > 0 OR locked_until IS NOT NULL
        "#;

        let rows = sqlx::query(query)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| persistence(format!("Failed to load login attempts: {}", e)))?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            records.push(Self::row_to_attempts(&row)?);
        }
        Ok(records)
    }
}

fn persistence(message: String) -> DomainError {
    DomainError::Persistence { message }
}

/// Serializes a fingerprint set for the JSON column
fn fingerprints_to_json(fingerprints: &HashSet<String>) -> Result<String, DomainError> {
    let mut members: Vec<&String> = fingerprints.iter().collect();
    members.sort();
    serde_json::to_string(&members)
        .map_err(|e| persistence(format!("Failed to encode fingerprints: {}", e)))
}

/// Parses the JSON fingerprint column back into a set
fn fingerprints_from_json(json: &str) -> Result<HashSet<String>, DomainError> {
    serde_json::from_str::<Vec<String>>(json)
        .map(|members| members.into_iter().collect())
        .map_err(|e| persistence(format!("Failed to decode fingerprints: {}", e)))
}
