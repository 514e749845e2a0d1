//! MySQL implementation of the IdentityRepository trait.
//!
//! Reads the identity projection off the `users` table and increments the
//! token-version counter used to invalidate outstanding access tokens.

use async_trait::async_trait;
use sqlx::{MySqlPool, Row};
use uuid::Uuid;

use rn_core::domain::entities::identity::Identity;
use rn_core::errors::DomainError;
use rn_core::repositories::IdentityRepository;

/// MySQL implementation of IdentityRepository
pub struct MySqlIdentityRepository {
    /// Database connection pool
    pool: MySqlPool,
}

impl MySqlIdentityRepository {
    /// Create a new MySQL identity repository
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl IdentityRepository for MySqlIdentityRepository {
    async fn find_identity(&self, user_id: Uuid) -> Result<Option<Identity>, DomainError> {
        let query = r#"
            SELECT id, email, token_version
            FROM users
            WHERE id = ?
            LIMIT 1
        "#;

        let result = sqlx::query(query)
            .bind(user_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DomainError::Persistence {
                message: format!("Failed to find identity: {}", e),
            })?;

        match result {
            Some(row) => {
                let id: String = row.try_get("id").map_err(|e| DomainError::Persistence {
                    message: format!("Failed to get id: {}", e),
                })?;

                Ok(Some(Identity {
                    id: Uuid::parse_str(&id).map_err(|e| DomainError::Persistence {
                        message: format!("Invalid user UUID: {}", e),
                    })?,
                    email: row.try_get("email").map_err(|e| DomainError::Persistence {
                        message: format!("Failed to get email: {}", e),
                    })?,
                    token_version: row.try_get("token_version").map_err(|e| {
                        DomainError::Persistence {
                            message: format!("Failed to get token_version: {}", e),
                        }
                    })?,
                }))
            }
            None => Ok(None),
        }
    }

    async fn bump_token_version(&self, user_id: Uuid) -> Result<u32, DomainError> {
        let result = sqlx::query("UPDATE users SET token_version = token_version + 1 WHERE id = ?")
            .bind(user_id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::Persistence {
                message: format!("Failed to bump token version: {}", e),
            })?;

        if result.rows_affected() == 0 {
            return Err(DomainError::Internal {
                message: format!("Unknown user: {}", user_id),
            });
        }

        let row = sqlx::query("SELECT token_version FROM users WHERE id = ?")
            .bind(user_id.to_string())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| DomainError::Persistence {
                message: format!("Failed to read token version: {}", e),
            })?;

        row.try_get("token_version")
            .map_err(|e| DomainError::Persistence {
                message: format!("Failed to get token_version: {}", e),
            })
    }
}
