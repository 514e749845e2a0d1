//! Projection of the user record consumed by the security core.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The slice of a user account the token core needs.
///
/// Owned by the user service; this core only reads it and bumps
/// `token_version` on breach or global logout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// User ID
    pub id: Uuid,

    /// Email used as a claim in issued tokens
    pub email: String,

    /// Server-side token version; incrementing it invalidates every
    /// previously issued token at the authorization layer
    pub token_version: u32,
}

impl Identity {
    pub fn new(id: Uuid, email: impl Into<String>, token_version: u32) -> Self {
        Self {
            id,
            email: email.into(),
            token_version,
        }
    }
}
