//! Role checks for the administrative back office.
//!
//! Session handling lives outside this workspace; callers hand over an already
//! resolved [`Identity`] (or `None` for an anonymous caller) and ask whether it
//! carries one of the roles an operation requires.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Roles
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    SuperAdmin,
}

impl Role {
    pub const fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::SuperAdmin => "super_admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "admin" => Ok(Role::Admin),
            "super_admin" => Ok(Role::SuperAdmin),
            other => Err(AuthError::UnknownRole(other.to_string())),
        }
    }
}

/// Roles allowed to manage backups and recurring jobs.
pub const BACKUP_ADMIN_ROLES: &[Role] = &[Role::Admin, Role::SuperAdmin];

// ============================================================================
// Identity
// ============================================================================

/// An authenticated back-office user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: i64,
    pub username: String,
    pub role: Role,
}

impl Identity {
    #[inline]
    pub fn new(id: i64, username: impl Into<String>, role: Role) -> Self {
        Self {
            id,
            username: username.into(),
            role,
        }
    }

    #[inline]
    pub fn has_any_role(&self, roles: &[Role]) -> bool {
        roles.contains(&self.role)
    }
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("authentication required")]
    Unauthenticated,
    #[error("role `{actual}` may not perform this operation")]
    Forbidden { actual: Role },
    #[error("unknown role `{0}`")]
    UnknownRole(String),
}

/// Returns the identity when it holds one of `required`.
pub fn require_role<'a>(
    required: &[Role],
    identity: Option<&'a Identity>,
) -> Result<&'a Identity, AuthError> {
    let identity = identity.ok_or(AuthError::Unauthenticated)?;
    if identity.has_any_role(required) {
        Ok(identity)
    } else {
        Err(AuthError::Forbidden {
            actual: identity.role,
        })
    }
}
