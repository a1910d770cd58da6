//! Identity records shared by the admin console and the CLI.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{Email, Role, UserId};

/// Collection holding sign-in records.
pub const USERS_COLLECTION: &str = "users";

/// Canonical collection of role documents, keyed by user id.
pub const ROLES_COLLECTION: &str = "admins";

/// Capitalized duplicate of [`ROLES_COLLECTION`] found in older data.
///
/// Read as a fallback only; new role documents are always written to the
/// canonical collection.
pub const LEGACY_ROLES_COLLECTION: &str = "Admins";

/// Role tag that grants admin access.
pub const ADMIN_ROLE: &str = "admin";

/// An authenticated user as seen by the application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub uid: UserId,
    pub email: Email,
    pub role: Role,
    pub is_admin: bool,
}

/// Stored sign-in record (document in [`USERS_COLLECTION`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: UserId,
    pub email: Email,
    /// Argon2 PHC string.
    pub password_hash: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
}

/// Role document (in [`ROLES_COLLECTION`] or its legacy twin).
///
/// `role` is kept as free text so unknown roles in stored data decode
/// cleanly and simply do not grant access.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleRecord {
    pub role: String,
    #[serde(default)]
    pub email: Option<Email>,
}

impl RoleRecord {
    /// Role document granting admin access.
    #[must_use]
    pub fn admin(email: Email) -> Self {
        Self {
            role: ADMIN_ROLE.to_string(),
            email: Some(email),
        }
    }

    #[must_use]
    pub fn grants_admin(&self) -> bool {
        self.role == ADMIN_ROLE
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_role_record_grants_admin() {
        assert!(RoleRecord::admin(Email::parse("a@b.c").unwrap()).grants_admin());
        let editor: RoleRecord = serde_json::from_str(r#"{"role": "editor"}"#).unwrap();
        assert!(!editor.grants_admin());
        let shouty: RoleRecord = serde_json::from_str(r#"{"role": "Admin"}"#).unwrap();
        assert!(!shouty.grants_admin());
    }
}
