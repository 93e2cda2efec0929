use std::fmt;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use super::errors::UserError;
use crate::auth::{
    jwt::{JwtKeys, TokenPair},
    password::{hash_password, verify_password},
};

/// Login identity: who the account is and whether it may sign in.
pub trait Authenticatable {
    /// Login identifier. Always the normalized email.
    fn username(&self) -> &str;
    fn password_hash(&self) -> &str;
    fn is_active(&self) -> bool;
    fn set_password(&mut self, plain: &str) -> Result<(), UserError>;
    fn check_password(&self, plain: &str) -> Result<bool, UserError>;
}

/// Elevation flags consumed by the authorization layer.
pub trait PermissionHolder {
    fn is_staff(&self) -> bool;
    fn is_superuser(&self) -> bool;

    /// Active staff and superusers may use the admin tooling.
    fn has_admin_access(&self) -> bool
    where
        Self: Authenticatable,
    {
        self.is_active() && (self.is_staff() || self.is_superuser())
    }
}

/// Optional attributes accepted at creation time. `None` keeps the default (`false`).
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct UserFields {
    pub is_verified: Option<bool>,
    pub is_active: Option<bool>,
    pub is_staff: Option<bool>,
    pub is_superuser: Option<bool>,
}

impl UserFields {
    /// All four flags set, as required for superusers.
    pub fn elevated() -> Self {
        Self {
            is_verified: Some(true),
            is_active: Some(true),
            is_staff: Some(true),
            is_superuser: Some(true),
        }
    }
}

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Option<Uuid>, // None until persisted
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String, // Argon2 hash, not exposed in JSON
    pub is_verified: bool,
    pub is_active: bool,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub last_login: Option<OffsetDateTime>,
    pub created_at: Option<OffsetDateTime>, // set by the store on insert
}

impl User {
    /// Unsaved user with the given (already normalized) email and no usable password.
    pub fn new(email: String, fields: UserFields) -> Self {
        let mut user = Self {
            id: None,
            email,
            password_hash: String::new(),
            is_verified: false,
            is_active: false,
            is_staff: false,
            is_superuser: false,
            last_login: None,
            created_at: None,
        };
        user.apply(fields);
        user
    }

    /// Overwrites only the flags that are set.
    pub fn apply(&mut self, fields: UserFields) {
        if let Some(v) = fields.is_verified {
            self.is_verified = v;
        }
        if let Some(v) = fields.is_active {
            self.is_active = v;
        }
        if let Some(v) = fields.is_staff {
            self.is_staff = v;
        }
        if let Some(v) = fields.is_superuser {
            self.is_superuser = v;
        }
    }

    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }

    /// Mints a fresh refresh/access pair bound to this user's id.
    pub fn get_tokens(&self, keys: &JwtKeys) -> Result<TokenPair, UserError> {
        let id = self.id.ok_or(UserError::NotPersisted)?;
        keys.issue_pair(id)
    }
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.email)
    }
}

impl Authenticatable for User {
    fn username(&self) -> &str {
        &self.email
    }

    fn password_hash(&self) -> &str {
        &self.password_hash
    }

    fn is_active(&self) -> bool {
        self.is_active
    }

    fn set_password(&mut self, plain: &str) -> Result<(), UserError> {
        self.password_hash = hash_password(plain)?;
        Ok(())
    }

    fn check_password(&self, plain: &str) -> Result<bool, UserError> {
        if self.password_hash.is_empty() {
            return Ok(false);
        }
        verify_password(plain, &self.password_hash)
    }
}

impl PermissionHolder for User {
    fn is_staff(&self) -> bool {
        self.is_staff
    }

    fn is_superuser(&self) -> bool {
        self.is_superuser
    }
}
