use std::sync::Arc;

use time::OffsetDateTime;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::auth::password::verify_dummy;

use super::{
    email::{normalize_email, MAX_EMAIL_LEN},
    errors::UserError,
    model::{Authenticatable, User, UserFields},
    repo::UserRepository,
};

/// Builds validated users and persists them through the injected repository.
#[derive(Clone)]
pub struct UserManager {
    repo: Arc<dyn UserRepository>,
}

impl UserManager {
    pub fn new(repo: Arc<dyn UserRepository>) -> Self {
        Self { repo }
    }

    fn build(email: &str, password: &str, fields: UserFields) -> Result<User, UserError> {
        let email = normalize_email(email);
        if email.is_empty() {
            return Err(UserError::Validation("user must have an email".into()));
        }
        if email.chars().count() > MAX_EMAIL_LEN {
            return Err(UserError::Validation(format!(
                "email must be at most {MAX_EMAIL_LEN} characters"
            )));
        }
        let mut user = User::new(email, fields);
        user.set_password(password)?;
        Ok(user)
    }

    /// Creates a regular user. Flags default to `false` unless set in `fields`.
    #[instrument(skip(self, password, fields))]
    pub async fn create_user(
        &self,
        email: &str,
        password: &str,
        fields: UserFields,
    ) -> Result<User, UserError> {
        let user = Self::build(email, password, fields)?;
        let user = self.repo.save(&user).await?;
        info!(user_id = ?user.id, email = %user.email, "user created");
        Ok(user)
    }

    /// Creates a user with all four status flags forced on.
    ///
    /// The flags are set before the single write, so a failed write leaves
    /// nothing behind and a stored superuser is never partially elevated.
    #[instrument(skip(self, password, fields))]
    pub async fn create_superuser(
        &self,
        email: &str,
        password: &str,
        fields: UserFields,
    ) -> Result<User, UserError> {
        let mut user = Self::build(email, password, fields)?;
        user.apply(UserFields::elevated());
        let user = self.repo.save(&user).await?;
        info!(user_id = ?user.id, email = %user.email, "superuser created");
        Ok(user)
    }

    /// Checks credentials and stamps `last_login` on success.
    #[instrument(skip(self, password))]
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<User, UserError> {
        let email = normalize_email(email);
        let Some(mut user) = self.repo.find_by_email(&email).await? else {
            warn!(email = %email, "login unknown email");
            verify_dummy(password);
            return Err(UserError::InvalidCredentials);
        };

        if !user.check_password(password)? {
            warn!(email = %email, user_id = ?user.id, "login invalid password");
            return Err(UserError::InvalidCredentials);
        }
        if !user.is_active() {
            warn!(email = %email, user_id = ?user.id, "login on inactive account");
            return Err(UserError::Inactive);
        }

        let id = user.id.ok_or(UserError::NotPersisted)?;
        let now = OffsetDateTime::now_utc();
        self.repo.record_login(id, now).await?;
        user.last_login = Some(now);
        Ok(user)
    }

    pub async fn get(&self, id: Uuid) -> Result<User, UserError> {
        self.repo
            .find_by_id(id)
            .await?
            .ok_or(UserError::NotFound(id))
    }
}
