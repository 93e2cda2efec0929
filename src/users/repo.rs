use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use super::{errors::UserError, model::User};

/// Durable storage for users. Implementations enforce email uniqueness.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Inserts when `user.id` is `None`, updates otherwise. Returns the stored row.
    async fn save(&self, user: &User) -> Result<User, UserError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, UserError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, UserError>;
    async fn record_login(&self, id: Uuid, at: OffsetDateTime) -> Result<(), UserError>;
}

const USER_COLUMNS: &str = "id, email, password_hash, is_verified, is_active, is_staff, \
                            is_superuser, last_login, created_at";

#[derive(Clone)]
pub struct PgUserRepository {
    db: PgPool,
}

impl PgUserRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

fn map_write_error(err: sqlx::Error, email: &str) -> UserError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => UserError::UniquenessViolation {
            email: email.to_string(),
        },
        _ => UserError::Database(err),
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn save(&self, user: &User) -> Result<User, UserError> {
        match user.id {
            None => {
                let sql = format!(
                    r#"
                    INSERT INTO users (email, password_hash, is_verified, is_active, is_staff, is_superuser)
                    VALUES ($1, $2, $3, $4, $5, $6)
                    RETURNING {USER_COLUMNS}
                    "#
                );
                sqlx::query_as::<_, User>(&sql)
                    .bind(&user.email)
                    .bind(&user.password_hash)
                    .bind(user.is_verified)
                    .bind(user.is_active)
                    .bind(user.is_staff)
                    .bind(user.is_superuser)
                    .fetch_one(&self.db)
                    .await
                    .map_err(|e| map_write_error(e, &user.email))
            }
            Some(id) => {
                let sql = format!(
                    r#"
                    UPDATE users
                    SET email = $2, password_hash = $3, is_verified = $4,
                        is_active = $5, is_staff = $6, is_superuser = $7
                    WHERE id = $1
                    RETURNING {USER_COLUMNS}
                    "#
                );
                sqlx::query_as::<_, User>(&sql)
                    .bind(id)
                    .bind(&user.email)
                    .bind(&user.password_hash)
                    .bind(user.is_verified)
                    .bind(user.is_active)
                    .bind(user.is_staff)
                    .bind(user.is_superuser)
                    .fetch_optional(&self.db)
                    .await
                    .map_err(|e| map_write_error(e, &user.email))?
                    .ok_or(UserError::NotFound(id))
            }
        }
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, UserError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(&self.db)
            .await?;
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, UserError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await?;
        Ok(user)
    }

    async fn record_login(&self, id: Uuid, at: OffsetDateTime) -> Result<(), UserError> {
        let res = sqlx::query("UPDATE users SET last_login = $2 WHERE id = $1")
            .bind(id)
            .bind(at)
            .execute(&self.db)
            .await?;
        if res.rows_affected() == 0 {
            return Err(UserError::NotFound(id));
        }
        Ok(())
    }
}
