use std::collections::HashMap;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{errors::UserError, model::User, repo::UserRepository};

/// Process-local store with the same uniqueness rule as the database.
#[derive(Default)]
pub struct InMemoryUserRepository {
    users: Mutex<HashMap<Uuid, User>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.users.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.users.lock().await.is_empty()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn save(&self, user: &User) -> Result<User, UserError> {
        let mut users = self.users.lock().await;

        let taken = users
            .values()
            .any(|u| u.email == user.email && u.id != user.id);
        if taken {
            return Err(UserError::UniquenessViolation {
                email: user.email.clone(),
            });
        }

        let stored = match user.id {
            None => {
                let mut stored = user.clone();
                stored.id = Some(Uuid::new_v4());
                stored.created_at = Some(OffsetDateTime::now_utc());
                stored
            }
            Some(id) => {
                let existing = users.get(&id).ok_or(UserError::NotFound(id))?;
                let mut stored = user.clone();
                stored.created_at = existing.created_at;
                stored.last_login = existing.last_login;
                stored
            }
        };

        if let Some(id) = stored.id {
            users.insert(id, stored.clone());
        }
        Ok(stored)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, UserError> {
        let users = self.users.lock().await;
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, UserError> {
        Ok(self.users.lock().await.get(&id).cloned())
    }

    async fn record_login(&self, id: Uuid, at: OffsetDateTime) -> Result<(), UserError> {
        let mut users = self.users.lock().await;
        let user = users.get_mut(&id).ok_or(UserError::NotFound(id))?;
        user.last_login = Some(at);
        Ok(())
    }
}
