//! User management service

use crate::{
    error::{AppError, AppResult},
    models::user::{CreateUser, UpdateUser, User},
    repository::Repository,
};

#[derive(Clone)]
pub struct UsersService {
    repository: Repository,
}

impl UsersService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Register a user with a unique email
    pub async fn create(&self, user: CreateUser) -> AppResult<User> {
        let user = CreateUser {
            name: user.name.trim().to_string(),
            email: user.email.trim().to_string(),
        };
        if user.name.is_empty() {
            return Err(AppError::Validation("Name must not be empty".to_string()));
        }
        if self.repository.users.email_exists(&user.email, None).await? {
            return Err(AppError::Conflict(format!("Email {} is already registered", user.email)));
        }

        let created = self.repository.users.create(&user).await?;
        tracing::info!(user_id = created.id, "User registered");
        Ok(created)
    }

    pub async fn get(&self, id: i64) -> AppResult<User> {
        self.repository
            .users
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User #{} not found", id)))
    }

    pub async fn list(&self) -> AppResult<Vec<User>> {
        self.repository.users.list().await
    }

    pub async fn update(&self, id: i64, changes: UpdateUser) -> AppResult<User> {
        self.get(id).await?;

        let changes = UpdateUser {
            name: changes.name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()),
            email: changes.email.map(|e| e.trim().to_string()).filter(|e| !e.is_empty()),
        };
        if let Some(ref email) = changes.email {
            if self.repository.users.email_exists(email, Some(id)).await? {
                return Err(AppError::Conflict(format!("Email {} is already registered", email)));
            }
        }

        let updated = self
            .repository
            .users
            .update(id, &changes)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User #{} not found", id)))?;

        tracing::info!(user_id = id, "User updated");
        Ok(updated)
    }

    /// Delete a user along with their items, bookings and comments
    pub async fn delete(&self, id: i64) -> AppResult<()> {
        if !self.repository.users.delete(id).await? {
            return Err(AppError::NotFound(format!("User #{} not found", id)));
        }
        tracing::info!(user_id = id, "User deleted");
        Ok(())
    }
}
