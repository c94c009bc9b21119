use std::sync::Arc;

use async_trait::async_trait;
use auth::Authenticator;
use chrono::Utc;

use crate::domain::user::models::CreateUserCommand;
use crate::domain::user::models::EmailAddress;
use crate::domain::user::models::LoginCommand;
use crate::domain::user::models::Session;
use crate::domain::user::models::UpdateUserCommand;
use crate::domain::user::models::User;
use crate::domain::user::models::UserId;
use crate::user::errors::UserError;
use crate::user::ports::UserRepository;
use crate::user::ports::UserServicePort;

/// Domain service implementation for user operations.
///
/// Concrete implementation of UserServicePort with dependency injection.
pub struct UserService<UR>
where
    UR: UserRepository,
{
    repository: Arc<UR>,
    authenticator: Arc<Authenticator>,
}

impl<UR> UserService<UR>
where
    UR: UserRepository,
{
    /// Create a new user service with injected dependencies.
    ///
    /// # Arguments
    /// * `repository` - User persistence implementation
    /// * `authenticator` - Password hashing and token issuance
    pub fn new(repository: Arc<UR>, authenticator: Arc<Authenticator>) -> Self {
        Self {
            repository,
            authenticator,
        }
    }

    async fn find_existing(&self, id: &UserId) -> Result<User, UserError> {
        self.repository
            .find_by_id(id)
            .await?
            .ok_or(UserError::NotFound(id.to_string()))
    }
}

#[async_trait]
impl<UR> UserServicePort for UserService<UR>
where
    UR: UserRepository,
{
    async fn create_user(&self, command: CreateUserCommand) -> Result<User, UserError> {
        let password_hash = self
            .authenticator
            .hash_password(command.password.expose())?;

        let now = Utc::now();
        let user = User {
            id: UserId::new(),
            username: command.username,
            name: command.name,
            email: command.email,
            profile_picture: command.profile_picture,
            password_hash,
            created_at: now,
            updated_at: now,
        };

        let created_user = self.repository.create(user).await?;
        tracing::info!(user_id = %created_user.id, "User registered");

        Ok(created_user)
    }

    async fn authenticate(&self, command: LoginCommand) -> Result<Session, UserError> {
        let Ok(email) = EmailAddress::new(command.email) else {
            tracing::debug!("Login rejected: email is not a valid address");
            return Err(UserError::InvalidCredentials);
        };

        let Some(user) = self.repository.find_by_email(&email).await? else {
            tracing::debug!("Login rejected: no account for email");
            return Err(UserError::InvalidCredentials);
        };

        let issued = self
            .authenticator
            .authenticate(&command.password, &user.password_hash, user.id, Utc::now())
            .map_err(|e| {
                tracing::debug!(user_id = %user.id, "Login rejected: {}", e);
                UserError::from(e)
            })?;

        tracing::info!(user_id = %user.id, expires_at = %issued.expires_at, "User authenticated");

        Ok(Session {
            user,
            token: issued.access_token,
            expires_at: issued.expires_at,
        })
    }

    async fn get_user(&self, id: &UserId) -> Result<User, UserError> {
        self.find_existing(id).await
    }

    async fn list_users(&self) -> Result<Vec<User>, UserError> {
        self.repository.list_all().await
    }

    async fn update_user(
        &self,
        actor: &UserId,
        target: &UserId,
        command: UpdateUserCommand,
    ) -> Result<User, UserError> {
        if actor != target {
            tracing::warn!(actor = %actor, target = %target, "Update of another user's record refused");
            return Err(UserError::Forbidden {
                actor: actor.to_string(),
                target: target.to_string(),
            });
        }

        // Hash before any write so a hashing failure leaves the record untouched.
        let password_hash = command
            .password
            .as_ref()
            .map(|password| self.authenticator.hash_password(password.expose()))
            .transpose()?;

        let user = match password_hash {
            None => {
                self.repository
                    .update_profile(target, &command.profile)
                    .await?
            }
            Some(password_hash) if command.profile.is_empty() => {
                self.repository
                    .update_password(target, &password_hash)
                    .await?;
                self.find_existing(target).await?
            }
            Some(password_hash) => {
                self.repository
                    .update_profile_and_password(target, &command.profile, &password_hash)
                    .await?
            }
        };

        if command.password.is_some() {
            tracing::info!(user_id = %target, "Password changed");
        }
        tracing::info!(user_id = %target, "User updated");

        Ok(user)
    }
}
