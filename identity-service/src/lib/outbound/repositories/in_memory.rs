use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::domain::user::models::EmailAddress;
use crate::domain::user::models::ProfileChanges;
use crate::domain::user::models::User;
use crate::domain::user::models::UserId;
use crate::domain::user::ports::UserRepository;
use crate::user::errors::UserError;

/// Process-local user store.
///
/// Enforces the same email uniqueness as the PostgreSQL schema. Used by the
/// API tests and for running the service without a database.
#[derive(Debug, Default)]
pub struct InMemoryUserRepository {
    users: RwLock<HashMap<UserId, User>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn email_taken(users: &HashMap<UserId, User>, email: &EmailAddress, except: &UserId) -> bool {
        users
            .values()
            .any(|user| user.id != *except && user.email == *email)
    }

    /// Validate, then mutate under a single write lock.
    async fn apply_update(
        &self,
        id: &UserId,
        changes: &ProfileChanges,
        password_hash: Option<&str>,
    ) -> Result<User, UserError> {
        let mut users = self.users.write().await;

        if let Some(email) = &changes.email {
            if Self::email_taken(&users, email, id) {
                return Err(UserError::EmailAlreadyExists(email.to_string()));
            }
        }

        let user = users
            .get_mut(id)
            .ok_or_else(|| UserError::NotFound(id.to_string()))?;
        changes.apply_to(user);
        if let Some(password_hash) = password_hash {
            user.password_hash = password_hash.to_string();
        }
        user.updated_at = Utc::now();

        Ok(user.clone())
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn create(&self, user: User) -> Result<User, UserError> {
        let mut users = self.users.write().await;

        if Self::email_taken(&users, &user.email, &user.id) {
            return Err(UserError::EmailAlreadyExists(user.email.to_string()));
        }

        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, UserError> {
        Ok(self.users.read().await.get(id).cloned())
    }

    async fn find_by_email(&self, email: &EmailAddress) -> Result<Option<User>, UserError> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|user| user.email == *email)
            .cloned())
    }

    async fn list_all(&self) -> Result<Vec<User>, UserError> {
        let mut users: Vec<User> = self.users.read().await.values().cloned().collect();
        users.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.id.0.cmp(&b.id.0))
        });
        Ok(users)
    }

    async fn update_profile(
        &self,
        id: &UserId,
        changes: &ProfileChanges,
    ) -> Result<User, UserError> {
        self.apply_update(id, changes, None).await
    }

    async fn update_profile_and_password(
        &self,
        id: &UserId,
        changes: &ProfileChanges,
        password_hash: &str,
    ) -> Result<User, UserError> {
        self.apply_update(id, changes, Some(password_hash)).await
    }

    async fn update_password(&self, id: &UserId, password_hash: &str) -> Result<(), UserError> {
        let mut users = self.users.write().await;
        let user = users
            .get_mut(id)
            .ok_or_else(|| UserError::NotFound(id.to_string()))?;

        user.password_hash = password_hash.to_string();
        user.updated_at = Utc::now();

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::domain::user::models::Username;

    fn user(email: &str) -> User {
        let now = Utc::now();
        User {
            id: UserId::new(),
            username: Username::new("alice".to_string()).unwrap(),
            name: String::new(),
            email: EmailAddress::new(email.to_string()).unwrap(),
            profile_picture: None,
            password_hash: "hash".to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_create_rejects_duplicate_email() {
        let repository = InMemoryUserRepository::new();
        repository.create(user("alice@example.com")).await.unwrap();

        let result = repository.create(user("Alice@Example.com")).await;
        assert!(matches!(result, Err(UserError::EmailAlreadyExists(_))));
    }

    #[tokio::test]
    async fn test_update_profile_rejects_email_of_another_user() {
        let repository = InMemoryUserRepository::new();
        repository.create(user("alice@example.com")).await.unwrap();
        let bob = repository.create(user("bob@example.com")).await.unwrap();

        let taken = ProfileChanges {
            email: Some(EmailAddress::new("alice@example.com".to_string()).unwrap()),
            ..Default::default()
        };
        assert!(matches!(
            repository.update_profile(&bob.id, &taken).await,
            Err(UserError::EmailAlreadyExists(_))
        ));

        // re-saving your own address is not a conflict
        let own = ProfileChanges {
            email: Some(bob.email.clone()),
            ..Default::default()
        };
        assert!(repository.update_profile(&bob.id, &own).await.is_ok());
    }

    #[tokio::test]
    async fn test_update_missing_user_is_not_found() {
        let repository = InMemoryUserRepository::new();
        let id = UserId::new();

        assert!(matches!(
            repository
                .update_profile(&id, &ProfileChanges::default())
                .await,
            Err(UserError::NotFound(_))
        ));
        assert!(matches!(
            repository.update_password(&id, "hash").await,
            Err(UserError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_list_all_is_ordered_by_creation() {
        let repository = InMemoryUserRepository::new();
        let mut older = user("older@example.com");
        older.created_at = older.created_at - Duration::minutes(5);
        let newer = repository.create(user("newer@example.com")).await.unwrap();
        let older = repository.create(older).await.unwrap();

        let listed: Vec<UserId> = repository
            .list_all()
            .await
            .unwrap()
            .into_iter()
            .map(|user| user.id)
            .collect();
        assert_eq!(listed, vec![older.id, newer.id]);
    }

    #[tokio::test]
    async fn test_rejected_combined_update_leaves_record_unchanged() {
        let repository = InMemoryUserRepository::new();
        repository.create(user("alice@example.com")).await.unwrap();
        let bob = repository.create(user("bob@example.com")).await.unwrap();

        let changes = ProfileChanges {
            name: Some("Robert".to_string()),
            email: Some(EmailAddress::new("alice@example.com".to_string()).unwrap()),
            ..Default::default()
        };
        let result = repository
            .update_profile_and_password(&bob.id, &changes, "new-hash")
            .await;
        assert!(matches!(result, Err(UserError::EmailAlreadyExists(_))));

        let stored = repository.find_by_id(&bob.id).await.unwrap().unwrap();
        assert_eq!(stored, bob);
    }
}
