use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;
use sqlx::PgExecutor;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::user::models::EmailAddress;
use crate::domain::user::models::ProfileChanges;
use crate::domain::user::models::User;
use crate::domain::user::models::UserId;
use crate::domain::user::models::Username;
use crate::domain::user::ports::UserRepository;
use crate::user::errors::UserError;

const EMAIL_UNIQUE_CONSTRAINT: &str = "users_email_key";

const USER_COLUMNS: &str =
    "id, username, name, email, profile_picture, password_hash, created_at, updated_at";

pub struct PostgresUserRepository {
    pool: PgPool,
}

impl PostgresUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    username: String,
    name: String,
    email: String,
    profile_picture: Option<String>,
    password_hash: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = UserError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let id = row.id;
        let corrupt =
            |e: String| UserError::DatabaseError(format!("stored user {} is invalid: {}", id, e));

        Ok(User {
            id: UserId(id),
            username: Username::new(row.username).map_err(|e| corrupt(e.to_string()))?,
            name: row.name,
            email: EmailAddress::new(row.email).map_err(|e| corrupt(e.to_string()))?,
            profile_picture: row.profile_picture,
            password_hash: row.password_hash,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Map a write failure, turning the email unique violation into a conflict.
fn map_write_error(e: sqlx::Error, email: &EmailAddress) -> UserError {
    if let Some(db_err) = e.as_database_error() {
        if db_err.is_unique_violation() && db_err.constraint() == Some(EMAIL_UNIQUE_CONSTRAINT) {
            return UserError::EmailAlreadyExists(email.to_string());
        }
    }
    UserError::DatabaseError(e.to_string())
}

fn map_read_error(e: sqlx::Error) -> UserError {
    UserError::DatabaseError(e.to_string())
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn create(&self, user: User) -> Result<User, UserError> {
        let query = format!(
            r#"
            INSERT INTO users (id, username, name, email, profile_picture, password_hash, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {USER_COLUMNS}
            "#
        );

        let row = sqlx::query_as::<_, UserRow>(&query)
            .bind(user.id.0)
            .bind(user.username.as_str())
            .bind(&user.name)
            .bind(user.email.as_str())
            .bind(user.profile_picture.as_deref())
            .bind(&user.password_hash)
            .bind(user.created_at)
            .bind(user.updated_at)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_write_error(e, &user.email))?;

        row.try_into()
    }

    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, UserError> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");

        sqlx::query_as::<_, UserRow>(&query)
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_read_error)?
            .map(User::try_from)
            .transpose()
    }

    async fn find_by_email(&self, email: &EmailAddress) -> Result<Option<User>, UserError> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");

        sqlx::query_as::<_, UserRow>(&query)
            .bind(email.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_read_error)?
            .map(User::try_from)
            .transpose()
    }

    async fn list_all(&self) -> Result<Vec<User>, UserError> {
        let query = format!("SELECT {USER_COLUMNS} FROM users ORDER BY created_at ASC, id ASC");

        sqlx::query_as::<_, UserRow>(&query)
            .fetch_all(&self.pool)
            .await
            .map_err(map_read_error)?
            .into_iter()
            .map(User::try_from)
            .collect()
    }

    async fn update_profile(
        &self,
        id: &UserId,
        changes: &ProfileChanges,
    ) -> Result<User, UserError> {
        write_profile(&self.pool, id, changes).await
    }

    async fn update_profile_and_password(
        &self,
        id: &UserId,
        changes: &ProfileChanges,
        password_hash: &str,
    ) -> Result<User, UserError> {
        let mut tx = self.pool.begin().await.map_err(map_read_error)?;

        // Dropping `tx` on an early return rolls both statements back.
        write_password(&mut *tx, id, password_hash).await?;
        let user = write_profile(&mut *tx, id, changes).await?;

        tx.commit().await.map_err(map_read_error)?;

        Ok(user)
    }

    async fn update_password(&self, id: &UserId, password_hash: &str) -> Result<(), UserError> {
        write_password(&self.pool, id, password_hash).await
    }
}

async fn write_profile<'e, E>(
    executor: E,
    id: &UserId,
    changes: &ProfileChanges,
) -> Result<User, UserError>
where
    E: PgExecutor<'e>,
{
    let query = format!(
        r#"
        UPDATE users
        SET username = COALESCE($2, username),
            name = COALESCE($3, name),
            email = COALESCE($4, email),
            profile_picture = CASE WHEN $5 THEN $6 ELSE profile_picture END,
            updated_at = NOW()
        WHERE id = $1
        RETURNING {USER_COLUMNS}
        "#
    );

    let row = sqlx::query_as::<_, UserRow>(&query)
        .bind(id.0)
        .bind(changes.username.as_ref().map(Username::as_str))
        .bind(changes.name.as_deref())
        .bind(changes.email.as_ref().map(EmailAddress::as_str))
        .bind(changes.profile_picture.is_some())
        .bind(changes.profile_picture.clone().flatten())
        .fetch_optional(executor)
        .await
        .map_err(|e| match &changes.email {
            Some(email) => map_write_error(e, email),
            None => UserError::DatabaseError(e.to_string()),
        })?
        .ok_or_else(|| UserError::NotFound(id.to_string()))?;

    row.try_into()
}

async fn write_password<'e, E>(
    executor: E,
    id: &UserId,
    password_hash: &str,
) -> Result<(), UserError>
where
    E: PgExecutor<'e>,
{
    let result = sqlx::query(
        r#"
        UPDATE users
        SET password_hash = $2, updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(id.0)
    .bind(password_hash)
    .execute(executor)
    .await
    .map_err(map_read_error)?;

    if result.rows_affected() == 0 {
        return Err(UserError::NotFound(id.to_string()));
    }

    Ok(())
}
