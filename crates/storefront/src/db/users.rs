//! User queries for [`PgStore`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use bramble_core::{Email, UserId};

use super::{PgStore, RepositoryError, UserStore};
use crate::models::User;

#[derive(sqlx::FromRow)]
struct UserRow {
    id: UserId,
    email: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        Ok(Self {
            id: row.id,
            email,
            created_at: row.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct UserWithPasswordRow {
    id: UserId,
    email: String,
    created_at: DateTime<Utc>,
    password_hash: String,
}

#[async_trait]
impl UserStore for PgStore {
    async fn create_with_password(
        &self,
        email: &Email,
        password_hash: &str,
    ) -> Result<User, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, UserRow>(
            r"
            INSERT INTO users (email)
            VALUES ($1)
            RETURNING id, email, created_at
            ",
        )
        .bind(email.as_str())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return RepositoryError::Conflict("email already exists".to_owned());
            }
            RepositoryError::Database(e)
        })?;

        sqlx::query("INSERT INTO user_passwords (user_id, password_hash) VALUES ($1, $2)")
            .bind(row.id)
            .bind(password_hash)
            .execute(&mut *tx)
            .await?;

        // Every account gets its cart at registration.
        sqlx::query("INSERT INTO carts (user_id) VALUES ($1)")
            .bind(row.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        row.try_into()
    }

    async fn get_with_password(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let row = sqlx::query_as::<_, UserWithPasswordRow>(
            r"
            SELECT u.id, u.email, u.created_at, p.password_hash
            FROM users u
            JOIN user_passwords p ON p.user_id = u.id
            WHERE u.email = $1
            ",
        )
        .bind(email.as_str())
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let user = User::try_from(UserRow {
            id: row.id,
            email: row.email,
            created_at: row.created_at,
        })?;
        Ok(Some((user, row.password_hash)))
    }

    async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, email, created_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(User::try_from).transpose()
    }
}
