use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::AccountRepo;
use crate::error::Result;
use crate::models::User;

pub struct PgAccountRepo {
    pool: PgPool,
}

impl PgAccountRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountRepo for PgAccountRepo {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT * FROM users WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT * FROM users WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn record_login_success(&self, username: &str, now: DateTime<Utc>) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE users
            SET failed_login_attempts = 0, locked_until = NULL, last_login_at = $2, updated_at = $2
            WHERE username = $1
            "#,
        )
        .bind(username)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn record_login_failure(&self, username: &str) -> Result<Option<i32>> {
        // Row-level atomic increment; concurrent failures on the same
        // account never lose updates.
        let attempts: Option<i32> = sqlx::query_scalar(
            r#"
            UPDATE users
            SET failed_login_attempts = failed_login_attempts + 1, updated_at = CURRENT_TIMESTAMP
            WHERE username = $1
            RETURNING failed_login_attempts
            "#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(attempts)
    }

    async fn lock_until(&self, username: &str, until: DateTime<Utc>) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE users SET locked_until = $2, updated_at = CURRENT_TIMESTAMP WHERE username = $1
            "#,
        )
        .bind(username)
        .bind(until)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn clear_lock(&self, username: &str) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE users
            SET failed_login_attempts = 0, locked_until = NULL, updated_at = CURRENT_TIMESTAMP
            WHERE username = $1
            "#,
        )
        .bind(username)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update_password(
        &self,
        id: Uuid,
        password_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE users SET password_hash = $2, password_changed_at = $3, updated_at = $3 WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(password_hash)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
