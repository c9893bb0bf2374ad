use async_trait::async_trait;
use sqlx::{PgPool, Row};

use crate::domain::{models::UserId, ports::outbound::ProfileRepository, ProfileError};

/// Profile store backed by the `user_profiles` table.
///
/// Profiles are created elsewhere; this adapter only reads and overwrites the
/// avatar column of existing rows.
pub struct PostgresProfileRepository {
    pool: PgPool,
}

impl PostgresProfileRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProfileRepository for PostgresProfileRepository {
    async fn set_avatar_url(&self, user_id: &UserId, url: &str) -> Result<(), ProfileError> {
        let result = sqlx::query(
            r#"
            UPDATE user_profiles
            SET avatar_url = $2,
                updated_at = now()
            WHERE user_id = $1
            "#,
        )
        .bind(user_id.as_str())
        .bind(url)
        .execute(&self.pool)
        .await
        .map_err(|err| ProfileError::Store(err.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(ProfileError::NotFound(user_id.to_string()));
        }

        Ok(())
    }

    async fn get_avatar_url(&self, user_id: &UserId) -> Result<String, ProfileError> {
        let row = sqlx::query(
            r#"
            SELECT avatar_url
            FROM user_profiles
            WHERE user_id = $1
            "#,
        )
        .bind(user_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|err| ProfileError::Store(err.to_string()))?
        .ok_or_else(|| ProfileError::NotFound(user_id.to_string()))?;

        let avatar_url: Option<String> = row
            .try_get("avatar_url")
            .map_err(|err| ProfileError::Store(err.to_string()))?;

        Ok(avatar_url.unwrap_or_default())
    }
}
