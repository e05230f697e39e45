use epsilon_core::model::{CurrentUser, UserEmail};

use super::SqliteRepository;
use super::mapping::{db, map_profile_row};
use crate::repository::{ProfileRepository, StorageError};

#[async_trait::async_trait]
impl ProfileRepository for SqliteRepository {
    async fn find_profile(&self, email: &UserEmail) -> Result<Option<CurrentUser>, StorageError> {
        let row = sqlx::query(
            r"
                SELECT user_email, full_name, theme
                FROM user_profiles
                WHERE user_email = ?1
            ",
        )
        .bind(email.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(db)?;

        row.as_ref().map(map_profile_row).transpose()
    }

    async fn save_profile(&self, user: &CurrentUser) -> Result<(), StorageError> {
        sqlx::query(
            r"
                INSERT INTO user_profiles (user_email, full_name, theme)
                VALUES (?1, ?2, ?3)
                ON CONFLICT(user_email) DO UPDATE SET
                    full_name = excluded.full_name,
                    theme = excluded.theme
            ",
        )
        .bind(user.email.as_str())
        .bind(user.full_name.as_deref())
        .bind(user.theme.as_str())
        .execute(&self.pool)
        .await
        .map_err(db)?;
        Ok(())
    }
}
