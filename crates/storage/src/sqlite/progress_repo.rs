use epsilon_core::model::{ProgressId, ProgressRecord, UserEmail};
use tracing::debug;

use super::SqliteRepository;
use super::mapping::{db, id_to_i64, map_progress_row, progress_id_from_i64, to_json};
use crate::repository::{ProgressEntry, ProgressPatch, ProgressRepository, StorageError};

const PROGRESS_COLUMNS: &str = r"
    id, user_email, xp, completed_lessons, completed_quizzes, completed_videos,
    downloaded_resources, badges, streak_days
";

enum Value {
    Int(i64),
    Text(String),
}

/// Column assignments for the fields a patch actually sets.
fn patch_assignments(patch: &ProgressPatch) -> Result<Vec<(&'static str, Value)>, StorageError> {
    let mut out = Vec::new();
    if let Some(xp) = patch.xp {
        out.push(("xp", Value::Int(i64::from(xp))));
    }
    for (column, set) in [
        ("completed_lessons", &patch.completed_lessons),
        ("completed_quizzes", &patch.completed_quizzes),
        ("completed_videos", &patch.completed_videos),
        ("downloaded_resources", &patch.downloaded_resources),
    ] {
        if let Some(set) = set {
            out.push((column, Value::Text(to_json(set)?)));
        }
    }
    if let Some(badges) = &patch.badges {
        out.push(("badges", Value::Text(to_json(badges)?)));
    }
    if let Some(streak) = patch.streak_days {
        out.push(("streak_days", Value::Int(i64::from(streak))));
    }
    Ok(out)
}

#[async_trait::async_trait]
impl ProgressRepository for SqliteRepository {
    async fn create(&self, record: &ProgressRecord) -> Result<ProgressId, StorageError> {
        let res = sqlx::query(
            r"
            INSERT INTO user_progress (
                user_email, xp, completed_lessons, completed_quizzes, completed_videos,
                downloaded_resources, badges, streak_days
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ",
        )
        .bind(record.user_email().as_str())
        .bind(i64::from(record.xp()))
        .bind(to_json(record.completed_lessons())?)
        .bind(to_json(record.completed_quizzes())?)
        .bind(to_json(record.completed_videos())?)
        .bind(to_json(record.downloaded_resources())?)
        .bind(to_json(record.stored_badges())?)
        .bind(i64::from(record.streak_days()))
        .execute(&self.pool)
        .await
        .map_err(db)?;

        progress_id_from_i64(res.last_insert_rowid())
    }

    async fn update(&self, id: ProgressId, patch: &ProgressPatch) -> Result<(), StorageError> {
        let id = id_to_i64("progress_id", id.value())?;
        let assignments = patch_assignments(patch)?;

        if assignments.is_empty() {
            // nothing to write, but a missing row is still an error
            sqlx::query("SELECT 1 FROM user_progress WHERE id = ?1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(db)?
                .ok_or(StorageError::NotFound)?;
            return Ok(());
        }

        let mut sql = String::from("UPDATE user_progress SET ");
        for (i, (column, _)) in assignments.iter().enumerate() {
            if i > 0 {
                sql.push_str(", ");
            }
            sql.push_str(column);
            sql.push_str(" = ?");
            sql.push_str(&(i + 1).to_string());
        }
        sql.push_str(" WHERE id = ?");
        sql.push_str(&(assignments.len() + 1).to_string());

        let mut query = sqlx::query(&sql);
        for (_, value) in assignments {
            query = match value {
                Value::Int(v) => query.bind(v),
                Value::Text(v) => query.bind(v),
            };
        }
        let res = query.bind(id).execute(&self.pool).await.map_err(db)?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn find_by_email(
        &self,
        email: &UserEmail,
    ) -> Result<Option<ProgressEntry>, StorageError> {
        debug!(%email, "loading progress record");
        let sql = format!("SELECT {PROGRESS_COLUMNS} FROM user_progress WHERE user_email = ?1");
        let row = sqlx::query(&sql)
            .bind(email.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(db)?;

        row.as_ref().map(map_progress_row).transpose()
    }

    async fn list(&self) -> Result<Vec<ProgressEntry>, StorageError> {
        let sql = format!("SELECT {PROGRESS_COLUMNS} FROM user_progress ORDER BY id ASC");
        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(db)?;

        rows.iter().map(map_progress_row).collect()
    }
}
