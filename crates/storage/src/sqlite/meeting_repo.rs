use chrono::Utc;
use epsilon_core::model::{Meeting, MeetingId, UserEmail, ValidatedMeeting};

use super::SqliteRepository;
use super::mapping::{db, id_to_i64, map_meeting_row, meeting_id_from_i64};
use crate::repository::{MeetingRepository, RegistrationRepository, StorageError};

const MEETING_COLUMNS: &str = r"
    id, title, description, teacher_name, teacher_title, date, time, duration_minutes,
    meeting_link, category, meeting_type, recurring
";

#[async_trait::async_trait]
impl MeetingRepository for SqliteRepository {
    async fn insert_meeting(&self, meeting: &ValidatedMeeting) -> Result<MeetingId, StorageError> {
        let res = sqlx::query(
            r"
            INSERT INTO meetings (
                title, description, teacher_name, teacher_title, date, time,
                duration_minutes, meeting_link, category, meeting_type, recurring
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            ",
        )
        .bind(&meeting.title)
        .bind(&meeting.description)
        .bind(&meeting.teacher_name)
        .bind(&meeting.teacher_title)
        .bind(meeting.date)
        .bind(meeting.time)
        .bind(i64::from(meeting.duration_minutes))
        .bind(meeting.meeting_link.as_str())
        .bind(meeting.category.as_str())
        .bind(meeting.meeting_type.as_str())
        .bind(meeting.recurring.as_str())
        .execute(&self.pool)
        .await
        .map_err(db)?;

        meeting_id_from_i64(res.last_insert_rowid())
    }

    async fn get_meeting(&self, id: MeetingId) -> Result<Meeting, StorageError> {
        let sql = format!("SELECT {MEETING_COLUMNS} FROM meetings WHERE id = ?1");
        let row = sqlx::query(&sql)
            .bind(id_to_i64("meeting_id", id.value())?)
            .fetch_optional(&self.pool)
            .await
            .map_err(db)?
            .ok_or(StorageError::NotFound)?;

        map_meeting_row(&row)
    }

    async fn list_meetings(&self) -> Result<Vec<Meeting>, StorageError> {
        let sql = format!("SELECT {MEETING_COLUMNS} FROM meetings ORDER BY date ASC, time ASC, id ASC");
        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(db)?;

        rows.iter().map(map_meeting_row).collect()
    }
}

#[async_trait::async_trait]
impl RegistrationRepository for SqliteRepository {
    async fn register(&self, email: &UserEmail, meeting: MeetingId) -> Result<bool, StorageError> {
        let meeting_id = id_to_i64("meeting_id", meeting.value())?;
        let mut tx = self.pool.begin().await.map_err(db)?;

        sqlx::query("SELECT 1 FROM meetings WHERE id = ?1")
            .bind(meeting_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db)?
            .ok_or(StorageError::NotFound)?;

        let res = sqlx::query(
            r"
            INSERT INTO meeting_registrations (user_email, meeting_id, registered_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(user_email, meeting_id) DO NOTHING
            ",
        )
        .bind(email.as_str())
        .bind(meeting_id)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await
        .map_err(db)?;

        tx.commit().await.map_err(db)?;
        Ok(res.rows_affected() == 1)
    }

    async fn unregister(
        &self,
        email: &UserEmail,
        meeting: MeetingId,
    ) -> Result<bool, StorageError> {
        let res = sqlx::query(
            "DELETE FROM meeting_registrations WHERE user_email = ?1 AND meeting_id = ?2",
        )
        .bind(email.as_str())
        .bind(id_to_i64("meeting_id", meeting.value())?)
        .execute(&self.pool)
        .await
        .map_err(db)?;

        Ok(res.rows_affected() == 1)
    }

    async fn registrations_for_user(
        &self,
        email: &UserEmail,
    ) -> Result<Vec<MeetingId>, StorageError> {
        let ids: Vec<i64> = sqlx::query_scalar(
            r"
            SELECT meeting_id FROM meeting_registrations
            WHERE user_email = ?1
            ORDER BY meeting_id ASC
            ",
        )
        .bind(email.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(db)?;

        ids.into_iter().map(meeting_id_from_i64).collect()
    }
}
