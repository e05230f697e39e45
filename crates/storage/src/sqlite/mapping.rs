use std::collections::BTreeSet;
use std::str::FromStr;

use epsilon_core::model::{
    AnswerRecord, AttemptId, Badge, Category, CurrentUser, Difficulty, Meeting, MeetingId,
    MeetingLink, MeetingType, ProgressId, ProgressRecord, QuizAttempt, Recurrence, Resource,
    ResourceId, ResourceKind, ResourceType, Theme, UserEmail, ValidatedMeeting,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use crate::repository::{ProgressEntry, StorageError};

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

/// Classify a driver error. Unique violations are conflicts; everything else
/// is treated as a (possibly transient) connection problem.
pub(crate) fn db(e: sqlx::Error) -> StorageError {
    match &e {
        sqlx::Error::RowNotFound => StorageError::NotFound,
        sqlx::Error::Database(d) if d.is_unique_violation() => StorageError::Conflict,
        _ => StorageError::Connection(e.to_string()),
    }
}

pub(crate) fn id_to_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

pub(crate) fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn progress_id_from_i64(v: i64) -> Result<ProgressId, StorageError> {
    Ok(ProgressId::new(i64_to_u64("progress_id", v)?))
}

pub(crate) fn attempt_id_from_i64(v: i64) -> Result<AttemptId, StorageError> {
    Ok(AttemptId::new(i64_to_u64("attempt_id", v)?))
}

pub(crate) fn resource_id_from_i64(v: i64) -> Result<ResourceId, StorageError> {
    Ok(ResourceId::new(i64_to_u64("resource_id", v)?))
}

pub(crate) fn meeting_id_from_i64(v: i64) -> Result<MeetingId, StorageError> {
    Ok(MeetingId::new(i64_to_u64("meeting_id", v)?))
}

pub(crate) fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String, StorageError> {
    serde_json::to_string(value).map_err(ser)
}

fn from_json<T: DeserializeOwned>(field: &'static str, raw: &str) -> Result<T, StorageError> {
    serde_json::from_str(raw).map_err(|e| StorageError::Serialization(format!("{field}: {e}")))
}

fn label<T: FromStr>(row: &SqliteRow, column: &'static str) -> Result<T, StorageError>
where
    T::Err: core::fmt::Display,
{
    let raw: String = row.try_get(column).map_err(ser)?;
    raw.parse::<T>().map_err(ser)
}

fn email(row: &SqliteRow) -> Result<UserEmail, StorageError> {
    UserEmail::new(row.try_get::<String, _>("user_email").map_err(ser)?).map_err(ser)
}

fn id_set(row: &SqliteRow, column: &'static str) -> Result<BTreeSet<ResourceId>, StorageError> {
    from_json(column, &row.try_get::<String, _>(column).map_err(ser)?)
}

fn opt_u32(row: &SqliteRow, column: &'static str) -> Result<Option<u32>, StorageError> {
    row.try_get::<Option<i64>, _>(column)
        .map_err(ser)?
        .map(|v| u32_from_i64(column, v))
        .transpose()
}

pub(crate) fn map_progress_row(row: &SqliteRow) -> Result<ProgressEntry, StorageError> {
    let badges: BTreeSet<Badge> =
        from_json("badges", &row.try_get::<String, _>("badges").map_err(ser)?)?;
    let record = ProgressRecord::from_persisted(
        email(row)?,
        u32_from_i64("xp", row.try_get::<i64, _>("xp").map_err(ser)?)?,
        id_set(row, "completed_lessons")?,
        id_set(row, "completed_quizzes")?,
        id_set(row, "completed_videos")?,
        id_set(row, "downloaded_resources")?,
        badges,
        u32_from_i64(
            "streak_days",
            row.try_get::<i64, _>("streak_days").map_err(ser)?,
        )?,
    );
    Ok(ProgressEntry {
        id: progress_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        record,
    })
}

pub(crate) fn map_attempt_row(row: &SqliteRow) -> Result<(AttemptId, QuizAttempt), StorageError> {
    let answers: Vec<AnswerRecord> =
        from_json("answers", &row.try_get::<String, _>("answers").map_err(ser)?)?;
    let attempt = QuizAttempt::from_persisted(
        email(row)?,
        resource_id_from_i64(row.try_get::<i64, _>("quiz_id").map_err(ser)?)?,
        u32_from_i64("score", row.try_get::<i64, _>("score").map_err(ser)?)?,
        u32_from_i64(
            "total_questions",
            row.try_get::<i64, _>("total_questions").map_err(ser)?,
        )?,
        answers,
        row.try_get("completed_at").map_err(ser)?,
    )
    .map_err(ser)?;
    Ok((
        attempt_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        attempt,
    ))
}

pub(crate) fn map_resource_row(row: &SqliteRow) -> Result<Resource, StorageError> {
    let kind_label: ResourceType = label(row, "kind")?;
    let kind: ResourceKind =
        from_json("payload", &row.try_get::<String, _>("payload").map_err(ser)?)?;
    if kind.resource_type() != kind_label {
        return Err(StorageError::Serialization(format!(
            "payload is a {} but row is tagged {kind_label}",
            kind.resource_type()
        )));
    }

    let resource = Resource::new(
        resource_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        row.try_get::<String, _>("title").map_err(ser)?,
        row.try_get::<Option<String>, _>("description").map_err(ser)?,
        label::<Category>(row, "category")?,
        label::<Difficulty>(row, "difficulty")?,
        kind,
    )
    .map_err(ser)?;
    Ok(resource
        .with_xp_reward(opt_u32(row, "xp_reward")?)
        .with_duration_minutes(opt_u32(row, "duration_minutes")?))
}

pub(crate) fn map_meeting_row(row: &SqliteRow) -> Result<Meeting, StorageError> {
    let link: String = row.try_get("meeting_link").map_err(ser)?;
    let validated = ValidatedMeeting {
        title: row.try_get("title").map_err(ser)?,
        description: row.try_get("description").map_err(ser)?,
        teacher_name: row.try_get("teacher_name").map_err(ser)?,
        teacher_title: row.try_get("teacher_title").map_err(ser)?,
        date: row.try_get("date").map_err(ser)?,
        time: row.try_get("time").map_err(ser)?,
        duration_minutes: u32_from_i64(
            "duration_minutes",
            row.try_get::<i64, _>("duration_minutes").map_err(ser)?,
        )?,
        meeting_link: MeetingLink::parse(&link).map_err(ser)?,
        category: label::<Category>(row, "category")?,
        meeting_type: label::<MeetingType>(row, "meeting_type")?,
        recurring: label::<Recurrence>(row, "recurring")?,
    };
    Ok(validated.assign_id(meeting_id_from_i64(
        row.try_get::<i64, _>("id").map_err(ser)?,
    )?))
}

pub(crate) fn map_profile_row(row: &SqliteRow) -> Result<CurrentUser, StorageError> {
    Ok(CurrentUser {
        email: email(row)?,
        full_name: row.try_get("full_name").map_err(ser)?,
        theme: label::<Theme>(row, "theme")?,
    })
}
