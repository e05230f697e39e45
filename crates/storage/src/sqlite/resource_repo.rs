use epsilon_core::model::{Resource, ResourceId};

use super::SqliteRepository;
use super::mapping::{db, id_to_i64, map_resource_row, to_json};
use crate::repository::{ResourceRepository, StorageError};

const RESOURCE_COLUMNS: &str = r"
    id, title, description, category, difficulty, xp_reward, duration_minutes, kind, payload
";

#[async_trait::async_trait]
impl ResourceRepository for SqliteRepository {
    async fn upsert_resource(&self, resource: &Resource) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO resources (
                id, title, description, category, difficulty, xp_reward, duration_minutes,
                kind, payload
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                description = excluded.description,
                category = excluded.category,
                difficulty = excluded.difficulty,
                xp_reward = excluded.xp_reward,
                duration_minutes = excluded.duration_minutes,
                kind = excluded.kind,
                payload = excluded.payload
            ",
        )
        .bind(id_to_i64("resource_id", resource.id().value())?)
        .bind(resource.title())
        .bind(resource.description())
        .bind(resource.category().as_str())
        .bind(resource.difficulty().as_str())
        .bind(resource.configured_xp_reward().map(i64::from))
        .bind(resource.duration_minutes().map(i64::from))
        .bind(resource.resource_type().as_str())
        .bind(to_json(resource.kind())?)
        .execute(&self.pool)
        .await
        .map_err(db)?;

        Ok(())
    }

    async fn get_resource(&self, id: ResourceId) -> Result<Resource, StorageError> {
        let sql = format!("SELECT {RESOURCE_COLUMNS} FROM resources WHERE id = ?1");
        let row = sqlx::query(&sql)
            .bind(id_to_i64("resource_id", id.value())?)
            .fetch_optional(&self.pool)
            .await
            .map_err(db)?
            .ok_or(StorageError::NotFound)?;

        map_resource_row(&row)
    }

    async fn list_resources(&self) -> Result<Vec<Resource>, StorageError> {
        let sql = format!("SELECT {RESOURCE_COLUMNS} FROM resources ORDER BY id ASC");
        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(db)?;

        rows.iter().map(map_resource_row).collect()
    }
}
