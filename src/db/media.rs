//! Media library CRUD.

use crate::error::DatabaseError;
use crate::{Error, Result};

use super::{Database, MediaRow};

impl Database {
    /// Register an attachment, returning its id
    pub async fn add_media(&self, url: &str, image_url: Option<&str>) -> Result<i64> {
        let now = chrono::Utc::now().timestamp();

        let result = sqlx::query("INSERT INTO media (url, image_url, created_at) VALUES (?, ?, ?)")
            .bind(url.trim())
            .bind(image_url.map(str::trim).filter(|u| !u.is_empty()))
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to insert media: {}",
                    e
                )))
            })?;

        Ok(result.last_insert_rowid())
    }

    /// Get an attachment by id
    pub async fn get_media(&self, id: i64) -> Result<Option<MediaRow>> {
        sqlx::query_as::<_, MediaRow>(
            "SELECT id, url, image_url, created_at FROM media WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to get media: {}",
                e
            )))
        })
    }

    /// Public URL of an attachment
    pub async fn media_url(&self, id: i64) -> Result<Option<String>> {
        Ok(self
            .get_media(id)
            .await?
            .map(|media| media.url)
            .filter(|url| !url.is_empty()))
    }

    /// Display URL of an image: its rendition when present, otherwise the attachment URL
    pub async fn media_image_url(&self, id: i64) -> Result<Option<String>> {
        Ok(self
            .get_media(id)
            .await?
            .map(|media| media.image_url.unwrap_or(media.url))
            .filter(|url| !url.is_empty()))
    }

    /// Delete an attachment, returning whether a row was removed
    pub async fn delete_media(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM media WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to delete media: {}",
                    e
                )))
            })?;

        Ok(result.rows_affected() > 0)
    }
}
