//! Playlist repository trait and implementation

use crate::error::{LibraryError, Result};
use crate::models::{Playlist, PlaylistId};
use async_trait::async_trait;
use bridge_traits::time::{Clock, SystemClock};
use sqlx::{query, query_as, SqlitePool};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Playlist repository interface for data access operations
#[async_trait]
pub trait PlaylistRepository: Send + Sync {
    /// Persist a new playlist holding `items` in order.
    ///
    /// The write is atomic: either the playlist and all of its items are
    /// stored, or nothing is.
    ///
    /// # Errors
    /// Returns error if:
    /// - The name is blank or an item is an empty string
    /// - Database error occurs
    async fn insert_playlist(&self, name: &str, items: &[String]) -> Result<Playlist>;

    /// Find a playlist by its ID
    ///
    /// # Returns
    /// - `Ok(Some(playlist))` if found
    /// - `Ok(None)` if not found
    /// - `Err` if database error occurs
    async fn find_by_id(&self, id: &PlaylistId) -> Result<Option<Playlist>>;

    /// Encoded media identifiers of a playlist, in order.
    async fn item_ids(&self, id: &PlaylistId) -> Result<Vec<String>>;

    /// Delete a playlist by ID
    ///
    /// # Returns
    /// - `Ok(true)` if playlist was deleted
    /// - `Ok(false)` if playlist was not found
    async fn delete(&self, id: &PlaylistId) -> Result<bool>;

    /// Count total playlists
    async fn count(&self) -> Result<i64>;
}

/// SQLite implementation of PlaylistRepository
pub struct SqlitePlaylistRepository {
    pool: SqlitePool,
    clock: Arc<dyn Clock>,
}

impl SqlitePlaylistRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self::with_clock(pool, Arc::new(SystemClock))
    }

    /// Use `clock` for `created_at` timestamps.
    pub fn with_clock(pool: SqlitePool, clock: Arc<dyn Clock>) -> Self {
        Self { pool, clock }
    }
}

#[async_trait]
impl PlaylistRepository for SqlitePlaylistRepository {
    #[instrument(skip(self, items), fields(item_count = items.len()))]
    async fn insert_playlist(&self, name: &str, items: &[String]) -> Result<Playlist> {
        let playlist = Playlist::new(
            name.trim(),
            items.to_vec(),
            self.clock.unix_timestamp(),
        );
        playlist
            .validate()
            .map_err(|e| LibraryError::InvalidInput {
                field: "Playlist".to_string(),
                message: e,
            })?;

        let id = playlist.identifier();
        let mut tx = self.pool.begin().await?;

        query("INSERT INTO playlists (id, name, created_at) VALUES (?, ?, ?)")
            .bind(&id)
            .bind(&playlist.name)
            .bind(playlist.created_at)
            .execute(&mut *tx)
            .await?;

        for (position, media_id) in playlist.items.iter().enumerate() {
            query("INSERT INTO playlist_items (playlist_id, position, media_id) VALUES (?, ?, ?)")
                .bind(&id)
                .bind(position as i64)
                .bind(media_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        debug!(playlist_id = %id, "Playlist stored");
        Ok(playlist)
    }

    async fn find_by_id(&self, id: &PlaylistId) -> Result<Option<Playlist>> {
        let row = query_as::<_, (String, String, i64)>(
            "SELECT id, name, created_at FROM playlists WHERE id = ?",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        let Some((raw_id, name, created_at)) = row else {
            return Ok(None);
        };

        let id = PlaylistId::from_string(&raw_id).map_err(|e| LibraryError::InvalidInput {
            field: "id".to_string(),
            message: e.to_string(),
        })?;
        let items = self.item_ids(&id).await?;

        Ok(Some(Playlist {
            id,
            name,
            items,
            created_at,
        }))
    }

    async fn item_ids(&self, id: &PlaylistId) -> Result<Vec<String>> {
        let items = query_as::<_, (String,)>(
            "SELECT media_id FROM playlist_items WHERE playlist_id = ? ORDER BY position ASC",
        )
        .bind(id.to_string())
        .fetch_all(&self.pool)
        .await
        .map(|rows| rows.into_iter().map(|(media_id,)| media_id).collect())?;

        Ok(items)
    }

    async fn delete(&self, id: &PlaylistId) -> Result<bool> {
        let result = query("DELETE FROM playlists WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn count(&self) -> Result<i64> {
        let count: i64 = query_as("SELECT COUNT(*) as count FROM playlists")
            .fetch_one(&self.pool)
            .await
            .map(|row: (i64,)| row.0)?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_test_pool;
    use bridge_traits::time::FixedClock;

    async fn setup_repo() -> SqlitePlaylistRepository {
        let pool = create_test_pool().await.unwrap();
        SqlitePlaylistRepository::with_clock(pool, Arc::new(FixedClock::at_unix(1_700_000_000)))
    }

    fn items(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|id| id.to_string()).collect()
    }

    #[tokio::test]
    async fn test_insert_and_find_playlist() {
        let repo = setup_repo().await;

        let created = repo
            .insert_playlist("  Road trip ", &items(&["track:a", "track:b", "track:c"]))
            .await
            .unwrap();
        assert_eq!(created.name, "Road trip");
        assert_eq!(created.created_at, 1_700_000_000);

        let found = repo.find_by_id(&created.id).await.unwrap().unwrap();
        assert_eq!(found, created);
    }

    #[tokio::test]
    async fn test_items_keep_queue_order_and_duplicates() {
        let repo = setup_repo().await;

        let queue = items(&["track:z", "track:a", "track:z"]);
        let created = repo.insert_playlist("Dupes", &queue).await.unwrap();

        assert_eq!(repo.item_ids(&created.id).await.unwrap(), queue);
    }

    #[tokio::test]
    async fn test_repeated_inserts_create_distinct_playlists() {
        let repo = setup_repo().await;
        let queue = items(&["track:1"]);

        let first = repo.insert_playlist("Same", &queue).await.unwrap();
        let second = repo.insert_playlist("Same", &queue).await.unwrap();

        assert_ne!(first.id, second.id);
        assert_eq!(repo.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_delete_cascades_items() {
        let repo = setup_repo().await;
        let created = repo
            .insert_playlist("Temp", &items(&["track:1", "track:2"]))
            .await
            .unwrap();

        assert!(repo.delete(&created.id).await.unwrap());
        assert!(!repo.delete(&created.id).await.unwrap());
        assert!(repo.find_by_id(&created.id).await.unwrap().is_none());
        assert!(repo.item_ids(&created.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_find_missing_playlist() {
        let repo = setup_repo().await;
        assert!(repo.find_by_id(&PlaylistId::new()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_playlist_validation() {
        let repo = setup_repo().await;

        let result = repo.insert_playlist("   ", &items(&["track:1"])).await;
        assert!(matches!(result, Err(LibraryError::InvalidInput { .. })));

        let result = repo.insert_playlist("Gaps", &items(&["track:1", ""])).await;
        assert!(result.is_err());
        assert_eq!(repo.count().await.unwrap(), 0);
    }
}
