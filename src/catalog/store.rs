//! In-memory live catalog
//!
//! Entities live behind an `RwLock`. Every write bumps a revision published
//! on a `watch` channel, and every live query re-evaluates itself on each
//! revision, so open subscriptions see writes without polling.

use std::sync::{Arc, RwLock, RwLockReadGuard};

use async_trait::async_trait;
use futures::StreamExt;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;
use tracing::{debug, info};

use crate::models::{CategoryEntity, Feed, VideoEntity, VideoField};
use crate::repository::{LiveQuery, RepositoryError, VideoRepository};

#[derive(Debug, Default)]
struct CatalogData {
    videos: Vec<VideoEntity>,
    categories: Vec<CategoryEntity>,
}

/// Live in-memory implementation of [`VideoRepository`]
#[derive(Debug, Clone)]
pub struct CatalogRepository {
    data: Arc<RwLock<CatalogData>>,
    revision: Arc<watch::Sender<u64>>,
}

impl CatalogRepository {
    /// Build a catalog from videos in display order.
    ///
    /// Categories are derived in first-seen order; each takes the background
    /// of its first video.
    pub fn from_videos(videos: Vec<VideoEntity>) -> Self {
        let mut categories: Vec<CategoryEntity> = Vec::new();
        for video in &videos {
            if !categories.iter().any(|c| c.name == video.category) {
                categories.push(CategoryEntity {
                    id: categories.len() as i64 + 1,
                    name: video.category.clone(),
                    bg_image_url: video.bg_image_url.clone(),
                });
            }
        }

        debug!(
            videos = videos.len(),
            categories = categories.len(),
            "catalog built"
        );

        let (revision, _rx) = watch::channel(0);
        Self {
            data: Arc::new(RwLock::new(CatalogData { videos, categories })),
            revision: Arc::new(revision),
        }
    }

    /// Build a catalog from a parsed feed, assigning ids from 1 in feed order
    pub fn from_feed(feed: Feed) -> Self {
        let mut videos = Vec::new();
        for row in feed.rows {
            for video in row.videos {
                let id = videos.len() as i64 + 1;
                videos.push(video.into_entity(id, &row.category));
            }
        }
        Self::from_videos(videos)
    }

    pub fn len(&self) -> usize {
        self.read().map(|d| d.videos.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of writes applied so far
    pub fn revision(&self) -> u64 {
        *self.revision.borrow()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, CatalogData>, RepositoryError> {
        self.data
            .read()
            .map_err(|_| RepositoryError::Unavailable("catalog lock poisoned".into()))
    }

    /// Re-run `query` now and after every subsequent write
    fn live<T, F>(&self, query: F) -> LiveQuery<T>
    where
        T: Send + 'static,
        F: Fn(&CatalogData) -> T + Send + 'static,
    {
        let data = Arc::clone(&self.data);
        WatchStream::new(self.revision.subscribe())
            .map(move |_revision| -> Result<T, RepositoryError> {
                let guard = data
                    .read()
                    .map_err(|_| RepositoryError::Unavailable("catalog lock poisoned".into()))?;
                Ok(query(&*guard))
            })
            .boxed()
    }
}

#[async_trait]
impl VideoRepository for CatalogRepository {
    fn search(&self, query: &str) -> LiveQuery<Vec<VideoEntity>> {
        let needle = query.trim().to_lowercase();
        self.live(move |data| {
            if needle.is_empty() {
                return Vec::new();
            }
            data.videos
                .iter()
                .filter(|v| v.matches(&needle))
                .cloned()
                .collect()
        })
    }

    fn video_by_id(&self, id: i64) -> LiveQuery<Option<VideoEntity>> {
        self.live(move |data| data.videos.iter().find(|v| v.id == id).cloned())
    }

    fn videos_in_category(&self, category: &str) -> LiveQuery<Vec<VideoEntity>> {
        let category = category.to_string();
        self.live(move |data| {
            data.videos
                .iter()
                .filter(|v| v.category == category)
                .cloned()
                .collect()
        })
    }

    fn all_categories(&self) -> LiveQuery<Vec<CategoryEntity>> {
        self.live(|data| data.categories.clone())
    }

    async fn update(
        &self,
        video: &VideoEntity,
        field: VideoField,
    ) -> Result<VideoEntity, RepositoryError> {
        let updated = {
            let mut data = self
                .data
                .write()
                .map_err(|_| RepositoryError::Unavailable("catalog lock poisoned".into()))?;
            let stored = data
                .videos
                .iter_mut()
                .find(|v| v.id == video.id)
                .ok_or(RepositoryError::NotFound(video.id))?;
            info!(id = stored.id, update = %field, "updating video");
            stored.apply(field);
            stored.clone()
        };

        self.revision.send_modify(|revision| *revision += 1);
        Ok(updated)
    }
}
