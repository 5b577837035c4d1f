//! Repository contract consumed by the view model
//!
//! Every lookup returns a [`LiveQuery`]: a stream that yields the current
//! result and then a fresh result whenever the underlying data changes.

use async_trait::async_trait;
use futures::stream::BoxStream;
use thiserror::Error;

use crate::models::{CategoryEntity, VideoEntity, VideoField};

/// Repository error types
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("Video not found: {0}")]
    NotFound(i64),

    #[error("Repository unavailable: {0}")]
    Unavailable(String),

    #[error("Repository closed")]
    Closed,
}

/// Observable result of a repository lookup
pub type LiveQuery<T> = BoxStream<'static, Result<T, RepositoryError>>;

/// Data access for the video catalog
#[async_trait]
pub trait VideoRepository: Send + Sync + 'static {
    /// Videos matching a free-text query
    fn search(&self, query: &str) -> LiveQuery<Vec<VideoEntity>>;

    /// A single video, `None` when the id is unknown
    fn video_by_id(&self, id: i64) -> LiveQuery<Option<VideoEntity>>;

    /// Videos sharing a category
    fn videos_in_category(&self, category: &str) -> LiveQuery<Vec<VideoEntity>>;

    /// Every category in the catalog
    fn all_categories(&self) -> LiveQuery<Vec<CategoryEntity>>;

    /// Write one field of a stored video and return the updated record
    async fn update(
        &self,
        video: &VideoEntity,
        field: VideoField,
    ) -> Result<VideoEntity, RepositoryError>;
}
