//! Videos view model
//!
//! Connects three caller-controlled inputs (search text, selected video id,
//! selected category) to live repository lookups. Each input drives one
//! switch-mapped [`DerivedStream`]; the category list is bound straight to the
//! repository.

use std::sync::Arc;

use tracing::warn;

use crate::live::{DerivedStream, InputSlot, StreamBinding};
use crate::models::{CategoryEntity, VideoEntity, VideoField};
use crate::repository::{RepositoryError, VideoRepository};

/// Query-driven view of the video catalog
///
/// Must be constructed inside a Tokio runtime. Dropping the view model stops
/// all of its background subscriptions.
pub struct VideosViewModel {
    repository: Arc<dyn VideoRepository>,

    // Inputs, mutated through the setters
    query: InputSlot<String>,
    video_id: InputSlot<i64>,
    category: InputSlot<String>,

    // Outputs
    search_results: DerivedStream<Vec<VideoEntity>>,
    video_by_id: DerivedStream<Option<VideoEntity>>,
    videos_in_category: DerivedStream<Vec<VideoEntity>>,
    all_categories: DerivedStream<Vec<CategoryEntity>>,

    _bindings: Vec<StreamBinding>,
}

impl std::fmt::Debug for VideosViewModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VideosViewModel")
            .field("query", &self.query.get())
            .field("video_id", &self.video_id.get())
            .field("category", &self.category.get())
            .finish_non_exhaustive()
    }
}

impl VideosViewModel {
    pub fn new(repository: Arc<dyn VideoRepository>) -> Self {
        let query = InputSlot::new("query");
        let video_id = InputSlot::new("video_id");
        let category = InputSlot::new("category");

        let repo = Arc::clone(&repository);
        let (search_results, search_binding) =
            query.switch_map("search_results", move |text: String| repo.search(&text));

        let repo = Arc::clone(&repository);
        let (video_by_id, video_binding) =
            video_id.switch_map("video_by_id", move |id: i64| repo.video_by_id(id));

        let repo = Arc::clone(&repository);
        let (videos_in_category, category_binding) = category
            .switch_map("videos_in_category", move |name: String| {
                repo.videos_in_category(&name)
            });

        let (all_categories, categories_binding) =
            DerivedStream::constant("all_categories", repository.all_categories());

        Self {
            repository,
            query,
            video_id,
            category,
            search_results,
            video_by_id,
            videos_in_category,
            all_categories,
            _bindings: vec![
                search_binding,
                video_binding,
                category_binding,
                categories_binding,
            ],
        }
    }

    // -------------------------------------------------------------------------
    // Inputs
    // -------------------------------------------------------------------------

    /// Set the search text; returns `false` if it was already current
    pub fn set_query(&self, text: impl Into<String>) -> bool {
        self.query.set(text.into())
    }

    /// Select a video; returns `false` if it was already selected
    pub fn set_video_id(&self, id: i64) -> bool {
        self.video_id.set(id)
    }

    /// Select a category; returns `false` if it was already selected
    pub fn set_category(&self, name: impl Into<String>) -> bool {
        self.category.set(name.into())
    }

    pub fn query(&self) -> Option<String> {
        self.query.get()
    }

    pub fn video_id(&self) -> Option<i64> {
        self.video_id.get()
    }

    pub fn category(&self) -> Option<String> {
        self.category.get()
    }

    // -------------------------------------------------------------------------
    // Outputs
    // -------------------------------------------------------------------------

    pub fn search_results(&self) -> DerivedStream<Vec<VideoEntity>> {
        self.search_results.clone()
    }

    pub fn video_by_id(&self) -> DerivedStream<Option<VideoEntity>> {
        self.video_by_id.clone()
    }

    pub fn videos_in_category(&self) -> DerivedStream<Vec<VideoEntity>> {
        self.videos_in_category.clone()
    }

    pub fn all_categories(&self) -> DerivedStream<Vec<CategoryEntity>> {
        self.all_categories.clone()
    }

    // -------------------------------------------------------------------------
    // Writes
    // -------------------------------------------------------------------------

    /// Write one field of `video` through the repository.
    ///
    /// Live streams pick the change up on their own.
    pub async fn update_video(
        &self,
        video: &VideoEntity,
        field: VideoField,
    ) -> Result<VideoEntity, RepositoryError> {
        let result = self.repository.update(video, field).await;
        if let Err(e) = &result {
            warn!(id = video.id, error = %e, "video update failed");
        }
        result
    }
}
