//! Data structures and types for vidshelf
//!
//! Contains the shared models used across the application organized by domain:
//! - **Catalog**: video and category records served by the repository
//! - **Updates**: typed field updates applied to a stored video
//! - **Feed**: wire format of the remote catalog feed

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// =============================================================================
// Catalog Models
// =============================================================================

/// A single playable video in the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoEntity {
    pub id: i64,
    pub category: String,
    pub title: String,
    pub description: String,
    pub video_url: String,
    pub card_image_url: String,
    pub bg_image_url: String,
    pub studio: String,
    #[serde(default)]
    pub rented: bool,
    #[serde(default)]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_local_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bg_image_local_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card_image_local_path: Option<String>,
}

impl VideoEntity {
    /// Case-insensitive match against title, description, category and studio.
    ///
    /// `needle` must already be lowercased.
    pub fn matches(&self, needle: &str) -> bool {
        [&self.title, &self.description, &self.category, &self.studio]
            .iter()
            .any(|field| field.to_lowercase().contains(needle))
    }

    /// Whether every asset has a local copy
    pub fn is_downloaded(&self) -> bool {
        self.video_local_path.is_some()
            && self.bg_image_local_path.is_some()
            && self.card_image_local_path.is_some()
    }

    /// Apply a typed field update in place
    pub fn apply(&mut self, field: VideoField) {
        match field {
            VideoField::VideoLocalPath(path) => self.video_local_path = Some(path),
            VideoField::BackgroundLocalPath(path) => self.bg_image_local_path = Some(path),
            VideoField::CardLocalPath(path) => self.card_image_local_path = Some(path),
            VideoField::Rented => self.rented = true,
            VideoField::Status(status) => self.status = status,
        }
    }
}

impl fmt::Display for VideoEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rented = if self.rented { " [rented]" } else { "" };
        write!(
            f,
            "#{} {} ({}) - {}{}",
            self.id, self.title, self.category, self.studio, rented
        )
    }
}

/// A browsable category row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryEntity {
    pub id: i64,
    pub name: String,
    pub bg_image_url: String,
}

impl fmt::Display for CategoryEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

// =============================================================================
// Update Models
// =============================================================================

/// A single field write applied to a stored video
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum VideoField {
    /// Path of the downloaded video file
    VideoLocalPath(String),
    /// Path of the downloaded background image
    BackgroundLocalPath(String),
    /// Path of the downloaded card image
    CardLocalPath(String),
    /// Mark the video as rented
    Rented,
    /// Free-form download/playback status
    Status(String),
}

/// Rejected stringly-typed field update
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VideoFieldError {
    #[error("Unknown field kind: {0} (expected video, background, card, rental or status)")]
    UnknownKind(String),

    #[error("Field kind {0} requires a value")]
    MissingValue(&'static str),
}

impl VideoField {
    /// Parse a `kind` / `value` pair as given on the command line
    pub fn parse(kind: &str, value: Option<&str>) -> Result<Self, VideoFieldError> {
        let required = |name: &'static str| {
            value
                .map(str::to_string)
                .ok_or(VideoFieldError::MissingValue(name))
        };

        match kind.to_lowercase().as_str() {
            "video" => Ok(VideoField::VideoLocalPath(required("video")?)),
            "background" => Ok(VideoField::BackgroundLocalPath(required("background")?)),
            "card" => Ok(VideoField::CardLocalPath(required("card")?)),
            "rental" => Ok(VideoField::Rented),
            "status" => Ok(VideoField::Status(required("status")?)),
            _ => Err(VideoFieldError::UnknownKind(kind.to_string())),
        }
    }
}

impl fmt::Display for VideoField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VideoField::VideoLocalPath(p) => write!(f, "video -> {}", p),
            VideoField::BackgroundLocalPath(p) => write!(f, "background -> {}", p),
            VideoField::CardLocalPath(p) => write!(f, "card -> {}", p),
            VideoField::Rented => write!(f, "rental"),
            VideoField::Status(s) => write!(f, "status -> {}", s),
        }
    }
}

// =============================================================================
// Feed Models
// =============================================================================

/// Root of the catalog feed document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Feed {
    #[serde(rename = "googlevideos", default)]
    pub rows: Vec<FeedRow>,
}

/// One category row in the feed
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeedRow {
    pub category: String,
    #[serde(default)]
    pub videos: Vec<FeedVideo>,
}

/// One video entry in the feed
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeedVideo {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub studio: String,
    #[serde(default)]
    pub sources: Vec<String>,
    #[serde(default)]
    pub card: String,
    #[serde(default)]
    pub background: String,
}

impl FeedVideo {
    /// Build an entity; the catalog assigns the real id
    pub fn into_entity(self, id: i64, category: &str) -> VideoEntity {
        VideoEntity {
            id,
            category: category.to_string(),
            title: self.title,
            description: self.description,
            video_url: self.sources.into_iter().next().unwrap_or_default(),
            card_image_url: self.card,
            bg_image_url: self.background,
            studio: self.studio,
            rented: false,
            status: String::new(),
            video_local_path: None,
            bg_image_local_path: None,
            card_image_local_path: None,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
