//! vidshelf - live video catalog browser
//!
//! A view model over a video catalog whose outputs are live streams,
//! recomputed whenever the caller changes the search text, the selected
//! video or the selected category.
//!
//! # Modules
//!
//! - `models` - Video, category, field update and feed types
//! - `repository` - Live data access contract
//! - `live` - Input slots and switch-mapped derived streams
//! - `catalog` - Feed loader and in-memory live repository
//! - `viewmodel` - The videos view model
//! - `config`, `logging`, `cli`, `commands` - Command line front end

pub mod catalog;
pub mod cli;
pub mod commands;
pub mod config;
pub mod live;
pub mod logging;
pub mod models;
pub mod repository;
pub mod viewmodel;

// Re-export commonly used types
pub use catalog::{CatalogRepository, FeedClient, FeedError};
pub use live::{DerivedStream, InputSlot, Snapshot, StreamBinding};
pub use models::{CategoryEntity, Feed, VideoEntity, VideoField};
pub use repository::{LiveQuery, RepositoryError, VideoRepository};
pub use viewmodel::VideosViewModel;
