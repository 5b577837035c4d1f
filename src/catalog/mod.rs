//! Video catalog sources
//!
//! - Feed: remote/local catalog feed loader
//! - Store: in-memory live repository built from a feed

pub mod feed;
pub mod store;

pub use feed::{FeedClient, FeedError};
pub use store::CatalogRepository;
