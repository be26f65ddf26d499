pub mod rest;
pub mod sqlite;

use std::fmt;
use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use crate::parser::blocks::Block;

pub use rest::RestStore;
pub use sqlite::SqliteStore;

/// Store-assigned identifier. Kept opaque: SQLite hands out hex strings,
/// PostgREST may return integers or uuids.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct PostId(String);

impl PostId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PostId {
    fn from(s: &str) -> Self {
        PostId(s.to_string())
    }
}

impl From<String> for PostId {
    fn from(s: String) -> Self {
        PostId(s)
    }
}

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for PostId {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Text(String),
            Number(i64),
        }
        Ok(match RawId::deserialize(d)? {
            RawId::Text(s) => PostId(s),
            RawId::Number(n) => PostId(n.to_string()),
        })
    }
}

/// Listing projection of a `post` row of type `product`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CatalogEntry {
    pub id: PostId,
    pub slug: String,
    pub title: String,
}

/// A product that already carries `structured_content`, kept as raw JSON so
/// rows written by older tooling can still be inspected.
#[derive(Debug, Clone, Deserialize)]
pub struct MigratedPost {
    pub slug: String,
    pub title: String,
    pub structured_content: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPost {
    pub title: String,
    pub slug: String,
    pub content: String,
    pub meta_description: String,
}

#[derive(Debug, Clone, Default)]
pub struct ProductQuery {
    pub slug: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProductCounts {
    pub total: usize,
    pub migrated: usize,
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Store rejected request ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("No post with id {0}")]
    NotFound(PostId),

    #[error("Failed to create {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// The `post` entity operations the pipeline relies on. Every call is scoped
/// to the company the store was opened for and to `type = 'product'`.
#[async_trait]
pub trait PostStore: Send + Sync {
    async fn list_products(&self, query: &ProductQuery) -> Result<Vec<CatalogEntry>, StoreError>;

    /// Replace `structured_content` as a single write.
    async fn update_structured_content(
        &self,
        id: &PostId,
        blocks: &[Block],
    ) -> Result<(), StoreError>;

    /// Returns how many rows were removed.
    async fn delete_posts(&self, ids: &[PostId]) -> Result<usize, StoreError>;

    async fn find_by_slug(&self, slug: &str) -> Result<Option<PostId>, StoreError>;

    async fn insert_product(&self, post: &NewPost) -> Result<PostId, StoreError>;

    async fn migrated_sample(&self) -> Result<Option<MigratedPost>, StoreError>;

    async fn counts(&self) -> Result<ProductCounts, StoreError>;
}
