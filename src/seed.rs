use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::store::{NewPost, PostStore};

/// Category pages the legacy site links to but the catalog never had.
const BUILTIN_CATEGORIES: &str = include_str!("../assets/seed_categories.json");

pub fn builtin_categories() -> Result<Vec<NewPost>> {
    serde_json::from_str(BUILTIN_CATEGORIES).context("Invalid bundled seed_categories.json")
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub created: usize,
    pub existing: usize,
    pub failed: usize,
}

/// Insert each post whose slug is not already present. Insert failures are
/// logged and counted; the rest of the list is still processed.
pub async fn seed_missing<S: PostStore>(store: &S, posts: &[NewPost]) -> Result<SeedReport> {
    let mut report = SeedReport::default();
    for post in posts {
        if let Some(id) = store
            .find_by_slug(&post.slug)
            .await
            .with_context(|| format!("Failed to look up {}", post.slug))?
        {
            info!(slug = %post.slug, %id, "Already exists");
            report.existing += 1;
            continue;
        }
        match store.insert_product(post).await {
            Ok(id) => {
                info!(slug = %post.slug, %id, "Created");
                report.created += 1;
            }
            Err(e) => {
                warn!(slug = %post.slug, "Insert failed: {}", e);
                report.failed += 1;
            }
        }
    }
    Ok(report)
}
