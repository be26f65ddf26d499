use std::collections::BTreeMap;

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info, warn};

use crate::documents::DocumentLibrary;
use crate::error::ItemError;
use crate::parser::ContentContainer;
use crate::store::{CatalogEntry, PostStore, ProductQuery, StoreError};

const PROGRESS_EVERY: usize = 20;

pub struct ItemFailure {
    pub slug: String,
    pub error: ItemError,
}

/// Outcome of one pass over the catalog.
#[derive(Default)]
pub struct MigrationReport {
    pub success: usize,
    pub failed: usize,
    pub failures: Vec<ItemFailure>,
}

impl MigrationReport {
    pub fn total(&self) -> usize {
        self.success + self.failed
    }

    /// Failure count per error kind, in stable order.
    pub fn failure_kinds(&self) -> BTreeMap<&'static str, usize> {
        let mut kinds = BTreeMap::new();
        for f in &self.failures {
            *kinds.entry(f.error.kind()).or_insert(0) += 1;
        }
        kinds
    }
}

/// Convert every listed product page into blocks and store them.
///
/// Only the catalog listing can fail the run; anything that goes wrong for a
/// single entry is logged and tallied, and the loop moves on.
pub async fn migrate_all<S: PostStore>(
    store: &S,
    library: &DocumentLibrary,
    container: &ContentContainer,
    query: &ProductQuery,
) -> Result<MigrationReport, StoreError> {
    let entries = store.list_products(query).await?;
    let total = entries.len();
    info!(total, root = %library.root().display(), "Migrating products");

    let pb = ProgressBar::new(total as u64);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("[{elapsed_precise}] {bar:40} {pos}/{len} ({per_sec}, eta {eta})")
    {
        pb.set_style(style.progress_chars("=> "));
    }

    let mut report = MigrationReport::default();
    for (i, entry) in entries.iter().enumerate() {
        match migrate_one(store, library, container, entry).await {
            Ok(blocks) => {
                debug!(slug = %entry.slug, blocks, "Migrated");
                report.success += 1;
            }
            Err(error) => {
                warn!(slug = %entry.slug, kind = error.kind(), "{}", error);
                report.failed += 1;
                report.failures.push(ItemFailure {
                    slug: entry.slug.clone(),
                    error,
                });
            }
        }
        pb.inc(1);

        let done = i + 1;
        if done % PROGRESS_EVERY == 0 && done < total {
            pb.suspend(|| {
                info!(done, total, success = report.success, failed = report.failed, "Progress")
            });
        }
    }
    pb.finish_and_clear();

    info!(success = report.success, failed = report.failed, "Migration finished");
    Ok(report)
}

async fn migrate_one<S: PostStore>(
    store: &S,
    library: &DocumentLibrary,
    container: &ContentContainer,
    entry: &CatalogEntry,
) -> Result<usize, ItemError> {
    let html = library.read(&entry.slug)?;
    let blocks = container
        .extract(&html)
        .ok_or_else(|| ItemError::ContainerNotFound {
            selector: container.css().to_string(),
        })?;
    if blocks.is_empty() {
        return Err(ItemError::EmptyExtraction);
    }
    store.update_structured_content(&entry.id, &blocks).await?;
    Ok(blocks.len())
}
