use std::collections::{BTreeMap, BTreeSet};

use tracing::{info, warn};

use crate::store::{CatalogEntry, PostId, PostStore};

/// Country suffixes appended to regional copies of a product slug.
pub const REGION_SUFFIXES: [&str; 6] = [
    "-uae",
    "-bahrain",
    "-kuwait",
    "-oman",
    "-qatar",
    "-saudi-arabia",
];

/// Slug with its region suffix removed, if any. At most one suffix is
/// stripped, checked in table order.
pub fn canonical_identity(slug: &str) -> &str {
    REGION_SUFFIXES
        .iter()
        .find_map(|suffix| slug.strip_suffix(suffix))
        .unwrap_or(slug)
}

fn has_region_suffix(slug: &str) -> bool {
    canonical_identity(slug).len() != slug.len()
}

fn group_by_identity(entries: &[CatalogEntry]) -> BTreeMap<&str, Vec<&CatalogEntry>> {
    let mut groups: BTreeMap<&str, Vec<&CatalogEntry>> = BTreeMap::new();
    for entry in entries {
        groups
            .entry(canonical_identity(&entry.slug))
            .or_default()
            .push(entry);
    }
    groups
}

/// Ids of regional duplicates to remove. Only groups with more than one
/// member are touched, and an unsuffixed member is never selected.
pub fn plan_deletions(entries: &[CatalogEntry]) -> BTreeSet<PostId> {
    group_by_identity(entries)
        .into_values()
        .filter(|members| members.len() > 1)
        .flatten()
        .filter(|e| has_region_suffix(&e.slug))
        .map(|e| e.id.clone())
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateGroup {
    pub identity: String,
    pub slugs: Vec<String>,
}

#[derive(Debug, Default)]
pub struct DuplicateReport {
    pub groups: Vec<DuplicateGroup>,
    /// Records beyond the first in each group.
    pub surplus: usize,
}

impl DuplicateReport {
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }
}

pub fn diagnose(entries: &[CatalogEntry]) -> DuplicateReport {
    let mut report = DuplicateReport::default();
    for (identity, members) in group_by_identity(entries) {
        if members.len() < 2 {
            continue;
        }
        let mut slugs: Vec<String> = members.iter().map(|e| e.slug.clone()).collect();
        slugs.sort();
        report.surplus += slugs.len() - 1;
        report.groups.push(DuplicateGroup {
            identity: identity.to_string(),
            slugs,
        });
    }
    report
}

#[derive(Debug)]
pub struct BatchOutcome {
    pub batch: usize,
    pub requested: usize,
    pub result: Result<usize, String>,
}

impl BatchOutcome {
    pub fn deleted(&self) -> usize {
        self.result.as_ref().copied().unwrap_or(0)
    }
}

/// Delete `ids` in chunks of `chunk_size`. A failed chunk is reported and
/// the remaining chunks still run.
pub async fn execute_deletions<S: PostStore>(
    store: &S,
    ids: &BTreeSet<PostId>,
    chunk_size: usize,
) -> Vec<BatchOutcome> {
    let ids: Vec<PostId> = ids.iter().cloned().collect();
    let mut outcomes = Vec::new();
    for (i, chunk) in ids.chunks(chunk_size.max(1)).enumerate() {
        let batch = i + 1;
        let result = match store.delete_posts(chunk).await {
            Ok(n) => {
                info!(batch, deleted = n, "Deleted batch");
                Ok(n)
            }
            Err(e) => {
                warn!(batch, size = chunk.len(), "Batch delete failed: {}", e);
                Err(e.to_string())
            }
        };
        outcomes.push(BatchOutcome {
            batch,
            requested: chunk.len(),
            result,
        });
    }
    outcomes
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use crate::store::{NewPost, ProductQuery, SqliteStore, StoreError};

    fn entries(slugs: &[&str]) -> Vec<CatalogEntry> {
        slugs
            .iter()
            .enumerate()
            .map(|(i, slug)| CatalogEntry {
                id: PostId::from(i.to_string()),
                slug: slug.to_string(),
                title: slug.to_string(),
            })
            .collect()
    }

    fn ids(raw: &[&str]) -> BTreeSet<PostId> {
        raw.iter().map(|s| PostId::from(*s)).collect()
    }

    #[test]
    fn strips_one_known_suffix() {
        assert_eq!(canonical_identity("widget-uae"), "widget");
        assert_eq!(canonical_identity("widget-saudi-arabia"), "widget");
        assert_eq!(canonical_identity("widget"), "widget");
        assert_eq!(canonical_identity("widget-oman-uae"), "widget-oman");
        assert_eq!(canonical_identity("widget-india"), "widget-india");
    }

    #[test]
    fn keeps_unsuffixed_member() {
        let plan = plan_deletions(&entries(&["widget-uae", "widget-bahrain", "widget"]));
        assert_eq!(plan, ids(&["0", "1"]));
    }

    #[test]
    fn group_without_base_loses_all_suffixed() {
        let plan = plan_deletions(&entries(&["widget-uae", "widget-bahrain"]));
        assert_eq!(plan, ids(&["0", "1"]));
    }

    #[test]
    fn lone_regional_entry_survives() {
        let plan = plan_deletions(&entries(&["gadget-qatar", "widget"]));
        assert!(plan.is_empty());
    }

    #[test]
    fn diagnose_reports_groups_and_surplus() {
        let report = diagnose(&entries(&[
            "widget-uae", "widget", "widget-oman", "gadget", "gizmo-kuwait", "gizmo",
        ]));
        assert_eq!(report.group_count(), 2);
        assert_eq!(report.surplus, 3);
        assert_eq!(report.groups[0].identity, "gizmo");
        assert_eq!(report.groups[1].slugs, vec!["widget", "widget-oman", "widget-uae"]);
    }

    #[tokio::test]
    async fn cleanup_is_idempotent() {
        let store = SqliteStore::open_in_memory("acme").unwrap();
        for slug in ["widget", "widget-uae", "widget-bahrain", "gadget"] {
            let post = NewPost {
                title: slug.into(),
                slug: slug.into(),
                content: String::new(),
                meta_description: String::new(),
            };
            store.insert_product(&post).await.unwrap();
        }

        let listed = store.list_products(&ProductQuery::default()).await.unwrap();
        let plan = plan_deletions(&listed);
        let outcomes = execute_deletions(&store, &plan, 1).await;
        assert_eq!(outcomes.len(), 2);
        assert_eq!(outcomes.iter().map(BatchOutcome::deleted).sum::<usize>(), 2);

        let after = store.list_products(&ProductQuery::default()).await.unwrap();
        let slugs: Vec<_> = after.iter().map(|e| e.slug.as_str()).collect();
        assert_eq!(slugs, vec!["gadget", "widget"]);
        assert!(plan_deletions(&after).is_empty());
    }

    /// Rejects any batch containing id "3".
    struct FlakyStore;

    #[async_trait]
    impl PostStore for FlakyStore {
        async fn list_products(&self, _: &ProductQuery) -> Result<Vec<CatalogEntry>, StoreError> {
            Ok(Vec::new())
        }
        async fn update_structured_content(
            &self,
            _: &PostId,
            _: &[crate::parser::blocks::Block],
        ) -> Result<(), StoreError> {
            Ok(())
        }
        async fn delete_posts(&self, ids: &[PostId]) -> Result<usize, StoreError> {
            if ids.iter().any(|id| id.as_str() == "3") {
                return Err(StoreError::Api { status: 500, body: "boom".into() });
            }
            Ok(ids.len())
        }
        async fn find_by_slug(&self, _: &str) -> Result<Option<PostId>, StoreError> {
            Ok(None)
        }
        async fn insert_product(&self, p: &NewPost) -> Result<PostId, StoreError> {
            Ok(PostId::from(p.slug.as_str()))
        }
        async fn migrated_sample(&self) -> Result<Option<crate::store::MigratedPost>, StoreError> {
            Ok(None)
        }
        async fn counts(&self) -> Result<crate::store::ProductCounts, StoreError> {
            Ok(crate::store::ProductCounts { total: 0, migrated: 0 })
        }
    }

    #[tokio::test]
    async fn failed_batch_does_not_stop_later_ones() {
        let outcomes = execute_deletions(&FlakyStore, &ids(&["1", "2", "3", "4", "5"]), 2).await;
        assert_eq!(outcomes.len(), 3);
        assert_eq!(outcomes[0].result, Ok(2));
        assert!(outcomes[1].result.is_err());
        assert_eq!(outcomes[1].requested, 2);
        assert_eq!(outcomes[2].result, Ok(1));
    }

    #[tokio::test]
    async fn empty_plan_runs_no_batches() {
        let store = SqliteStore::open_in_memory("acme").unwrap();
        assert!(execute_deletions(&store, &BTreeSet::new(), 50).await.is_empty());
    }
}
