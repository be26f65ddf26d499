use std::collections::HashSet;
use std::path::Path;

use walkdir::WalkDir;

use crate::images::ImageResolver;
use crate::store::CatalogEntry;

const MISSING_SAMPLE: usize = 20;

/// Set of files under the local asset directory, keyed by `/`-joined relative path.
pub struct AssetIndex {
    files: HashSet<String>,
}

impl AssetIndex {
    pub fn scan(dir: &Path) -> Self {
        let files = WalkDir::new(dir)
            .follow_links(false)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter_map(|e| {
                let rel = e.path().strip_prefix(dir).ok()?;
                let parts: Vec<_> = rel
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy().into_owned())
                    .collect();
                Some(parts.join("/"))
            })
            .collect();
        Self { files }
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Membership of a resolved web path such as `/images/products/x.jpg`.
    pub fn contains(&self, web_path: &str, asset_root: &str) -> bool {
        web_path
            .strip_prefix(asset_root)
            .is_some_and(|rel| self.files.contains(rel.trim_start_matches('/')))
    }
}

#[derive(Debug)]
pub struct MissingImage {
    pub slug: String,
    pub path: String,
}

#[derive(Debug, Default)]
pub struct ImageAudit {
    pub total: usize,
    pub found: usize,
    pub missing: usize,
    pub samples: Vec<MissingImage>,
}

/// Resolve every entry's image and check it against the asset index.
pub fn audit(entries: &[CatalogEntry], resolver: &ImageResolver, index: &AssetIndex) -> ImageAudit {
    let mut report = ImageAudit::default();
    for entry in entries {
        report.total += 1;
        let path = resolver.resolve(Some(&entry.slug));
        if index.contains(&path, resolver.asset_root()) {
            report.found += 1;
            continue;
        }
        report.missing += 1;
        if report.samples.len() < MISSING_SAMPLE {
            report.samples.push(MissingImage {
                slug: entry.slug.clone(),
                path,
            });
        }
    }
    report
}
