use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::ItemError;

/// Legacy pages on disk, one file per slug.
pub struct DocumentLibrary {
    root: PathBuf,
    extension: String,
}

impl DocumentLibrary {
    pub fn new(root: impl Into<PathBuf>, extension: &str) -> Self {
        Self {
            root: root.into(),
            extension: extension.trim_start_matches('.').to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, slug: &str) -> PathBuf {
        self.root.join(format!("{}.{}", slug, self.extension))
    }

    pub fn read(&self, slug: &str) -> Result<String, ItemError> {
        let path = self.path_for(slug);
        match std::fs::read(&path) {
            // Legacy pages are not guaranteed to be valid UTF-8.
            Ok(bytes) => Ok(String::from_utf8_lossy(&bytes).into_owned()),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(ItemError::SourceNotFound(path)),
            Err(source) => Err(ItemError::SourceUnreadable { path, source }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_joins_slug_and_extension() {
        let lib = DocumentLibrary::new("public_html", ".html");
        assert_eq!(lib.path_for("widget"), PathBuf::from("public_html/widget.html"));
    }

    #[test]
    fn reads_existing_document() {
        let lib = DocumentLibrary::new("tests/fixtures", "html");
        let html = lib.read("no-container-page").unwrap();
        assert!(html.contains("<html"));
    }

    #[test]
    fn missing_document_is_source_not_found() {
        let lib = DocumentLibrary::new("tests/fixtures", "html");
        match lib.read("does-not-exist") {
            Err(ItemError::SourceNotFound(path)) => {
                assert!(path.ends_with("does-not-exist.html"))
            }
            other => panic!("expected SourceNotFound, got {:?}", other),
        }
    }
}
