use std::path::PathBuf;

use thiserror::Error;

use crate::store::StoreError;

/// Why a single catalog entry could not be migrated. Recorded and counted,
/// never fatal to the run.
#[derive(Error, Debug)]
pub enum ItemError {
    #[error("source document not found: {}", .0.display())]
    SourceNotFound(PathBuf),

    #[error("source document unreadable: {}: {source}", .path.display())]
    SourceUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("content container {selector:?} not found")]
    ContainerNotFound { selector: String },

    #[error("no blocks extracted")]
    EmptyExtraction,

    #[error("failed to save structured content: {0}")]
    Persistence(#[from] StoreError),
}

impl ItemError {
    /// Short stable label for tallies and log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            ItemError::SourceNotFound(_) => "source_not_found",
            ItemError::SourceUnreadable { .. } => "source_unreadable",
            ItemError::ContainerNotFound { .. } => "container_not_found",
            ItemError::EmptyExtraction => "empty_extraction",
            ItemError::Persistence(_) => "persistence",
        }
    }
}
