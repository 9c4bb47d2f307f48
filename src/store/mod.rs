//! Document store the Event controller delegates to.
//!
//! A document is a typed record with key-value meta and per-taxonomy terms.
//! Each method is a single store call; writes are atomic per call.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{Document, DocumentId, DocumentQuery, DocumentWrite, TypeRegistry};

pub use memory::MemoryDocumentStore;
pub use postgres::PgDocumentStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Content, title, and excerpt are empty.")]
    EmptyContent,

    #[error("Invalid post type.")]
    InvalidPostType(String),

    #[error("Invalid taxonomy.")]
    InvalidTaxonomy(String),

    #[error("Invalid post ID.")]
    InvalidPost(DocumentId),

    #[error("Could not write to the database: {0}")]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    /// Machine-readable code surfaced to API callers.
    pub fn code(&self) -> &'static str {
        match self {
            StoreError::EmptyContent => "empty_content",
            StoreError::InvalidPostType(_) => "invalid_post_type",
            StoreError::InvalidTaxonomy(_) => "invalid_taxonomy",
            StoreError::InvalidPost(_) => "invalid_post",
            StoreError::Database(_) => "db_error",
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Document by id, of any type.
    async fn get(&self, id: DocumentId) -> StoreResult<Option<Document>>;

    /// Type tag of the document, `None` when it does not exist.
    async fn doc_type(&self, id: DocumentId) -> StoreResult<Option<String>>;

    /// Documents matching the filter, newest id first.
    async fn query(&self, query: &DocumentQuery) -> StoreResult<Vec<Document>>;

    /// Inserts when `write.id` is `None`, otherwise merges into the existing
    /// document of the same type. An id with no document is `InvalidPost`.
    /// Returns the id of the written document.
    async fn save(&self, write: DocumentWrite) -> StoreResult<DocumentId>;

    /// Permanently removes the document with its meta and term assignments.
    /// Returns `false` when nothing was removed.
    async fn delete(&self, id: DocumentId) -> StoreResult<bool>;
}

/// Registry checks shared by every backend, run before anything is written.
pub(crate) fn check_write(registry: &TypeRegistry, write: &DocumentWrite) -> StoreResult<()> {
    if !registry.is_type_registered(&write.doc_type) {
        return Err(StoreError::InvalidPostType(write.doc_type.clone()));
    }
    for taxonomy in write.terms.keys() {
        if !registry.taxonomy_applies(taxonomy, &write.doc_type) {
            return Err(StoreError::InvalidTaxonomy(taxonomy.clone()));
        }
    }
    Ok(())
}
