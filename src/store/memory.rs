use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use super::{check_write, DocumentStore, StoreError, StoreResult};
use crate::models::document::{parse_term_list, slugify};
use crate::models::{Document, DocumentId, DocumentQuery, DocumentWrite, Term, TypeRegistry};

#[derive(Default)]
struct Inner {
    next_id: DocumentId,
    next_term_id: i64,
    documents: BTreeMap<DocumentId, Document>,
    terms: Vec<Term>,
}

impl Inner {
    fn resolve_terms(&mut self, taxonomy: &str, raw: &str) -> Vec<Term> {
        parse_term_list(raw)
            .into_iter()
            .map(|entry| {
                let slug = slugify(&entry);
                if let Some(term) = self
                    .terms
                    .iter()
                    .find(|t| t.taxonomy == taxonomy && (t.slug == slug || t.name == entry))
                {
                    return term.clone();
                }
                self.next_term_id += 1;
                let term = Term {
                    id: self.next_term_id,
                    taxonomy: taxonomy.to_string(),
                    name: entry,
                    slug,
                };
                self.terms.push(term.clone());
                term
            })
            .fold(Vec::new(), |mut acc: Vec<Term>, term| {
                // два разных имени могут дать один и тот же slug
                if !acc.iter().any(|t| t.id == term.id) {
                    acc.push(term);
                }
                acc
            })
    }
}

/// Store kept in process memory. Used for local runs and tests.
#[derive(Clone)]
pub struct MemoryDocumentStore {
    registry: Arc<TypeRegistry>,
    inner: Arc<RwLock<Inner>>,
}

impl MemoryDocumentStore {
    pub fn new(registry: Arc<TypeRegistry>) -> Self {
        Self {
            registry,
            inner: Arc::new(RwLock::new(Inner::default())),
        }
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.documents.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn get(&self, id: DocumentId) -> StoreResult<Option<Document>> {
        Ok(self.inner.read().await.documents.get(&id).cloned())
    }

    async fn doc_type(&self, id: DocumentId) -> StoreResult<Option<String>> {
        Ok(self
            .inner
            .read()
            .await
            .documents
            .get(&id)
            .map(|d| d.doc_type.clone()))
    }

    async fn query(&self, query: &DocumentQuery) -> StoreResult<Vec<Document>> {
        let inner = self.inner.read().await;
        Ok(inner
            .documents
            .values()
            .rev()
            .filter(|doc| query.matches(doc))
            .cloned()
            .collect())
    }

    async fn save(&self, write: DocumentWrite) -> StoreResult<DocumentId> {
        check_write(&self.registry, &write)?;

        let mut inner = self.inner.write().await;
        let now = Utc::now();

        let id = match write.id {
            Some(id) => {
                let doc = inner.documents.get(&id).ok_or(StoreError::InvalidPost(id))?;
                if doc.doc_type != write.doc_type {
                    return Err(StoreError::InvalidPost(id));
                }
                id
            }
            None => {
                if !write.has_content() {
                    return Err(StoreError::EmptyContent);
                }
                inner.next_id += 1;
                let id = inner.next_id;
                inner.documents.insert(
                    id,
                    Document {
                        id,
                        doc_type: write.doc_type.clone(),
                        status: write.status.unwrap_or_default(),
                        title: String::new(),
                        content: String::new(),
                        meta: BTreeMap::new(),
                        terms: BTreeMap::new(),
                        created_at: now,
                        updated_at: now,
                    },
                );
                id
            }
        };

        let mut assignments = Vec::with_capacity(write.terms.len());
        for (taxonomy, raw) in &write.terms {
            assignments.push((taxonomy.clone(), inner.resolve_terms(taxonomy, raw)));
        }

        let doc = inner
            .documents
            .get_mut(&id)
            .ok_or(StoreError::InvalidPost(id))?;
        if let Some(status) = write.status {
            doc.status = status;
        }
        if let Some(title) = write.title {
            doc.title = title;
        }
        if let Some(content) = write.content {
            doc.content = content;
        }
        doc.meta.extend(write.meta);
        for (taxonomy, terms) in assignments {
            doc.terms.insert(taxonomy, terms);
        }
        doc.updated_at = now;

        debug!(document_id = id, doc_type = %doc.doc_type, "document saved");
        Ok(id)
    }

    async fn delete(&self, id: DocumentId) -> StoreResult<bool> {
        Ok(self.inner.write().await.documents.remove(&id).is_some())
    }
}
