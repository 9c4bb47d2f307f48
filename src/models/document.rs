use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

pub type DocumentId = i64;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    Publish,
    #[default]
    Draft,
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentStatus::Publish => "publish",
            DocumentStatus::Draft => "draft",
        }
    }
}

impl fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "publish" => Ok(DocumentStatus::Publish),
            "draft" => Ok(DocumentStatus::Draft),
            other => Err(format!("unknown document status: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Term {
    pub id: i64,
    pub taxonomy: String,
    pub name: String,
    pub slug: String,
}

/// A typed document with attached metadata and taxonomy terms.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub doc_type: String,
    pub status: DocumentStatus,
    pub title: String,
    pub content: String,
    pub meta: BTreeMap<String, String>,
    /// Terms per taxonomy, in assignment order.
    pub terms: BTreeMap<String, Vec<Term>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document {
    pub fn meta_value(&self, key: &str) -> &str {
        self.meta.get(key).map(String::as_str).unwrap_or_default()
    }

    pub fn term_slugs(&self, taxonomy: &str) -> Vec<&str> {
        self.terms
            .get(taxonomy)
            .map(|terms| terms.iter().map(|t| t.slug.as_str()).collect())
            .unwrap_or_default()
    }
}

/// One write against the store: an insert when `id` is `None`, otherwise an
/// upsert keyed by `id`. Only the fields that are `Some` (and the listed
/// meta keys and taxonomies) are written; everything else is left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentWrite {
    pub id: Option<DocumentId>,
    pub doc_type: String,
    pub status: Option<DocumentStatus>,
    pub title: Option<String>,
    pub content: Option<String>,
    pub meta: BTreeMap<String, String>,
    /// Comma-separated term lists per taxonomy. Replaces the previous assignment.
    pub terms: BTreeMap<String, String>,
}

impl DocumentWrite {
    pub fn new(doc_type: impl Into<String>) -> Self {
        Self {
            doc_type: doc_type.into(),
            ..Default::default()
        }
    }

    /// Host rule for new documents: at least one of title/content must be present.
    pub fn has_content(&self) -> bool {
        let title = self.title.as_deref().unwrap_or_default();
        let content = self.content.as_deref().unwrap_or_default();
        !(title.is_empty() && content.is_empty())
    }
}

/// Filter for [`crate::store::DocumentStore::query`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentQuery {
    pub doc_type: String,
    pub status: Option<DocumentStatus>,
    /// Matches documents whose meta value for the key contains the string.
    pub meta_contains: Option<(String, String)>,
}

impl DocumentQuery {
    pub fn matches(&self, doc: &Document) -> bool {
        if doc.doc_type != self.doc_type {
            return false;
        }
        if let Some(status) = self.status {
            if doc.status != status {
                return false;
            }
        }
        match &self.meta_contains {
            Some((key, needle)) => doc
                .meta
                .get(key)
                .is_some_and(|value| value.contains(needle.as_str())),
            None => true,
        }
    }
}

/// Splits a comma-separated term list: trims entries, drops duplicates and
/// entries with no slug (empty or punctuation only), keeps the input order.
pub fn parse_term_list(raw: &str) -> Vec<String> {
    let mut entries: Vec<String> = Vec::new();
    for entry in raw.split(',').map(str::trim).filter(|e| !slugify(e).is_empty()) {
        if !entries.iter().any(|e| e == entry) {
            entries.push(entry.to_string());
        }
    }
    entries
}

/// Slug for a new term: lowercase, whitespace runs become `-`, anything that
/// is not alphanumeric, `-` or `_` is dropped.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;

    for c in name.trim().chars() {
        if c.is_whitespace() || c == '-' {
            pending_dash = !slug.is_empty();
            continue;
        }
        if !(c.is_alphanumeric() || c == '_') {
            continue;
        }
        if pending_dash {
            slug.push('-');
            pending_dash = false;
        }
        slug.extend(c.to_lowercase());
    }

    slug
}
