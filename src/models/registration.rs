//! Declarative registration of document types and taxonomies.
//!
//! The registry is built once at startup and shared by the stores, which
//! refuse writes to unregistered types or taxonomies.

use std::collections::HashMap;

use crate::models::event::{EVENT_CATEGORY_TAXONOMY, EVENT_DOC_TYPE};

#[derive(Debug, Clone)]
pub struct Labels {
    pub name: &'static str,
    pub singular_name: &'static str,
    pub menu_name: &'static str,
}

#[derive(Debug, Clone)]
pub struct DocumentTypeDef {
    pub name: &'static str,
    pub labels: Labels,
    pub public: bool,
    pub show_in_rest: bool,
    pub hierarchical: bool,
    pub supports: Vec<&'static str>,
    pub taxonomies: Vec<&'static str>,
}

#[derive(Debug, Clone)]
pub struct TaxonomyDef {
    pub name: &'static str,
    pub labels: Labels,
    pub hierarchical: bool,
    pub show_in_rest: bool,
    pub object_types: Vec<&'static str>,
}

#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    types: HashMap<&'static str, DocumentTypeDef>,
    taxonomies: HashMap<&'static str, TaxonomyDef>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the `event` type and its `event_category` taxonomy.
    pub fn with_event_types() -> Self {
        let mut registry = Self::new();
        registry.register_type(event_type_def());
        registry.register_taxonomy(event_category_def());
        registry
    }

    pub fn register_type(&mut self, def: DocumentTypeDef) {
        tracing::debug!(doc_type = def.name, "registered document type");
        self.types.insert(def.name, def);
    }

    pub fn register_taxonomy(&mut self, def: TaxonomyDef) {
        tracing::debug!(taxonomy = def.name, "registered taxonomy");
        self.taxonomies.insert(def.name, def);
    }

    pub fn document_type(&self, name: &str) -> Option<&DocumentTypeDef> {
        self.types.get(name)
    }

    pub fn taxonomy(&self, name: &str) -> Option<&TaxonomyDef> {
        self.taxonomies.get(name)
    }

    pub fn is_type_registered(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    /// Whether `taxonomy` exists and is attached to `doc_type`.
    pub fn taxonomy_applies(&self, taxonomy: &str, doc_type: &str) -> bool {
        self.taxonomies
            .get(taxonomy)
            .is_some_and(|t| t.object_types.iter().any(|o| *o == doc_type))
    }
}

fn event_type_def() -> DocumentTypeDef {
    DocumentTypeDef {
        name: EVENT_DOC_TYPE,
        labels: Labels {
            name: "Events",
            singular_name: "Event",
            menu_name: "Events",
        },
        public: true,
        show_in_rest: true,
        hierarchical: false,
        supports: vec!["title", "editor", "revisions", "author"],
        taxonomies: vec![EVENT_CATEGORY_TAXONOMY],
    }
}

fn event_category_def() -> TaxonomyDef {
    TaxonomyDef {
        name: EVENT_CATEGORY_TAXONOMY,
        labels: Labels {
            name: "Categories",
            singular_name: "Category",
            menu_name: "Categories",
        },
        hierarchical: false,
        show_in_rest: true,
        object_types: vec![EVENT_DOC_TYPE],
    }
}
