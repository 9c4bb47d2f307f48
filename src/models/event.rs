use serde::{Deserialize, Serialize};

use crate::models::document::{Document, DocumentId, DocumentStatus, DocumentWrite};

pub const EVENT_DOC_TYPE: &str = "event";
pub const EVENT_CATEGORY_TAXONOMY: &str = "event_category";
pub const META_START_DATE_TIME: &str = "start_date_time";
pub const META_END_DATE_TIME: &str = "end_date_time";

/// Event as returned by `show` and `list`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub event_id: DocumentId,
    pub title: String,
    pub description: String,
    pub start_date_time: String,
    pub end_date_time: String,
    /// Slugs joined with `", "`.
    pub category_slugs: String,
}

impl Event {
    /// `None` when the document is not an Event.
    pub fn from_document(doc: &Document) -> Option<Self> {
        if doc.doc_type != EVENT_DOC_TYPE {
            return None;
        }

        Some(Event {
            event_id: doc.id,
            title: doc.title.clone(),
            description: doc.content.clone(),
            start_date_time: doc.meta_value(META_START_DATE_TIME).to_string(),
            end_date_time: doc.meta_value(META_END_DATE_TIME).to_string(),
            category_slugs: doc.term_slugs(EVENT_CATEGORY_TAXONOMY).join(", "),
        })
    }
}

/// Sanitized input of `create`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEvent {
    pub title: String,
    pub description: String,
    pub start_date_time: String,
    pub end_date_time: String,
    pub category_slugs: Option<String>,
}

impl NewEvent {
    pub fn into_write(self) -> DocumentWrite {
        let mut write = DocumentWrite::new(EVENT_DOC_TYPE);
        write.status = Some(DocumentStatus::Publish);
        write.title = Some(self.title);
        write.content = Some(self.description);
        write
            .meta
            .insert(META_START_DATE_TIME.to_string(), self.start_date_time);
        write
            .meta
            .insert(META_END_DATE_TIME.to_string(), self.end_date_time);
        if let Some(slugs) = self.category_slugs {
            write.terms.insert(EVENT_CATEGORY_TAXONOMY.to_string(), slugs);
        }
        write
    }
}

/// Sanitized optional fields of `update`. `None` means "not supplied".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub start_date_time: Option<String>,
    pub end_date_time: Option<String>,
    pub category_slugs: Option<String>,
}

impl EventChanges {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.start_date_time.is_none()
            && self.end_date_time.is_none()
            && self.category_slugs.is_none()
    }

    /// `id` of `None` writes a new document.
    pub fn into_write(self, id: Option<DocumentId>) -> DocumentWrite {
        let mut write = DocumentWrite::new(EVENT_DOC_TYPE);
        write.id = id;
        write.title = self.title;
        write.content = self.description;
        if let Some(start) = self.start_date_time {
            write.meta.insert(META_START_DATE_TIME.to_string(), start);
        }
        if let Some(end) = self.end_date_time {
            write.meta.insert(META_END_DATE_TIME.to_string(), end);
        }
        if let Some(slugs) = self.category_slugs {
            write.terms.insert(EVENT_CATEGORY_TAXONOMY.to_string(), slugs);
        }
        write
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EnvelopeData {
    One(Event),
    Many(Vec<Event>),
}

/// Success body shared by every operation: `{status, message, data?, event_id?}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    pub status: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<EnvelopeData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_id: Option<DocumentId>,
}

impl Envelope {
    fn success(message: &str) -> Self {
        Envelope {
            status: "Success".to_string(),
            message: message.to_string(),
            data: None,
            event_id: None,
        }
    }

    pub fn found(event: Event) -> Self {
        Envelope {
            data: Some(EnvelopeData::One(event)),
            ..Self::success("Data Found")
        }
    }

    pub fn found_many(events: Vec<Event>) -> Self {
        Envelope {
            data: Some(EnvelopeData::Many(events)),
            ..Self::success("Data Found")
        }
    }

    pub fn not_found() -> Self {
        Self::success("No data found")
    }

    pub fn created(id: DocumentId) -> Self {
        Envelope {
            event_id: Some(id),
            ..Self::success("Event created")
        }
    }

    pub fn updated(id: DocumentId) -> Self {
        Envelope {
            event_id: Some(id),
            ..Self::success("Event updated")
        }
    }

    pub fn deleted(id: DocumentId) -> Self {
        Envelope {
            event_id: Some(id),
            ..Self::success("Event deleted")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;
    use std::collections::BTreeMap;

    use crate::models::document::Term;

    fn document(doc_type: &str) -> Document {
        let mut meta = BTreeMap::new();
        meta.insert(META_START_DATE_TIME.to_string(), "01/05/2024 10:00".to_string());
        let mut terms = BTreeMap::new();
        terms.insert(
            EVENT_CATEGORY_TAXONOMY.to_string(),
            vec![
                Term { id: 1, taxonomy: EVENT_CATEGORY_TAXONOMY.into(), name: "Music".into(), slug: "music".into() },
                Term { id: 2, taxonomy: EVENT_CATEGORY_TAXONOMY.into(), name: "Art".into(), slug: "art".into() },
            ],
        );
        Document {
            id: 7,
            doc_type: doc_type.to_string(),
            status: DocumentStatus::Publish,
            title: "Concert".into(),
            content: "Line one\nLine two".into(),
            meta,
            terms,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn event_from_document_joins_slugs_and_defaults_missing_meta() {
        let event = Event::from_document(&document("event")).unwrap();

        assert_eq!(event.event_id, 7);
        assert_eq!(event.category_slugs, "music, art");
        assert_eq!(event.start_date_time, "01/05/2024 10:00");
        assert_eq!(event.end_date_time, "");
        assert_eq!(event.description, "Line one\nLine two");
    }

    #[test]
    fn non_event_document_is_not_an_event() {
        assert!(Event::from_document(&document("page")).is_none());
    }

    #[test]
    fn changes_write_only_supplied_fields() {
        let changes = EventChanges {
            title: Some("X".into()),
            ..Default::default()
        };
        assert!(!changes.is_empty());

        let write = changes.into_write(Some(3));
        assert_eq!(write.id, Some(3));
        assert_eq!(write.title.as_deref(), Some("X"));
        assert!(write.content.is_none());
        assert!(write.status.is_none());
        assert!(write.meta.is_empty());
        assert!(write.terms.is_empty());
    }

    #[test]
    fn envelopes_omit_absent_fields() {
        assert_eq!(
            serde_json::to_value(Envelope::not_found()).unwrap(),
            json!({"status": "Success", "message": "No data found"})
        );
        assert_eq!(
            serde_json::to_value(Envelope::deleted(4)).unwrap(),
            json!({"status": "Success", "message": "Event deleted", "event_id": 4})
        );
    }
}
