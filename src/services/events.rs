//! Event resource operations on top of a [`DocumentStore`].
//!
//! "Not found" is not an error here: `show` and `list` answer with the
//! "No data found" envelope. Everything that fails after validation is an
//! [`ApiError`] rendered as HTTP 500.

use std::sync::Arc;
use tracing::{info, instrument};

use crate::error::ApiError;
use crate::models::event::{EVENT_DOC_TYPE, META_START_DATE_TIME};
use crate::models::{
    DocumentId, DocumentQuery, DocumentStatus, Envelope, Event, EventChanges, NewEvent,
};
use crate::store::DocumentStore;

#[derive(Clone)]
pub struct EventService {
    store: Arc<dyn DocumentStore>,
}

/// Ids above `i64::MAX` can never exist in the store.
fn document_id(id: u64) -> Option<DocumentId> {
    DocumentId::try_from(id).ok()
}

impl EventService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    #[instrument(skip(self))]
    pub async fn show(&self, id: u64) -> Result<Envelope, ApiError> {
        let Some(id) = document_id(id) else {
            return Ok(Envelope::not_found());
        };

        let event = self
            .store
            .get(id)
            .await?
            .as_ref()
            .and_then(Event::from_document);

        Ok(match event {
            Some(event) => Envelope::found(event),
            None => Envelope::not_found(),
        })
    }

    /// Published events whose start contains `start_date` as a substring.
    #[instrument(skip(self))]
    pub async fn list(&self, start_date: &str) -> Result<Envelope, ApiError> {
        let query = DocumentQuery {
            doc_type: EVENT_DOC_TYPE.to_string(),
            status: Some(DocumentStatus::Publish),
            meta_contains: Some((META_START_DATE_TIME.to_string(), start_date.to_string())),
        };

        let events: Vec<Event> = self
            .store
            .query(&query)
            .await?
            .iter()
            .filter_map(Event::from_document)
            .collect();

        if events.is_empty() {
            Ok(Envelope::not_found())
        } else {
            Ok(Envelope::found_many(events))
        }
    }

    #[instrument(skip(self, input), fields(title = %input.title))]
    pub async fn create(&self, input: NewEvent) -> Result<Envelope, ApiError> {
        let id = self.store.save(input.into_write()).await?;
        info!(event_id = id, "event created");
        Ok(Envelope::created(id))
    }

    /// Partial update: only supplied fields are written. Id 0 writes a new
    /// Event; any other id must already exist.
    #[instrument(skip(self, changes))]
    pub async fn update(&self, id: u64, changes: EventChanges) -> Result<Envelope, ApiError> {
        if changes.is_empty() {
            return Err(ApiError::TooFewArguments);
        }

        let target = match id {
            0 => None,
            // id за пределами i64 не хранится, store ответит invalid_post
            id => Some(document_id(id).unwrap_or(DocumentId::MAX)),
        };
        let saved = self.store.save(changes.into_write(target)).await?;
        info!(event_id = saved, "event updated");
        Ok(Envelope::updated(saved))
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: u64) -> Result<Envelope, ApiError> {
        let Some(doc_id) = document_id(id) else {
            return Err(ApiError::InvalidEventId);
        };

        if self.store.doc_type(doc_id).await?.as_deref() != Some(EVENT_DOC_TYPE) {
            return Err(ApiError::InvalidEventId);
        }

        if !self.store.delete(doc_id).await? {
            return Err(ApiError::CantDelete);
        }

        info!(event_id = doc_id, "event deleted");
        Ok(Envelope::deleted(doc_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::registration::{DocumentTypeDef, Labels};
    use crate::models::{DocumentWrite, EnvelopeData, TypeRegistry};
    use crate::store::MemoryDocumentStore;

    fn service() -> (EventService, MemoryDocumentStore) {
        let store = MemoryDocumentStore::new(Arc::new(TypeRegistry::with_event_types()));
        (EventService::new(Arc::new(store.clone())), store)
    }

    fn new_event(title: &str, start: &str) -> NewEvent {
        NewEvent {
            title: title.to_string(),
            description: "About it".to_string(),
            start_date_time: start.to_string(),
            end_date_time: "02/05/2024 12:00".to_string(),
            category_slugs: Some("music,art".to_string()),
        }
    }

    fn created_id(envelope: &Envelope) -> DocumentId {
        envelope.event_id.expect("create returns an event id")
    }

    fn single(envelope: Envelope) -> Event {
        match envelope.data {
            Some(EnvelopeData::One(event)) => event,
            other => panic!("expected one event, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn create_then_show_round_trips_fields() {
        let (service, _) = service();
        let created = service.create(new_event("Concert", "01/05/2024 10:00")).await.unwrap();
        assert_eq!(created.message, "Event created");
        let id = created_id(&created);

        let shown = service.show(id as u64).await.unwrap();
        assert_eq!(shown.message, "Data Found");
        let event = single(shown);
        assert_eq!(event.event_id, id);
        assert_eq!(event.title, "Concert");
        assert_eq!(event.description, "About it");
        assert_eq!(event.start_date_time, "01/05/2024 10:00");
        assert_eq!(event.end_date_time, "02/05/2024 12:00");
        assert_eq!(event.category_slugs, "music, art");
    }

    #[tokio::test]
    async fn show_of_missing_or_foreign_document_is_not_found() {
        let mut registry = TypeRegistry::with_event_types();
        registry.register_type(DocumentTypeDef {
            name: "page",
            labels: Labels {
                name: "Pages",
                singular_name: "Page",
                menu_name: "Pages",
            },
            public: true,
            show_in_rest: true,
            hierarchical: true,
            supports: vec!["title"],
            taxonomies: vec![],
        });
        let store = MemoryDocumentStore::new(Arc::new(registry));
        let service = EventService::new(Arc::new(store.clone()));

        let mut page = DocumentWrite::new("page");
        page.title = Some("About".into());
        let page_id = store.save(page).await.unwrap();

        assert_eq!(service.show(page_id as u64).await.unwrap(), Envelope::not_found());
        assert_eq!(service.show(404).await.unwrap(), Envelope::not_found());
        assert_eq!(service.show(u64::MAX).await.unwrap(), Envelope::not_found());
        assert!(matches!(service.delete(page_id as u64).await, Err(ApiError::InvalidEventId)));
        assert!(store.get(page_id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn create_without_title_and_description_fails_in_store() {
        let (service, store) = service();
        let mut input = new_event("", "01/05/2024 10:00");
        input.description = String::new();

        let err = service.create(input).await.unwrap_err();
        assert_eq!(err.code(), "empty_content");
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn update_without_fields_is_too_few_arguments() {
        let (service, _) = service();
        for id in [0, 1, 12345, u64::MAX] {
            let err = service.update(id, EventChanges::default()).await.unwrap_err();
            assert!(matches!(err, ApiError::TooFewArguments));
        }
    }

    #[tokio::test]
    async fn update_touches_only_supplied_fields() {
        let (service, _) = service();
        let id = created_id(&service.create(new_event("Concert", "01/05/2024 10:00")).await.unwrap());

        let changes = EventChanges {
            title: Some("X".into()),
            ..Default::default()
        };
        let updated = service.update(id as u64, changes).await.unwrap();
        assert_eq!(updated, Envelope::updated(id));

        let event = single(service.show(id as u64).await.unwrap());
        assert_eq!(event.title, "X");
        assert_eq!(event.description, "About it");
        assert_eq!(event.start_date_time, "01/05/2024 10:00");
        assert_eq!(event.end_date_time, "02/05/2024 12:00");
        assert_eq!(event.category_slugs, "music, art");
    }

    #[tokio::test]
    async fn update_of_unknown_id_fails_and_zero_inserts() {
        let (service, store) = service();
        let changes = EventChanges {
            title: Some("Ghost".into()),
            ..Default::default()
        };

        for id in [999, u64::MAX] {
            let err = service.update(id, changes.clone()).await.unwrap_err();
            assert_eq!(err.code(), "invalid_post");
        }
        let dates_only = EventChanges {
            start_date_time: Some("01/05/2024 10:00".into()),
            ..Default::default()
        };
        let err = service.update(999, dates_only).await.unwrap_err();
        assert_eq!(err.code(), "invalid_post");
        assert!(store.is_empty().await);

        let inserted = service.update(0, changes).await.unwrap();
        let id = created_id(&inserted);
        let doc = store.get(id).await.unwrap().unwrap();
        assert_eq!(doc.title, "Ghost");
        assert_eq!(doc.status, DocumentStatus::Draft);
    }

    #[tokio::test]
    async fn list_matches_start_date_substring() {
        let (service, _) = service();
        let morning = created_id(&service.create(new_event("Morning", "01/05/2024 09:00")).await.unwrap());
        let evening = created_id(&service.create(new_event("Evening", "01/05/2024 21:30")).await.unwrap());
        service.create(new_event("Other day", "02/05/2024 09:00")).await.unwrap();

        let listed = service.list("01/05/2024").await.unwrap();
        let ids: Vec<_> = match listed.data {
            Some(EnvelopeData::Many(events)) => events.iter().map(|e| e.event_id).collect(),
            other => panic!("expected a list, got {other:?}"),
        };
        assert_eq!(ids, vec![evening, morning]);

        assert_eq!(service.list("03/05/2024").await.unwrap(), Envelope::not_found());
    }

    #[tokio::test]
    async fn delete_checks_type_and_removes_event() {
        let (service, _) = service();
        let id = created_id(&service.create(new_event("Concert", "01/05/2024 10:00")).await.unwrap());

        assert!(matches!(service.delete(999).await, Err(ApiError::InvalidEventId)));

        let deleted = service.delete(id as u64).await.unwrap();
        assert_eq!(deleted, Envelope::deleted(id));
        assert_eq!(service.show(id as u64).await.unwrap(), Envelope::not_found());
        assert!(matches!(service.delete(id as u64).await, Err(ApiError::InvalidEventId)));
    }
}
