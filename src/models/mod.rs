pub mod document;
pub mod event;
pub mod registration;

pub use document::{Document, DocumentId, DocumentQuery, DocumentStatus, DocumentWrite, Term};
pub use event::{Envelope, EnvelopeData, Event, EventChanges, NewEvent};
pub use registration::TypeRegistry;
