pub mod events;
pub mod params;

use axum::Router;
use std::sync::Arc;

pub const REST_NAMESPACE: &str = "storeapps/v1";
pub const ROUTE_BASE: &str = "events";

/// `/storeapps/v1/events`
pub fn base_path() -> String {
    format!("/{REST_NAMESPACE}/{ROUTE_BASE}")
}

pub fn routes() -> Router<Arc<crate::AppState>> {
    Router::new().nest(&base_path(), events::routes())
}
