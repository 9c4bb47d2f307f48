use axum::{
    extract::State,
    routing::{delete, get, post, put},
    Json, Router,
};
use std::sync::Arc;

use crate::controllers::params::{CreateArgs, IdArgs, ListArgs, RequestParams, UpdateArgs};
use crate::error::ApiError;
use crate::middleware::{Caller, Operation};
use crate::models::Envelope;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/show", get(show_event))
        .route("/list", get(list_events))
        .route("/create", post(create_event))
        .route("/update", put(update_event).patch(update_event).post(update_event))
        .route("/delete", delete(delete_event))
}

// Порядок везде одинаковый: аргументы -> права -> хранилище

// GET /show?id=
async fn show_event(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    params: RequestParams,
) -> Result<Json<Envelope>, ApiError> {
    let id = params.parse::<IdArgs>()?;
    state.policy.authorize(&caller, Operation::Show)?;
    Ok(Json(state.events.show(id).await?))
}

// GET /list?start_date=dd/mm/yyyy
async fn list_events(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    params: RequestParams,
) -> Result<Json<Envelope>, ApiError> {
    let start_date = params.parse::<ListArgs>()?;
    state.policy.authorize(&caller, Operation::List)?;
    Ok(Json(state.events.list(&start_date).await?))
}

// POST /create
async fn create_event(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    params: RequestParams,
) -> Result<Json<Envelope>, ApiError> {
    let input = params.parse::<CreateArgs>()?;
    state.policy.authorize(&caller, Operation::Create)?;
    Ok(Json(state.events.create(input).await?))
}

// PUT|PATCH|POST /update
async fn update_event(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    params: RequestParams,
) -> Result<Json<Envelope>, ApiError> {
    let (id, changes) = params.parse::<UpdateArgs>()?;
    state.policy.authorize(&caller, Operation::Update)?;
    Ok(Json(state.events.update(id, changes).await?))
}

// DELETE /delete?id=
async fn delete_event(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    params: RequestParams,
) -> Result<Json<Envelope>, ApiError> {
    let id = params.parse::<IdArgs>()?;
    state.policy.authorize(&caller, Operation::Delete)?;
    Ok(Json(state.events.delete(id).await?))
}
