use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::store::StoreError;

fn names(params: &BTreeMap<String, String>) -> String {
    params.keys().cloned().collect::<Vec<_>>().join(", ")
}

/// Every failure the API reports. Rendered as `{code, message, data:{status}}`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Missing parameter(s): {}", .0.join(", "))]
    MissingParams(Vec<String>),

    #[error("Invalid parameter(s): {}", names(.0))]
    InvalidParams(BTreeMap<String, String>),

    #[error("Invalid JSON body passed.")]
    InvalidJson(String),

    #[error("Sorry, you are not allowed to do that.")]
    NotLoggedIn,

    #[error("Invalid username or password.")]
    InvalidCredentials,

    #[error("Sorry, you are not allowed to do that.")]
    Forbidden,

    #[error("You must provide atleast one data to be updated in the Event.")]
    TooFewArguments,

    #[error("The Event doesn't exist with this ID.")]
    InvalidEventId,

    #[error("There is error while deleting the event.")]
    CantDelete,

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ApiError {
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::MissingParams(_) => "rest_missing_callback_param",
            ApiError::InvalidParams(_) => "rest_invalid_param",
            ApiError::InvalidJson(_) => "rest_invalid_json",
            ApiError::NotLoggedIn | ApiError::Forbidden => "rest_forbidden",
            ApiError::InvalidCredentials => "invalid_credentials",
            ApiError::TooFewArguments => "too_few_arguments",
            ApiError::InvalidEventId => "invalid_event_id",
            ApiError::CantDelete => "cant_delete",
            ApiError::Store(e) => e.code(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingParams(_) | ApiError::InvalidParams(_) | ApiError::InvalidJson(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::NotLoggedIn | ApiError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::TooFewArguments
            | ApiError::InvalidEventId
            | ApiError::CantDelete
            | ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn data(&self) -> Value {
        let status = self.status().as_u16();
        match self {
            ApiError::MissingParams(params) => json!({ "status": status, "params": params }),
            ApiError::InvalidParams(params) => json!({ "status": status, "params": params }),
            ApiError::InvalidJson(reason) => json!({ "status": status, "json_error_message": reason }),
            _ => json!({ "status": status }),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            ApiError::Store(e) => tracing::error!(code = e.code(), error = %e, "store operation failed"),
            e if e.status().is_server_error() => tracing::warn!(code = e.code(), "{}", e),
            e => tracing::debug!(code = e.code(), "{}", e),
        }

        let body = json!({
            "code": self.code(),
            "message": self.to_string(),
            "data": self.data(),
        });
        (self.status(), Json(body)).into_response()
    }
}
