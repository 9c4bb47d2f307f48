//! Request parameters and per-route argument schemas.
//!
//! Parameters come from the query string and the body (JSON object or
//! urlencoded form); body values win. Each route declares an argument struct:
//! required names are checked first, then `validator` rules, then the values
//! are sanitized into the typed input of the operation.

use axum::{
    extract::{FromRequest, Request},
    http::header,
};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use validator::{Validate, ValidationErrors};

use crate::error::ApiError;
use crate::models::{EventChanges, NewEvent};
use crate::validation::{
    date, date_time, numeric, sanitize_description, sanitize_number, sanitize_string, scalar,
};

const MAX_BODY_BYTES: usize = 1024 * 1024;

#[derive(Debug, Clone, Default)]
pub struct RequestParams(pub Map<String, Value>);

fn merge_pairs(params: &mut Map<String, Value>, pairs: Vec<(String, String)>) {
    for (key, value) in pairs {
        params.insert(key, Value::String(value));
    }
}

impl<S> FromRequest<S> for RequestParams
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, _state: &S) -> Result<Self, Self::Rejection> {
        let (parts, body) = req.into_parts();
        let mut params = Map::new();

        if let Some(query) = parts.uri.query() {
            match serde_urlencoded::from_str::<Vec<(String, String)>>(query) {
                Ok(pairs) => merge_pairs(&mut params, pairs),
                Err(e) => tracing::debug!("ignoring malformed query string: {}", e),
            }
        }

        let bytes = axum::body::to_bytes(body, MAX_BODY_BYTES)
            .await
            .map_err(|e| ApiError::InvalidJson(e.to_string()))?;
        if bytes.is_empty() {
            return Ok(RequestParams(params));
        }

        let content_type = parts
            .headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();

        if content_type.starts_with("application/json") {
            match serde_json::from_slice::<Value>(&bytes) {
                Ok(Value::Object(body)) => params.extend(body),
                Ok(_) => return Err(ApiError::InvalidJson("body must be a JSON object".into())),
                Err(e) => return Err(ApiError::InvalidJson(e.to_string())),
            }
        } else if content_type.starts_with("application/x-www-form-urlencoded") {
            let pairs = serde_urlencoded::from_bytes::<Vec<(String, String)>>(&bytes)
                .map_err(|e| ApiError::InvalidJson(e.to_string()))?;
            merge_pairs(&mut params, pairs);
        }

        Ok(RequestParams(params))
    }
}

/// Argument schema of one route.
pub trait RouteArgs: DeserializeOwned + Validate {
    const REQUIRED: &'static [&'static str];

    type Output;

    fn sanitize(self) -> Self::Output;
}

fn invalid_params(errors: ValidationErrors) -> ApiError {
    let params: BTreeMap<String, String> = errors
        .field_errors()
        .iter()
        .map(|(field, errs)| {
            let reason = errs
                .first()
                .and_then(|e| e.message.as_ref())
                .map(|m| format!("{field} {m}"))
                .unwrap_or_else(|| "Invalid parameter.".to_string());
            (field.to_string(), reason)
        })
        .collect();
    ApiError::InvalidParams(params)
}

impl RequestParams {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name).filter(|v| !v.is_null())
    }

    pub fn parse<A: RouteArgs>(self) -> Result<A::Output, ApiError> {
        let missing: Vec<String> = A::REQUIRED
            .iter()
            .filter(|name| self.get(name).is_none())
            .map(|name| name.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(ApiError::MissingParams(missing));
        }

        let args: A = serde_json::from_value(Value::Object(self.0))
            .map_err(|e| ApiError::InvalidJson(e.to_string()))?;
        args.validate().map_err(invalid_params)?;
        Ok(args.sanitize())
    }
}

/// `id` for show and delete.
#[derive(Debug, Deserialize, Validate)]
pub struct IdArgs {
    #[validate(custom(function = "numeric"))]
    pub id: Option<Value>,
}

impl RouteArgs for IdArgs {
    const REQUIRED: &'static [&'static str] = &["id"];

    type Output = u64;

    fn sanitize(self) -> u64 {
        self.id.as_ref().map(sanitize_number).unwrap_or_default()
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct ListArgs {
    #[validate(custom(function = "date"))]
    pub start_date: Option<Value>,
}

impl RouteArgs for ListArgs {
    const REQUIRED: &'static [&'static str] = &["start_date"];

    type Output = String;

    fn sanitize(self) -> String {
        self.start_date.as_ref().map(sanitize_string).unwrap_or_default()
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateArgs {
    #[validate(custom(function = "scalar"))]
    pub title: Option<Value>,
    #[validate(custom(function = "date_time"))]
    pub start_date_time: Option<Value>,
    #[validate(custom(function = "date_time"))]
    pub end_date_time: Option<Value>,
    #[validate(custom(function = "scalar"))]
    pub description: Option<Value>,
    #[validate(custom(function = "scalar"))]
    pub category_slugs: Option<Value>,
}

impl RouteArgs for CreateArgs {
    const REQUIRED: &'static [&'static str] = &["start_date_time", "end_date_time"];

    type Output = NewEvent;

    fn sanitize(self) -> NewEvent {
        NewEvent {
            title: self.title.as_ref().map(sanitize_string).unwrap_or_default(),
            description: self
                .description
                .as_ref()
                .map(sanitize_description)
                .unwrap_or_default(),
            start_date_time: self
                .start_date_time
                .as_ref()
                .map(sanitize_string)
                .unwrap_or_default(),
            end_date_time: self
                .end_date_time
                .as_ref()
                .map(sanitize_string)
                .unwrap_or_default(),
            category_slugs: self.category_slugs.as_ref().map(sanitize_string),
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateArgs {
    #[validate(custom(function = "numeric"))]
    pub id: Option<Value>,
    #[validate(custom(function = "scalar"))]
    pub title: Option<Value>,
    #[validate(custom(function = "date_time"))]
    pub start_date_time: Option<Value>,
    #[validate(custom(function = "date_time"))]
    pub end_date_time: Option<Value>,
    #[validate(custom(function = "scalar"))]
    pub description: Option<Value>,
    #[validate(custom(function = "scalar"))]
    pub category_slugs: Option<Value>,
}

impl RouteArgs for UpdateArgs {
    const REQUIRED: &'static [&'static str] = &["id"];

    type Output = (u64, EventChanges);

    fn sanitize(self) -> (u64, EventChanges) {
        let id = self.id.as_ref().map(sanitize_number).unwrap_or_default();
        let changes = EventChanges {
            title: self.title.as_ref().map(sanitize_string),
            description: self.description.as_ref().map(sanitize_description),
            start_date_time: self.start_date_time.as_ref().map(sanitize_string),
            end_date_time: self.end_date_time.as_ref().map(sanitize_string),
            category_slugs: self.category_slugs.as_ref().map(sanitize_string),
        };
        (id, changes)
    }
}
