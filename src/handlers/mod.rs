//! HTTP handlers for the entity collections.
//!
//! Each handler follows the same shape: validate and normalize input,
//! translate it into a filter or document, make one or two store calls,
//! map the outcome to a response. All validation finishes before the first
//! store call.

pub mod categories;
pub mod products;
pub mod warehouse;

use crate::error::ApiError;
use crate::store::StoreError;
use crate::validation::{ValidationError, parse_uuid_param};
use axum::Json;
use axum::extract::{FromRequest, FromRequestParts, Path, Query, Request};
use axum::http::request::Parts;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use uuid::Uuid;

/// JSON body extractor whose rejection is always a 400 `invalid JSON payload`.
///
/// Handlers take it as `Result<JsonBody<T>, ApiError>` when path validation
/// has to be reported before body errors.
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(JsonBody(value)),
            Err(rejection) => {
                tracing::warn!(reason = %rejection.body_text(), "rejected request body");
                Err(ValidationError::MalformedBody.into())
            }
        }
    }
}

/// Single path segment extractor. Undecodable segments become a JSON 400.
pub struct PathParam(pub String);

impl<S> FromRequestParts<S> for PathParam
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Path::<String>::from_request_parts(parts, state).await {
            Ok(Path(value)) => Ok(PathParam(value)),
            Err(rejection) => {
                tracing::warn!(reason = %rejection.body_text(), "rejected path parameter");
                Err(ValidationError::MalformedPath.into())
            }
        }
    }
}

/// Query string as a flat map. Undecodable query strings become a JSON 400.
pub struct QueryParams(pub HashMap<String, String>);

impl<S> FromRequestParts<S> for QueryParams
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Query::<HashMap<String, String>>::from_request_parts(parts, state).await {
            Ok(Query(params)) => Ok(QueryParams(params)),
            Err(rejection) => {
                tracing::warn!(reason = %rejection.body_text(), "rejected query string");
                Err(ValidationError::MalformedQuery.into())
            }
        }
    }
}

/// Reads a required UUID from the query string.
pub(crate) fn query_id(query: &HashMap<String, String>, name: &str) -> Result<Uuid, ApiError> {
    parse_uuid_param(name, query.get(name).map(String::as_str)).map_err(rejected_id)
}

/// Reads a required UUID path segment.
pub(crate) fn path_id(raw: &str, name: &str) -> Result<Uuid, ApiError> {
    parse_uuid_param(name, Some(raw)).map_err(rejected_id)
}

fn rejected_id(error: ValidationError) -> ApiError {
    tracing::warn!(error = %error, "identifier rejected");
    error.into()
}

/// Logs the store failure with its detail and returns a generic server error.
pub(crate) fn store_failure(
    error: StoreError,
    operation: &'static str,
    message: &'static str,
) -> ApiError {
    tracing::error!(operation, error = %error, kind = error.kind(), "store call failed");
    match error {
        StoreError::Unavailable(_) => ApiError::unavailable().operation(operation),
        _ => ApiError::internal(message).operation(operation),
    }
}
