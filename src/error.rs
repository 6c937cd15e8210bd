//! Error handling for the HTTP surface
//!
//! This module provides:
//! - A small error taxonomy (`ErrorCode`) mapped onto HTTP statuses
//! - `ApiError`, the single rejection type returned by handlers
//! - Error telemetry counters

use crate::validation::ValidationError;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

// =============================================================================
// ERROR CODES
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorCode {
    /// Malformed JSON, missing or empty field, bad UUID, bad range, empty update
    BadRequest,
    /// Update targeted an identifier with no stored document
    NotFound,
    /// Store connectivity, timeout or decode failure
    Internal,
    /// Store could not be reached at all
    Unavailable,
}

impl ErrorCode {
    pub fn status(&self) -> StatusCode {
        match self {
            ErrorCode::BadRequest => StatusCode::BAD_REQUEST,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::Internal | ErrorCode::Unavailable => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error category for metrics
    pub fn category(&self) -> &'static str {
        match self {
            ErrorCode::BadRequest => "client_error",
            ErrorCode::NotFound => "not_found",
            ErrorCode::Internal => "server_error",
            ErrorCode::Unavailable => "store_unavailable",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}({})", self, self.status().as_u16())
    }
}

// =============================================================================
// API ERROR
// =============================================================================

/// Error returned from request handlers.
///
/// The message is sent to the client verbatim; server-side details belong in
/// logs, never here.
#[derive(Debug, Clone)]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
    pub operation: Option<&'static str>,
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            operation: None,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::BadRequest, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Internal, message)
    }

    pub fn unavailable() -> Self {
        Self::new(ErrorCode::Unavailable, "database unavailable")
    }

    /// Tag the error with the operation that produced it
    pub fn operation(mut self, operation: &'static str) -> Self {
        self.operation = Some(operation);
        self
    }

    pub fn status(&self) -> StatusCode {
        self.code.status()
    }

    /// Add this error to telemetry
    pub fn track(&self) {
        ERROR_METRICS.record_error(&self.code, self.operation);
        crate::metrics::METRICS.record_api_error(
            self.operation.unwrap_or("unknown"),
            self.code.category(),
        );
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

impl From<ValidationError> for ApiError {
    fn from(error: ValidationError) -> Self {
        ApiError::bad_request(error.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        self.track();
        let body = ErrorBody {
            error: &self.message,
        };
        (self.status(), Json(body)).into_response()
    }
}

// =============================================================================
// ERROR TELEMETRY
// =============================================================================

/// Error metrics for telemetry
#[derive(Debug, Default)]
pub struct ErrorMetrics {
    /// Total error count by error code
    error_counts: RwLock<HashMap<ErrorCode, AtomicU64>>,
    /// Error count by operation
    operation_errors: RwLock<HashMap<String, AtomicU64>>,
}

impl ErrorMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an error occurrence
    pub fn record_error(&self, code: &ErrorCode, operation: Option<&str>) {
        {
            let map = self.error_counts.read();
            if let Some(counter) = map.get(code) {
                counter.fetch_add(1, Ordering::Relaxed);
            } else {
                drop(map);
                self.error_counts
                    .write()
                    .entry(*code)
                    .or_insert_with(|| AtomicU64::new(0))
                    .fetch_add(1, Ordering::Relaxed);
            }
        }

        if let Some(operation) = operation {
            let map = self.operation_errors.read();
            if let Some(counter) = map.get(operation) {
                counter.fetch_add(1, Ordering::Relaxed);
            } else {
                drop(map);
                self.operation_errors
                    .write()
                    .entry(operation.to_string())
                    .or_insert_with(|| AtomicU64::new(0))
                    .fetch_add(1, Ordering::Relaxed);
            }
        }

        tracing::debug!(
            error_code = %code,
            operation = operation,
            category = code.category(),
            "error recorded"
        );
    }

    pub fn get_error_count(&self, code: &ErrorCode) -> u64 {
        self.error_counts
            .read()
            .get(code)
            .map(|c| c.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    pub fn get_operation_error_count(&self, operation: &str) -> u64 {
        self.operation_errors
            .read()
            .get(operation)
            .map(|c| c.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    /// Current counts keyed by error category and by operation.
    pub fn snapshot(&self) -> serde_json::Value {
        let by_category: HashMap<&'static str, u64> = self
            .error_counts
            .read()
            .iter()
            .map(|(code, count)| (code.category(), count.load(Ordering::Relaxed)))
            .collect();
        let by_operation: HashMap<String, u64> = self
            .operation_errors
            .read()
            .iter()
            .map(|(operation, count)| (operation.clone(), count.load(Ordering::Relaxed)))
            .collect();
        serde_json::json!({
            "by_category": by_category,
            "by_operation": by_operation,
        })
    }
}

/// Global error metrics instance
pub static ERROR_METRICS: once_cell::sync::Lazy<ErrorMetrics> =
    once_cell::sync::Lazy::new(ErrorMetrics::new);
